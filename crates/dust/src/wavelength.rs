//! The simulation wavelength grid
//!
//! An ordered sequence of strictly positive wavelengths with companion
//! bin widths. Bin borders are the geometric means of adjacent grid
//! points; the outermost bins extend to the outermost points.

use crate::error::{Error, Result};
use dustrt_numeric::locate_fail;

/// The wavelength grid shared by all optical properties in a simulation
#[derive(Debug, Clone, PartialEq)]
pub struct WavelengthGrid {
    lambdav: Vec<f64>,
    dlambdav: Vec<f64>,
}

impl WavelengthGrid {
    /// Initialise from wavelengths in metres, sorted strictly ascending
    ///
    /// ```rust
    /// # use dustrt_dust::WavelengthGrid;
    /// let grid = WavelengthGrid::new(vec![1e-6, 2e-6, 4e-6]).unwrap();
    /// assert_eq!(grid.n_lambda(), 3);
    /// assert_eq!(grid.lambda(1), 2e-6);
    /// ```
    pub fn new(lambdav: Vec<f64>) -> Result<Self> {
        if lambdav.is_empty() {
            return Err(Error::EmptyWavelengthGrid);
        }
        if lambdav[0] <= 0.0 {
            return Err(Error::NonPositiveWavelength(lambdav[0]));
        }
        if lambdav.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::UnsortedWavelengths);
        }

        let n = lambdav.len();
        let dlambdav = (0..n)
            .map(|ell| {
                let min = if ell == 0 {
                    lambdav[0]
                } else {
                    (lambdav[ell - 1] * lambdav[ell]).sqrt()
                };
                let max = if ell == n - 1 {
                    lambdav[n - 1]
                } else {
                    (lambdav[ell] * lambdav[ell + 1]).sqrt()
                };
                max - min
            })
            .collect();

        Ok(Self { lambdav, dlambdav })
    }

    /// The number of wavelengths
    pub fn n_lambda(&self) -> usize {
        self.lambdav.len()
    }

    /// The wavelength at grid index `ell`
    pub fn lambda(&self, ell: usize) -> f64 {
        self.lambdav[ell]
    }

    /// The bin width at grid index `ell`
    pub fn dlambda(&self, ell: usize) -> f64 {
        self.dlambdav[ell]
    }

    /// The lower bin border at grid index `ell`
    pub fn lambda_min(&self, ell: usize) -> f64 {
        if ell == 0 {
            self.lambdav[0]
        } else {
            (self.lambdav[ell - 1] * self.lambdav[ell]).sqrt()
        }
    }

    /// The upper bin border at grid index `ell`
    pub fn lambda_max(&self, ell: usize) -> f64 {
        let n = self.lambdav.len();
        if ell == n - 1 {
            self.lambdav[n - 1]
        } else {
            (self.lambdav[ell] * self.lambdav[ell + 1]).sqrt()
        }
    }

    /// The index of the bin containing `lambda`, if any
    ///
    /// ```rust
    /// # use dustrt_dust::WavelengthGrid;
    /// let grid = WavelengthGrid::new(vec![1e-6, 2e-6, 4e-6]).unwrap();
    /// assert_eq!(grid.nearest(1.1e-6), Some(0));
    /// assert_eq!(grid.nearest(3.9e-6), Some(2));
    /// assert_eq!(grid.nearest(5e-6), None);
    /// ```
    pub fn nearest(&self, lambda: f64) -> Option<usize> {
        if self.lambdav.len() == 1 {
            return (lambda == self.lambdav[0]).then_some(0);
        }
        let ell = locate_fail(&self.lambdav, lambda)?;
        let border = (self.lambdav[ell] * self.lambdav[ell + 1]).sqrt();
        if lambda < border {
            Some(ell)
        } else {
            Some(ell + 1)
        }
    }

    /// The full wavelength vector
    pub fn lambdav(&self) -> &[f64] {
        &self.lambdav
    }

    /// The lowest wavelength in the grid
    pub fn lambda_first(&self) -> f64 {
        self.lambdav[0]
    }

    /// The highest wavelength in the grid
    pub fn lambda_last(&self) -> f64 {
        *self.lambdav.last().expect("grid is never empty")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borders_are_geometric_means() {
        let grid = WavelengthGrid::new(vec![1.0, 4.0, 16.0]).unwrap();
        assert!((grid.lambda_max(0) - 2.0).abs() < 1e-12);
        assert!((grid.lambda_min(1) - 2.0).abs() < 1e-12);
        // end bins extend to the outermost points
        assert_eq!(grid.lambda_min(0), 1.0);
        assert_eq!(grid.lambda_max(2), 16.0);
        // widths are consistent with the borders
        assert!((grid.dlambda(1) - (8.0 - 2.0)).abs() < 1e-12);
    }

    #[test]
    fn invalid_grids_are_rejected() {
        assert!(WavelengthGrid::new(vec![]).is_err());
        assert!(WavelengthGrid::new(vec![0.0, 1.0]).is_err());
        assert!(WavelengthGrid::new(vec![2.0, 1.0]).is_err());
    }

    #[test]
    fn single_wavelength_grid() {
        let grid = WavelengthGrid::new(vec![5.5e-7]).unwrap();
        assert_eq!(grid.n_lambda(), 1);
        assert_eq!(grid.dlambda(0), 0.0);
        assert_eq!(grid.nearest(5.5e-7), Some(0));
    }
}
