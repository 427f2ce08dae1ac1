//! The two-phase decorator for Cartesian grids

use crate::cartesian::CartesianGrid;
use crate::error::{Error, Result};
use dustrt_numeric::Random;

/// Wraps a Cartesian grid with a per-cell density-contrast weight
///
/// At setup every cell is assigned to the high-density phase with
/// probability `filling_factor`; the weights are chosen so that their
/// expectation value is exactly one, leaving the mean density of the
/// medium unchanged:
///
/// - high-density cells: `C / (C ff + 1 - ff)`
/// - low-density cells: `1 / (C ff + 1 - ff)`
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPhaseGrid {
    inner: CartesianGrid,
    filling_factor: f64,
    contrast: f64,
    weightv: Vec<f64>,
}

impl TwoPhaseGrid {
    /// Decorate a Cartesian grid, drawing the phase of every cell
    pub fn new(
        inner: CartesianGrid,
        filling_factor: f64,
        contrast: f64,
        random: &mut Random,
    ) -> Result<Self> {
        if filling_factor <= 0.0 || filling_factor >= 1.0 {
            return Err(Error::InvalidFillingFactor(filling_factor));
        }
        if contrast <= 0.0 {
            return Err(Error::InvalidContrast(contrast));
        }

        let denominator = contrast * filling_factor + 1.0 - filling_factor;
        let weightv = (0..inner.n_cells())
            .map(|_| {
                if random.uniform() < filling_factor {
                    contrast / denominator
                } else {
                    1.0 / denominator
                }
            })
            .collect();

        Ok(Self {
            inner,
            filling_factor,
            contrast,
            weightv,
        })
    }

    /// The wrapped Cartesian grid
    pub fn inner(&self) -> &CartesianGrid {
        &self.inner
    }

    /// The volume filling factor of the high-density phase
    pub fn filling_factor(&self) -> f64 {
        self.filling_factor
    }

    /// The density contrast between the phases
    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    /// The density weight of cell `m`
    pub fn weight(&self, m: usize) -> f64 {
        self.weightv.get(m).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_cubed() -> CartesianGrid {
        let borders: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        CartesianGrid::new(borders.clone(), borders.clone(), borders).unwrap()
    }

    #[test]
    fn mean_weight_is_unity() {
        let mut random = Random::default();
        let grid = TwoPhaseGrid::new(ten_cubed(), 0.3, 100.0, &mut random).unwrap();
        let n = grid.inner().n_cells() as f64;
        let mean: f64 = (0..grid.inner().n_cells()).map(|m| grid.weight(m)).sum::<f64>() / n;

        // the weight is a two-point distribution with mean one; allow a
        // 3-sigma band around the binomial estimate
        let ff: f64 = 0.3;
        let c = 100.0;
        let denominator = c * ff + 1.0 - ff;
        let spread = (c - 1.0) / denominator * (ff * (1.0 - ff)).sqrt();
        let tolerance = 3.0 * spread / n.sqrt();
        assert!((mean - 1.0).abs() < tolerance, "mean weight {mean}");
    }

    #[test]
    fn weights_take_exactly_two_values() {
        let mut random = Random::default();
        let grid = TwoPhaseGrid::new(ten_cubed(), 0.5, 10.0, &mut random).unwrap();
        let denominator = 10.0 * 0.5 + 0.5;
        for m in 0..grid.inner().n_cells() {
            let w = grid.weight(m);
            assert!(
                (w - 10.0 / denominator).abs() < 1e-12 || (w - 1.0 / denominator).abs() < 1e-12
            );
        }
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut random = Random::default();
        assert!(TwoPhaseGrid::new(ten_cubed(), 0.0, 10.0, &mut random).is_err());
        assert!(TwoPhaseGrid::new(ten_cubed(), 1.0, 10.0, &mut random).is_err());
        assert!(TwoPhaseGrid::new(ten_cubed(), 0.5, 0.0, &mut random).is_err());
    }
}
