//! Optical and calorimetric properties of a grain material
//!
//! A [`GrainComposition`] holds the absorption and scattering
//! efficiencies and the scattering asymmetry parameter on a
//! (wavelength, grain size) grid, the bulk mass density, a specific
//! enthalpy table, and optionally the four Mueller coefficients on a
//! (wavelength, size, scattering angle) grid for polarised scattering.
//!
//! Accessors interpolate on the stored grids: log-log for the
//! efficiencies, log-linear for the asymmetry parameter and the Mueller
//! coefficients, log-log for the enthalpy. Queries outside the grid are
//! clamped to the nearest border.

use crate::error::{Error, Result};
use dustrt_numeric::{interpolate_log_lin, interpolate_log_log, locate_clip, Table2, Table3};

/// The optical and calorimetric properties of one grain material
#[derive(Debug, Clone, PartialEq)]
pub struct GrainComposition {
    name: String,
    bulk_density: f64,
    lambdav: Vec<f64>,
    av: Vec<f64>,
    qabs: Table2,
    qsca: Table2,
    asymmpar: Table2,
    // specific enthalpy; empty tables mean no calorimetry available
    tv: Vec<f64>,
    hv: Vec<f64>,
    // Mueller coefficients; empty tables mean no polarization support
    thetav: Vec<f64>,
    s11: Table3,
    s12: Table3,
    s33: Table3,
    s34: Table3,
}

impl GrainComposition {
    /// Initialise from fully populated property tables
    ///
    /// `lambdav` and `av` must be strictly ascending; the tables are
    /// indexed `(wavelength, size)`. All quantities are in SI units.
    pub fn from_tables(
        name: impl Into<String>,
        bulk_density: f64,
        lambdav: Vec<f64>,
        av: Vec<f64>,
        qabs: Table2,
        qsca: Table2,
        asymmpar: Table2,
    ) -> Result<Self> {
        let name = name.into();
        if bulk_density <= 0.0 {
            return Err(Error::NonPositiveParameter {
                component: "GrainComposition",
                parameter: "bulk_density",
                value: bulk_density,
            });
        }
        if lambdav.len() < 2 || av.is_empty() {
            return Err(Error::malformed(&name, "needs at least two wavelengths and one size"));
        }
        if lambdav.windows(2).any(|w| w[1] <= w[0]) || av.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::malformed(&name, "grids must be strictly ascending"));
        }
        for table in [&qabs, &qsca, &asymmpar] {
            if table.shape() != (lambdav.len(), av.len()) {
                return Err(Error::malformed(&name, "table shape does not match the grids"));
            }
        }

        Ok(Self {
            name,
            bulk_density,
            lambdav,
            av,
            qabs,
            qsca,
            asymmpar,
            tv: Vec::new(),
            hv: Vec::new(),
            thetav: Vec::new(),
            s11: Table3::default(),
            s12: Table3::default(),
            s33: Table3::default(),
            s34: Table3::default(),
        })
    }

    /// Attach a specific enthalpy table (temperatures in K, values J/kg)
    pub fn set_enthalpy(&mut self, tv: Vec<f64>, hv: Vec<f64>) -> Result<()> {
        if tv.len() < 2 || tv.len() != hv.len() {
            return Err(Error::malformed(&self.name, "enthalpy table lengths are inconsistent"));
        }
        self.tv = tv;
        self.hv = hv;
        Ok(())
    }

    /// Attach Mueller coefficient tables over `(wavelength, size, angle)`
    pub fn set_mueller(
        &mut self,
        thetav: Vec<f64>,
        s11: Table3,
        s12: Table3,
        s33: Table3,
        s34: Table3,
    ) -> Result<()> {
        let expected = (self.lambdav.len(), self.av.len(), thetav.len());
        for table in [&s11, &s12, &s33, &s34] {
            if table.shape() != expected {
                return Err(Error::malformed(&self.name, "Mueller table shape is inconsistent"));
            }
        }
        self.thetav = thetav;
        self.s11 = s11;
        self.s12 = s12;
        self.s33 = s33;
        self.s34 = s34;
        Ok(())
    }

    /// A short identifier for messages and output files
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bulk mass density of the grain material
    pub fn bulk_density(&self) -> f64 {
        self.bulk_density
    }

    /// The wavelength grid the properties are tabulated on
    pub fn lambdav(&self) -> &[f64] {
        &self.lambdav
    }

    /// The grain-size grid the properties are tabulated on
    pub fn av(&self) -> &[f64] {
        &self.av
    }

    /// True when Mueller coefficient tables are attached
    pub fn polarization(&self) -> bool {
        !self.thetav.is_empty()
    }

    /// The scattering angle grid of the Mueller tables
    pub fn thetav(&self) -> &[f64] {
        &self.thetav
    }

    /// The absorption efficiency at `(lambda, a)`, log-log interpolated
    pub fn qabs(&self, lambda: f64, a: f64) -> f64 {
        self.interp2(&self.qabs, lambda, a, interpolate_log_log)
    }

    /// The scattering efficiency at `(lambda, a)`, log-log interpolated
    pub fn qsca(&self, lambda: f64, a: f64) -> f64 {
        self.interp2(&self.qsca, lambda, a, interpolate_log_log)
    }

    /// The asymmetry parameter at `(lambda, a)`, log-linear interpolated
    pub fn asymmpar(&self, lambda: f64, a: f64) -> f64 {
        self.interp2(&self.asymmpar, lambda, a, interpolate_log_lin)
    }

    /// The specific enthalpy at temperature `t`, log-log interpolated
    ///
    /// Queries outside the table range return the nearest border value;
    /// without calorimetry data the enthalpy is zero.
    pub fn specific_enthalpy(&self, t: f64) -> f64 {
        if self.tv.is_empty() {
            return 0.0;
        }
        let n = self.tv.len();
        if t <= self.tv[0] {
            return self.hv[0];
        }
        if t >= self.tv[n - 1] {
            return self.hv[n - 1];
        }
        let k = locate_clip(&self.tv, t);
        interpolate_log_log(t, self.tv[k], self.tv[k + 1], self.hv[k], self.hv[k + 1])
    }

    /// The largest temperature with meaningful enthalpy data
    pub fn upper_temperature(&self) -> f64 {
        self.tv.last().copied().unwrap_or(0.0)
    }

    /// The Mueller coefficients `(S11, S12, S33, S34)` at
    /// `(lambda, a, theta)`
    ///
    /// Fails when the composition carries no polarization tables.
    pub fn mueller(&self, lambda: f64, a: f64, theta: f64) -> Result<(f64, f64, f64, f64)> {
        if !self.polarization() {
            return Err(Error::NoPolarization);
        }

        let (k, fk) = clamped_fraction_log(&self.lambdav, lambda);
        let (i, fi) = clamped_fraction_log(&self.av, a);
        let (d, fd) = clamped_fraction_lin(&self.thetav, theta);
        let k1 = (k + 1).min(self.lambdav.len() - 1);
        let i1 = (i + 1).min(self.av.len() - 1);
        let d1 = (d + 1).min(self.thetav.len() - 1);

        let pick = |table: &Table3| {
            // trilinear blend of the eight surrounding grid values
            let mut value = 0.0;
            for (ki, wk) in [(k, 1.0 - fk), (k1, fk)] {
                for (ii, wi) in [(i, 1.0 - fi), (i1, fi)] {
                    for (di, wd) in [(d, 1.0 - fd), (d1, fd)] {
                        value += wk * wi * wd * table.get(ki, ii, di);
                    }
                }
            }
            value
        };

        Ok((
            pick(&self.s11),
            pick(&self.s12),
            pick(&self.s33),
            pick(&self.s34),
        ))
    }

    // two-dimensional interpolation with nearest-border clamping: first
    // along the size axis, then along the wavelength axis
    fn interp2(
        &self,
        table: &Table2,
        lambda: f64,
        a: f64,
        interpolate: fn(f64, f64, f64, f64, f64) -> f64,
    ) -> f64 {
        let lambda = lambda.clamp(self.lambdav[0], *self.lambdav.last().expect("not empty"));
        let a = a.clamp(self.av[0], *self.av.last().expect("not empty"));

        let k = locate_in(&self.lambdav, lambda);
        if self.av.len() == 1 {
            return interpolate(
                lambda,
                self.lambdav[k],
                self.lambdav[k + 1],
                table.get(k, 0),
                table.get(k + 1, 0),
            );
        }

        let i = locate_in(&self.av, a);
        let f1 = interpolate(a, self.av[i], self.av[i + 1], table.get(k, i), table.get(k, i + 1));
        let f2 = interpolate(
            a,
            self.av[i],
            self.av[i + 1],
            table.get(k + 1, i),
            table.get(k + 1, i + 1),
        );
        interpolate(lambda, self.lambdav[k], self.lambdav[k + 1], f1, f2)
    }
}

// bin index guaranteed to leave `index + 1` in range
fn locate_in(grid: &[f64], x: f64) -> usize {
    locate_clip(grid, x).min(grid.len() - 2)
}

// clamped bin index plus the fractional offset, logarithmic in x
fn clamped_fraction_log(grid: &[f64], x: f64) -> (usize, f64) {
    if grid.len() == 1 {
        return (0, 0.0);
    }
    let x = x.clamp(grid[0], *grid.last().expect("not empty"));
    let k = locate_in(grid, x);
    let f = (x / grid[k]).ln() / (grid[k + 1] / grid[k]).ln();
    (k, f.clamp(0.0, 1.0))
}

// clamped bin index plus the fractional offset, linear in x
fn clamped_fraction_lin(grid: &[f64], x: f64) -> (usize, f64) {
    if grid.len() == 1 {
        return (0, 0.0);
    }
    let x = x.clamp(grid[0], *grid.last().expect("not empty"));
    let k = locate_in(grid, x);
    let f = (x - grid[k]) / (grid[k + 1] - grid[k]);
    (k, f.clamp(0.0, 1.0))
}

/// Build a synthetic composition with constant efficiencies, handy for
/// analytic checks and unit tests
pub fn constant_composition(
    name: &str,
    bulk_density: f64,
    lambdav: Vec<f64>,
    av: Vec<f64>,
    qabs: f64,
    qsca: f64,
    g: f64,
) -> Result<GrainComposition> {
    let (nl, na) = (lambdav.len(), av.len());
    let mut tabs = Table2::new(nl, na);
    let mut tsca = Table2::new(nl, na);
    let mut tg = Table2::new(nl, na);
    for k in 0..nl {
        for i in 0..na {
            tabs.set(k, i, qabs);
            tsca.set(k, i, qsca);
            tg.set(k, i, g);
        }
    }
    GrainComposition::from_tables(name, bulk_density, lambdav, av, tabs, tsca, tg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power_law_composition() -> GrainComposition {
        // Q(lambda) = lambda^-1 at every size, exactly reproduced by
        // the log-log interpolation
        let lambdav = vec![1e-6, 1e-5, 1e-4];
        let av = vec![1e-8, 1e-7];
        let mut qabs = Table2::new(3, 2);
        let mut qsca = Table2::new(3, 2);
        let mut g = Table2::new(3, 2);
        for (k, &l) in lambdav.iter().enumerate() {
            for i in 0..2 {
                qabs.set(k, i, 1e-6 / l);
                qsca.set(k, i, 0.5e-6 / l);
                g.set(k, i, 0.3);
            }
        }
        GrainComposition::from_tables("test", 3000.0, lambdav, av, qabs, qsca, g).unwrap()
    }

    #[test]
    fn log_log_interpolation_is_exact_for_power_laws() {
        let composition = power_law_composition();
        let q = composition.qabs(3.16e-6, 5e-8);
        assert!((q - 1e-6 / 3.16e-6).abs() < 1e-6);
    }

    #[test]
    fn queries_clamp_to_the_borders() {
        let composition = power_law_composition();
        assert_eq!(composition.qabs(1e-8, 5e-8), composition.qabs(1e-6, 5e-8));
        assert_eq!(composition.qabs(1.0, 5e-8), composition.qabs(1e-4, 5e-8));
    }

    #[test]
    fn enthalpy_clamps_and_interpolates() {
        let mut composition = power_law_composition();
        composition
            .set_enthalpy(vec![1.0, 10.0, 100.0], vec![1e2, 1e4, 1e6])
            .unwrap();
        assert_eq!(composition.specific_enthalpy(0.1), 1e2);
        assert_eq!(composition.specific_enthalpy(1e5), 1e6);
        // log-log interpolation reproduces h ~ T^2
        let h = composition.specific_enthalpy(31.6);
        assert!((h / (31.6_f64.powi(2) * 1.0) - 1.0).abs() < 1e-2);
    }
}
