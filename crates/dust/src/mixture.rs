//! Dust mixtures and their derived optical properties
//!
//! A [`DustMix`] holds one or more dust populations, each defined by its
//! dust mass per hydrogen atom and its absorption and scattering cross
//! sections per hydrogen atom on the simulation wavelength grid. The mix
//! derives the aggregate cross sections, opacities, albedo and asymmetry
//! parameter, a Planck-integrated absorption table for equilibrium
//! temperature inversion, and the scattering interface used by the
//! photon loop (Henyey-Greenstein, or Mueller-driven when polarization
//! tables are present).
//!
//! Mixes are assembled through a [`MixtureBuilder`], either from
//! pre-sampled cross sections or by integrating grain compositions over
//! a size distribution split into logarithmic bins.

use crate::composition::GrainComposition;
use crate::error::{Error, Result};
use crate::sizedist::GrainSizeDistribution;
use crate::wavelength::WavelengthGrid;
use dustrt_numeric::{
    cdf_with, interpolate_log_lin, interpolate_log_log, locate_clip, locate_fail, log_grid,
    pow_grid, resample, Direction, Random, Table2,
};
use std::f64::consts::PI;

// Planck constants in SI units
const PLANCK: f64 = 6.62607015e-34;
const LIGHTSPEED: f64 = 2.99792458e8;
const BOLTZMANN: f64 = 1.380649e-23;

// log size-grid points used per population bin in the setup integrals
const SIZE_POINTS: usize = 200;
// the Planck-integrated absorption table: 501 semi-log points to 10^4 K
const N_TEMPERATURES: usize = 500;
const MAX_TEMPERATURE: f64 = 1e4;
const TEMPERATURE_RATIO: f64 = 1e3;

/// One dust population of a mixture
#[derive(Debug, Clone, PartialEq)]
struct DustPopulation {
    name: String,
    mu: f64,
    sigma_abs: Vec<f64>,
    sigma_sca: Vec<f64>,
    asymmpar: Vec<f64>,
    mean_mass: f64,
    enthalpy: Option<(Vec<f64>, Vec<f64>)>,
}

/// A dust mixture with frozen optical properties
#[derive(Debug, Clone, PartialEq)]
pub struct DustMix {
    grid: WavelengthGrid,
    populations: Vec<DustPopulation>,
    mu: f64,
    sigma_abs: Vec<f64>,
    sigma_sca: Vec<f64>,
    sigma_ext: Vec<f64>,
    albedo: Vec<f64>,
    asymmpar: Vec<f64>,
    tv: Vec<f64>,
    planck_abs: Table2,
    // polarization tables aggregated over the populations
    thetav: Vec<f64>,
    s11: Table2,
    s12: Table2,
    s33: Table2,
    s34: Table2,
    // per-wavelength theta sampling and normalization
    theta_cdf: Vec<Vec<f64>>,
    s11_norm: Vec<f64>,
}

/// Incrementally assembles a [`DustMix`]
#[derive(Debug)]
pub struct MixtureBuilder<'a> {
    grid: &'a WavelengthGrid,
    populations: Vec<DustPopulation>,
    thetav: Vec<f64>,
    s11: Vec<Vec<f64>>,
    s12: Vec<Vec<f64>>,
    s33: Vec<Vec<f64>>,
    s34: Vec<Vec<f64>>,
    any_unpolarized: bool,
}

impl<'a> MixtureBuilder<'a> {
    /// Start a mixture on the given simulation wavelength grid
    pub fn new(grid: &'a WavelengthGrid) -> Self {
        Self {
            grid,
            populations: Vec::new(),
            thetav: Vec::new(),
            s11: Vec::new(),
            s12: Vec::new(),
            s33: Vec::new(),
            s34: Vec::new(),
            any_unpolarized: false,
        }
    }

    /// Add a population with properties pre-sampled on the simulation grid
    pub fn add_population(
        &mut self,
        name: impl Into<String>,
        mu: f64,
        sigma_abs: Vec<f64>,
        sigma_sca: Vec<f64>,
        asymmpar: Vec<f64>,
    ) -> Result<&mut Self> {
        let name = name.into();
        let n = self.grid.n_lambda();
        if sigma_abs.len() != n || sigma_sca.len() != n || asymmpar.len() != n {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "cross sections sampled on the simulation wavelength grid",
            });
        }
        if mu <= 0.0 {
            return Err(Error::NonPositiveParameter {
                component: "MixtureBuilder",
                parameter: "mu",
                value: mu,
            });
        }
        if !self.thetav.is_empty() {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "either all or none of the populations to carry Mueller tables",
            });
        }
        self.any_unpolarized = true;
        self.populations.push(DustPopulation {
            name,
            mu,
            sigma_abs,
            sigma_sca,
            asymmpar,
            mean_mass: mu,
            enthalpy: None,
        });
        Ok(self)
    }

    /// Add a population defined on a foreign wavelength grid
    ///
    /// The cross sections are resampled onto the simulation grid with
    /// log-log interpolation and the asymmetry parameter with log-linear
    /// interpolation. Fails when the foreign grid does not cover the
    /// simulation range.
    pub fn add_population_on_grid(
        &mut self,
        name: impl Into<String>,
        mu: f64,
        lambdav: &[f64],
        sigma_abs: &[f64],
        sigma_sca: &[f64],
        asymmpar: &[f64],
    ) -> Result<&mut Self> {
        let name = name.into();
        check_coverage(&name, lambdav, self.grid)?;
        let simgrid = self.grid.lambdav();
        let abs = resample(simgrid, lambdav, sigma_abs, interpolate_log_log);
        let sca = resample(simgrid, lambdav, sigma_sca, interpolate_log_log);
        let g = resample(simgrid, lambdav, asymmpar, interpolate_log_lin);
        self.add_population(name, mu, abs, sca, g)
    }

    /// Attach analytic Mueller coefficient tables for the whole mixture
    ///
    /// The tables are indexed `(wavelength, angle)` and describe the
    /// aggregate scattering of all populations added so far; mixing with
    /// per-composition Mueller tables is not allowed.
    pub fn add_polarization(
        &mut self,
        thetav: Vec<f64>,
        s11: Table2,
        s12: Table2,
        s33: Table2,
        s34: Table2,
    ) -> Result<&mut Self> {
        if self.populations.is_empty() {
            return Err(Error::NoPopulations);
        }
        if !self.thetav.is_empty() {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "a single source of Mueller tables",
            });
        }
        if thetav.len() < 2 || thetav.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "at least two ascending scattering angles",
            });
        }
        let expected = (self.grid.n_lambda(), thetav.len());
        for table in [&s11, &s12, &s33, &s34] {
            if table.shape() != expected {
                return Err(Error::InvalidConfiguration {
                    component: "MixtureBuilder",
                    requirement: "Mueller tables shaped (wavelength, angle)",
                });
            }
        }

        let n_theta = thetav.len();
        let n_lambda = self.grid.n_lambda();
        let flatten = move |table: &Table2| {
            let mut row = vec![0.0; n_lambda * n_theta];
            for ell in 0..n_lambda {
                for d in 0..n_theta {
                    row[ell * n_theta + d] = table.get(ell, d);
                }
            }
            row
        };
        self.s11.push(flatten(&s11));
        self.s12.push(flatten(&s12));
        self.s33.push(flatten(&s33));
        self.s34.push(flatten(&s34));
        self.thetav = thetav;
        Ok(self)
    }

    /// Add `n_bins` populations for a grain composition and size
    /// distribution
    ///
    /// The size range is split logarithmically into `n_bins` bins; for
    /// each bin the cross sections, the asymmetry parameter and the dust
    /// mass per hydrogen atom follow from trapezoidal integration of the
    /// efficiencies against the size distribution on a logarithmic size
    /// grid.
    pub fn add_grain_populations(
        &mut self,
        composition: &GrainComposition,
        sizedist: &GrainSizeDistribution,
        n_bins: usize,
    ) -> Result<&mut Self> {
        if n_bins == 0 {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "at least one size bin",
            });
        }
        check_coverage(composition.name(), composition.lambdav(), self.grid)?;

        let (amin, amax) = sizedist.range();
        let borders = log_grid(amin, amax, n_bins + 1)
            .map_err(Error::numeric("MixtureBuilder"))?;
        let n_lambda = self.grid.n_lambda();
        let rho_bulk = composition.bulk_density();

        let polarized = composition.polarization();
        if polarized {
            if self.thetav.is_empty() && self.s11.is_empty() && !self.any_unpolarized {
                self.thetav = composition.thetav().to_vec();
            } else if self.thetav != composition.thetav() {
                return Err(Error::InvalidConfiguration {
                    component: "MixtureBuilder",
                    requirement: "a single scattering-angle grid shared by all polarized compositions",
                });
            }
        } else {
            self.any_unpolarized = true;
        }
        if !self.thetav.is_empty() && !polarized {
            return Err(Error::InvalidConfiguration {
                component: "MixtureBuilder",
                requirement: "either all or none of the compositions to carry Mueller tables",
            });
        }

        for bin in 0..n_bins {
            let av = log_grid(borders[bin], borders[bin + 1], SIZE_POINTS)
                .map_err(Error::numeric("MixtureBuilder"))?;

            // size-independent pieces: mass and number integrals
            let mut mu = 0.0;
            let mut number = 0.0;
            for pair in av.windows(2) {
                let (a1, a2) = (pair[0], pair[1]);
                let (w1, w2) = (sizedist.omega(a1), sizedist.omega(a2));
                mu += 0.5
                    * (a2 - a1)
                    * (w1 * rho_bulk * 4.0 / 3.0 * PI * a1.powi(3)
                        + w2 * rho_bulk * 4.0 / 3.0 * PI * a2.powi(3));
                number += 0.5 * (a2 - a1) * (w1 + w2);
            }
            if mu <= 0.0 {
                return Err(Error::InvalidConfiguration {
                    component: "MixtureBuilder",
                    requirement: "a size distribution with positive mass in every bin",
                });
            }

            let mut sigma_abs = vec![0.0; n_lambda];
            let mut sigma_sca = vec![0.0; n_lambda];
            let mut asymmpar = vec![0.0; n_lambda];
            let mut mueller_rows: Option<[Vec<f64>; 4]> = polarized
                .then(|| std::array::from_fn(|_| vec![0.0; n_lambda * self.thetav.len()]));

            for ell in 0..n_lambda {
                let lambda = self.grid.lambda(ell);
                let mut abs = 0.0;
                let mut sca = 0.0;
                let mut gsca = 0.0;
                for pair in av.windows(2) {
                    let (a1, a2) = (pair[0], pair[1]);
                    let da = a2 - a1;
                    let f = |a: f64| {
                        let omega = sizedist.omega(a);
                        let area = PI * a * a;
                        let qa = composition.qabs(lambda, a);
                        let qs = composition.qsca(lambda, a);
                        let g = composition.asymmpar(lambda, a);
                        (omega * qa * area, omega * qs * area, omega * g * qs * area)
                    };
                    let (abs1, sca1, g1) = f(a1);
                    let (abs2, sca2, g2) = f(a2);
                    abs += 0.5 * da * (abs1 + abs2);
                    sca += 0.5 * da * (sca1 + sca2);
                    gsca += 0.5 * da * (g1 + g2);
                }
                sigma_abs[ell] = abs;
                sigma_sca[ell] = sca;
                asymmpar[ell] = if sca > 0.0 { gsca / sca } else { 0.0 };

                if let Some(rows) = mueller_rows.as_mut() {
                    for (d, &theta) in self.thetav.iter().enumerate() {
                        let mut sums = [0.0; 4];
                        for pair in av.windows(2) {
                            let (a1, a2) = (pair[0], pair[1]);
                            let da = a2 - a1;
                            let m1 = composition.mueller(lambda, a1, theta)?;
                            let m2 = composition.mueller(lambda, a2, theta)?;
                            let (w1, w2) = (sizedist.omega(a1), sizedist.omega(a2));
                            sums[0] += 0.5 * da * (w1 * m1.0 + w2 * m2.0);
                            sums[1] += 0.5 * da * (w1 * m1.1 + w2 * m2.1);
                            sums[2] += 0.5 * da * (w1 * m1.2 + w2 * m2.2);
                            sums[3] += 0.5 * da * (w1 * m1.3 + w2 * m2.3);
                        }
                        for (row, sum) in rows.iter_mut().zip(sums) {
                            row[ell * self.thetav.len() + d] = sum;
                        }
                    }
                }
            }

            if let Some([r11, r12, r33, r34]) = mueller_rows {
                self.s11.push(r11);
                self.s12.push(r12);
                self.s33.push(r33);
                self.s34.push(r34);
            }

            let enthalpy = (composition.upper_temperature() > 0.0).then(|| {
                let tv: Vec<f64> = log_grid(1.0, composition.upper_temperature(), 101)
                    .unwrap_or_else(|_| vec![1.0, composition.upper_temperature()]);
                let hv = tv.iter().map(|&t| composition.specific_enthalpy(t)).collect();
                (tv, hv)
            });

            self.populations.push(DustPopulation {
                name: format!("{}[{}]", composition.name(), bin),
                mu,
                sigma_abs,
                sigma_sca,
                asymmpar,
                mean_mass: if number > 0.0 { mu / number } else { mu },
                enthalpy,
            });
        }

        Ok(self)
    }

    /// Freeze the mixture and derive the aggregate properties
    pub fn build(self) -> Result<DustMix> {
        if self.populations.is_empty() {
            return Err(Error::NoPopulations);
        }

        let n_lambda = self.grid.n_lambda();
        let mut sigma_abs = vec![0.0; n_lambda];
        let mut sigma_sca = vec![0.0; n_lambda];
        let mut asymm_weighted = vec![0.0; n_lambda];
        let mut mu = 0.0;
        for population in &self.populations {
            mu += population.mu;
            for ell in 0..n_lambda {
                sigma_abs[ell] += population.sigma_abs[ell];
                sigma_sca[ell] += population.sigma_sca[ell];
                asymm_weighted[ell] += population.asymmpar[ell] * population.sigma_sca[ell];
            }
        }

        let sigma_ext: Vec<f64> = sigma_abs
            .iter()
            .zip(&sigma_sca)
            .map(|(a, s)| a + s)
            .collect();
        let albedo: Vec<f64> = sigma_sca
            .iter()
            .zip(&sigma_ext)
            .map(|(s, e)| if *e > 0.0 { s / e } else { 0.0 })
            .collect();
        let asymmpar: Vec<f64> = asymm_weighted
            .iter()
            .zip(&sigma_sca)
            .map(|(g, s)| if *s > 0.0 { g / s } else { 0.0 })
            .collect();

        // semi-logarithmic temperature grid for the Planck table
        let tv = pow_grid(0.0, MAX_TEMPERATURE, N_TEMPERATURES, TEMPERATURE_RATIO)
            .map_err(Error::numeric("DustMix"))?;
        let mut planck_abs = Table2::new(self.populations.len(), tv.len());
        for (c, population) in self.populations.iter().enumerate() {
            for (p, &t) in tv.iter().enumerate() {
                let mut integral = 0.0;
                for ell in 0..n_lambda {
                    integral += population.sigma_abs[ell]
                        * planck_lambda(self.grid.lambda(ell), t)
                        * self.grid.dlambda(ell);
                }
                planck_abs.set(c, p, integral);
            }
        }

        // aggregate the Mueller rows and build the sampling tables
        let n_theta = self.thetav.len();
        let mut s11 = Table2::new(n_lambda, n_theta.max(1));
        let mut s12 = Table2::new(n_lambda, n_theta.max(1));
        let mut s33 = Table2::new(n_lambda, n_theta.max(1));
        let mut s34 = Table2::new(n_lambda, n_theta.max(1));
        let mut theta_cdf = Vec::new();
        let mut s11_norm = vec![0.0; n_lambda];
        if n_theta > 0 {
            for (target, rows) in [
                (&mut s11, &self.s11),
                (&mut s12, &self.s12),
                (&mut s33, &self.s33),
                (&mut s34, &self.s34),
            ] {
                for row in rows {
                    for ell in 0..n_lambda {
                        for d in 0..n_theta {
                            let value = target.get(ell, d) + row[ell * n_theta + d];
                            target.set(ell, d, value);
                        }
                    }
                }
            }
            for ell in 0..n_lambda {
                // the sampling weight of theta is S11(theta) sin(theta)
                let weights: Vec<f64> = (0..n_theta)
                    .map(|d| s11.get(ell, d) * self.thetav[d].sin())
                    .collect();
                let cdf = cdf_with(n_theta.saturating_sub(1), |d| {
                    0.5 * (weights[d] + weights[d + 1])
                        * (self.thetav[d + 1] - self.thetav[d])
                })
                // a wavelength without scattering still needs a sampler
                .or_else(|_| {
                    log::warn!("no scattering weight at wavelength index {ell}");
                    cdf_with(n_theta.saturating_sub(1), |_| 1.0)
                })
                .map_err(Error::numeric("DustMix"))?;
                // normalise S11 so that its average over the sphere is one
                let mut norm = 0.0;
                for d in 0..n_theta - 1 {
                    norm += 0.25
                        * (weights[d] + weights[d + 1])
                        * (self.thetav[d + 1] - self.thetav[d]);
                }
                s11_norm[ell] = norm.max(f64::MIN_POSITIVE);
                theta_cdf.push(cdf);
            }
        }

        Ok(DustMix {
            grid: self.grid.clone(),
            populations: self.populations,
            mu,
            sigma_abs,
            sigma_sca,
            sigma_ext,
            albedo,
            asymmpar,
            tv,
            planck_abs,
            thetav: self.thetav,
            s11,
            s12,
            s33,
            s34,
            theta_cdf,
            s11_norm,
        })
    }
}

impl DustMix {
    /// The number of dust populations
    pub fn n_pop(&self) -> usize {
        self.populations.len()
    }

    /// The dust mass per hydrogen atom of population `c`
    pub fn mu_pop(&self, c: usize) -> Result<f64> {
        self.population(c).map(|p| p.mu)
    }

    /// The total dust mass per hydrogen atom
    pub fn mu(&self) -> f64 {
        self.mu
    }

    /// The absorption cross section per hydrogen atom of population `c`
    pub fn sigma_abs_pop(&self, ell: usize, c: usize) -> Result<f64> {
        self.population(c).map(|p| p.sigma_abs[ell])
    }

    /// The scattering cross section per hydrogen atom of population `c`
    pub fn sigma_sca_pop(&self, ell: usize, c: usize) -> Result<f64> {
        self.population(c).map(|p| p.sigma_sca[ell])
    }

    /// The total absorption cross section per hydrogen atom
    pub fn sigma_abs(&self, ell: usize) -> f64 {
        self.sigma_abs[ell]
    }

    /// The total scattering cross section per hydrogen atom
    pub fn sigma_sca(&self, ell: usize) -> f64 {
        self.sigma_sca[ell]
    }

    /// The total extinction cross section per hydrogen atom
    pub fn sigma_ext(&self, ell: usize) -> f64 {
        self.sigma_ext[ell]
    }

    /// The absorption opacity in m^2/kg
    pub fn kappa_abs(&self, ell: usize) -> f64 {
        self.sigma_abs[ell] / self.mu
    }

    /// The absorption opacities at all wavelengths
    pub fn kappa_abs_all(&self) -> Vec<f64> {
        self.sigma_abs.iter().map(|s| s / self.mu).collect()
    }

    /// The scattering opacity in m^2/kg
    pub fn kappa_sca(&self, ell: usize) -> f64 {
        self.sigma_sca[ell] / self.mu
    }

    /// The extinction opacity in m^2/kg
    pub fn kappa_ext(&self, ell: usize) -> f64 {
        self.sigma_ext[ell] / self.mu
    }

    /// The extinction opacity at an arbitrary wavelength
    ///
    /// For grids with several wavelengths the value is log-log
    /// interpolated between the bracketing grid points; a wavelength
    /// outside the grid range is a coverage error. A single-wavelength
    /// grid requires an (almost) exact match.
    pub fn kappa_ext_at(&self, lambda: f64) -> Result<f64> {
        let lambdav = self.grid.lambdav();
        let n = lambdav.len();
        if n == 1 {
            if (lambda / lambdav[0] - 1.0).abs() < 1e-5 {
                return Ok(self.kappa_ext(0));
            }
            return Err(self.coverage_error(lambda));
        }
        let Some(ell) = locate_fail(lambdav, lambda) else {
            return Err(self.coverage_error(lambda));
        };
        Ok(interpolate_log_log(
            lambda,
            lambdav[ell],
            lambdav[ell + 1],
            self.kappa_ext(ell),
            self.kappa_ext(ell + 1),
        ))
    }

    /// The albedo at wavelength index `ell`
    pub fn albedo(&self, ell: usize) -> f64 {
        self.albedo[ell]
    }

    /// The aggregate asymmetry parameter at wavelength index `ell`
    pub fn asymmpar(&self, ell: usize) -> f64 {
        self.asymmpar[ell]
    }

    /// True when the mixture carries polarization tables
    pub fn polarization(&self) -> bool {
        !self.thetav.is_empty()
    }

    /// The aggregate Mueller coefficients at `(ell, theta)`
    pub fn mueller(&self, ell: usize, theta: f64) -> Result<(f64, f64, f64, f64)> {
        if !self.polarization() {
            return Err(Error::NoPolarization);
        }
        let d = locate_clip(&self.thetav, theta).min(self.thetav.len() - 2);
        let f = ((theta - self.thetav[d]) / (self.thetav[d + 1] - self.thetav[d]))
            .clamp(0.0, 1.0);
        let pick = |t: &Table2| t.get(ell, d) * (1.0 - f) + t.get(ell, d + 1) * f;
        Ok((
            pick(&self.s11),
            pick(&self.s12),
            pick(&self.s33),
            pick(&self.s34),
        ))
    }

    /// The scattering phase function for turning `k_in` into `k_out`
    ///
    /// Normalised so that the average over all outgoing directions is
    /// one. Without polarization tables this is the Henyey-Greenstein
    /// function with the aggregate asymmetry parameter.
    pub fn phase_function(&self, ell: usize, k_in: &Direction, k_out: &Direction) -> f64 {
        let cos_theta = k_in.dot(k_out);
        if self.polarization() {
            let theta = cos_theta.clamp(-1.0, 1.0).acos();
            match self.mueller(ell, theta) {
                Ok((s11, _, _, _)) => s11 / self.s11_norm[ell],
                Err(_) => 1.0,
            }
        } else {
            henyey_greenstein(self.asymmpar[ell], cos_theta)
        }
    }

    /// Draw a scattering direction for a package travelling along `k_in`
    pub fn sample_scattering_direction(
        &self,
        random: &mut Random,
        ell: usize,
        k_in: &Direction,
    ) -> Direction {
        let (cos_theta, phi) = if self.polarization() {
            let theta = random.cdf(&self.thetav, &self.theta_cdf[ell]);
            (theta.cos(), 2.0 * PI * random.uniform())
        } else {
            (
                sample_henyey_greenstein(self.asymmpar[ell], random),
                2.0 * PI * random.uniform(),
            )
        };
        rotate_about(k_in, cos_theta, phi)
    }

    /// The Planck-integrated absorption cross section of population `c`
    pub fn planck_abs_pop(&self, t: f64, c: usize) -> Result<f64> {
        self.check_population(c)?;
        Ok(self.interpolate_planck(self.planck_abs.row(c), t))
    }

    /// The Planck-integrated absorption cross section of the whole mix
    pub fn planck_abs(&self, t: f64) -> f64 {
        (0..self.n_pop())
            .map(|c| self.interpolate_planck(self.planck_abs.row(c), t))
            .sum()
    }

    /// Invert the Planck-integrated absorption of population `c` for `T`
    pub fn inv_planck_abs_pop(&self, value: f64, c: usize) -> Result<f64> {
        self.check_population(c)?;
        Ok(self.invert_planck(self.planck_abs.row(c), value))
    }

    /// Invert the Planck-integrated absorption of the whole mix for `T`
    pub fn inv_planck_abs(&self, value: f64) -> f64 {
        let totals: Vec<f64> = (0..self.tv.len())
            .map(|p| (0..self.n_pop()).map(|c| self.planck_abs.get(c, p)).sum())
            .collect();
        self.invert_planck(&totals, value)
    }

    /// The equilibrium temperature of population `c` embedded in the
    /// radiation field `j` (mean intensities on the wavelength grid)
    pub fn equilibrium_temperature(&self, j: &[f64], c: usize) -> Result<f64> {
        let population = self.population(c)?;
        let mut absorbed = 0.0;
        for ell in 0..self.grid.n_lambda() {
            absorbed += population.sigma_abs[ell] * j[ell] * self.grid.dlambda(ell);
        }
        Ok(self.invert_planck(self.planck_abs.row(c), absorbed))
    }

    /// The enthalpy of a representative grain of population `c` at `T`
    pub fn enthalpy(&self, t: f64, c: usize) -> Result<f64> {
        let population = self.population(c)?;
        let Some((tv, hv)) = &population.enthalpy else {
            return Ok(0.0);
        };
        let n = tv.len();
        let specific = if t <= tv[0] {
            hv[0]
        } else if t >= tv[n - 1] {
            hv[n - 1]
        } else {
            let k = locate_clip(tv, t).min(n - 2);
            interpolate_log_log(t, tv[k], tv[k + 1], hv[k], hv[k + 1])
        };
        Ok(specific * population.mean_mass)
    }

    /// The mean mass of a dust grain in population `c`
    pub fn mean_mass(&self, c: usize) -> Result<f64> {
        self.population(c).map(|p| p.mean_mass)
    }

    /// A human-readable identifier of population `c`
    pub fn population_name(&self, c: usize) -> Result<&str> {
        self.population(c).map(|p| p.name.as_str())
    }

    /// The wavelength grid this mix was sampled on
    pub fn wavelength_grid(&self) -> &WavelengthGrid {
        &self.grid
    }

    fn population(&self, c: usize) -> Result<&DustPopulation> {
        self.populations.get(c).ok_or(Error::PopulationOutOfRange {
            index: c,
            count: self.populations.len(),
        })
    }

    fn check_population(&self, c: usize) -> Result<()> {
        self.population(c).map(|_| ())
    }

    fn interpolate_planck(&self, row: &[f64], t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let n = self.tv.len();
        if t >= self.tv[n - 1] {
            return row[n - 1];
        }
        let p = locate_clip(&self.tv, t).min(n - 2);
        let f = (t - self.tv[p]) / (self.tv[p + 1] - self.tv[p]);
        row[p] * (1.0 - f) + row[p + 1] * f
    }

    fn invert_planck(&self, row: &[f64], value: f64) -> f64 {
        let n = row.len();
        if value <= row[0] {
            return self.tv[0];
        }
        if value >= row[n - 1] {
            return self.tv[n - 1];
        }
        let p = locate_clip(row, value).min(n - 2);
        let dp = row[p + 1] - row[p];
        if dp <= 0.0 {
            return self.tv[p];
        }
        self.tv[p] + (value - row[p]) / dp * (self.tv[p + 1] - self.tv[p])
    }

    fn coverage_error(&self, lambda: f64) -> Error {
        Error::WavelengthCoverage {
            resource: "DustMix".to_string(),
            found_min: self.grid.lambda_first(),
            found_max: self.grid.lambda_last(),
            needed_min: lambda,
            needed_max: lambda,
        }
    }
}

impl std::fmt::Display for DustMix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use dustrt_utils::{f, ValueExt};

        let head = f!(" > DustMix [{} populations]", self.n_pop());
        let mut s = f!("{}\n{}\n{}\n", "-".repeat(40), head, "-".repeat(40));

        s += &f!("mu     : {} kg/H\n", self.mu.sci(4, 2));
        s += &f!(
            "lambda : {} - {} m ({} bins)\n",
            self.grid.lambda_first().sci(2, 2),
            self.grid.lambda_last().sci(2, 2),
            self.grid.n_lambda()
        );
        let mid = self.grid.n_lambda() / 2;
        s += &f!(
            "kappa  : {} m2/kg at {} m\n",
            self.kappa_ext(mid).sci(4, 2),
            self.grid.lambda(mid).sci(2, 2)
        );
        s += &f!(
            "albedo : {:.4}, g: {:.4} (same reference bin)\n",
            self.albedo(mid),
            self.asymmpar(mid)
        );
        if self.polarization() {
            s += &f!("Mueller tables over {} angles\n", self.thetav.len());
        }
        write!(f, "{s}")
    }
}

/// The Henyey-Greenstein phase function value for `cos theta`
///
/// Normalised so that the average over the unit sphere is one; `g = 0`
/// reduces to isotropic scattering.
pub fn henyey_greenstein(g: f64, cos_theta: f64) -> f64 {
    if g.abs() < 1e-6 {
        return 1.0;
    }
    let g2 = g * g;
    (1.0 - g2) / (1.0 + g2 - 2.0 * g * cos_theta).powf(1.5)
}

/// Draw `cos theta` from the Henyey-Greenstein distribution
pub fn sample_henyey_greenstein(g: f64, random: &mut Random) -> f64 {
    let x = random.uniform();
    if g.abs() < 1e-6 {
        return 2.0 * x - 1.0;
    }
    let g2 = g * g;
    let f = (1.0 - g2) / (1.0 - g + 2.0 * g * x);
    ((1.0 + g2 - f * f) / (2.0 * g)).clamp(-1.0, 1.0)
}

// rotate `k_in` by the scattering angle and azimuth
fn rotate_about(k_in: &Direction, cos_theta: f64, phi: f64) -> Direction {
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let k = k_in.to_vec();
    // any unit vector perpendicular to k
    let helper = if k.x.abs() < 0.9 {
        dustrt_numeric::Vec3::new(1.0, 0.0, 0.0)
    } else {
        dustrt_numeric::Vec3::new(0.0, 1.0, 0.0)
    };
    let u = k.cross(&helper).normalize();
    let v = k.cross(&u);
    let out = cos_theta * k + sin_theta * (phi.cos() * u + phi.sin() * v);
    Direction::new(out.x, out.y, out.z).expect("rotation preserves the norm")
}

/// The Planck function `B_lambda(T)` in SI units
pub fn planck_lambda(lambda: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    let x = PLANCK * LIGHTSPEED / (lambda * BOLTZMANN * t);
    if x > 700.0 {
        return 0.0;
    }
    2.0 * PLANCK * LIGHTSPEED * LIGHTSPEED / lambda.powi(5) / (x.exp() - 1.0)
}

fn check_coverage(resource: &str, lambdav: &[f64], grid: &WavelengthGrid) -> Result<()> {
    let found_min = lambdav[0];
    let found_max = *lambdav.last().expect("non-empty wavelength table");
    if found_min > grid.lambda_first() || found_max < grid.lambda_last() {
        return Err(Error::WavelengthCoverage {
            resource: resource.to_string(),
            found_min,
            found_max,
            needed_min: grid.lambda_first(),
            needed_max: grid.lambda_last(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::constant_composition;

    fn simple_grid() -> WavelengthGrid {
        WavelengthGrid::new(vec![1e-7, 1e-6, 1e-5]).unwrap()
    }

    #[test]
    fn aggregates_satisfy_the_cross_section_identities() {
        let grid = simple_grid();
        let mut builder = MixtureBuilder::new(&grid);
        builder
            .add_population("a", 1e-29, vec![2.0, 1.0, 0.5], vec![1.0, 0.5, 0.25], vec![0.5; 3])
            .unwrap();
        builder
            .add_population("b", 2e-29, vec![1.0, 1.0, 1.0], vec![0.0, 0.5, 1.0], vec![0.1; 3])
            .unwrap();
        let mix = builder.build().unwrap();

        for ell in 0..3 {
            let expected = mix.sigma_abs(ell) + mix.sigma_sca(ell);
            assert_eq!(mix.sigma_ext(ell), expected);
            assert!((mix.kappa_abs(ell) + mix.kappa_sca(ell) - mix.kappa_ext(ell)).abs() < 1e-12);
            let albedo = mix.albedo(ell);
            assert!((albedo - mix.kappa_sca(ell) / mix.kappa_ext(ell)).abs() < 1e-12);
            assert!((0.0..=1.0).contains(&albedo));
        }
        assert_eq!(mix.mu(), 3e-29);
    }

    #[test]
    fn mrn_power_law_recovers_the_analytic_grain_mass() {
        // MRN graphite: Omega(a) = C a^-3.5 between 50 Angstrom and
        // 0.25 micron, with C converted from cm^2.5 to m^2.5
        let c = 10_f64.powf(-25.13) * 1e-5;
        let (amin, amax) = (5e-9, 250e-9);
        let rho_bulk = 2.24e3;

        let grid = simple_grid();
        let composition = constant_composition(
            "graphite",
            rho_bulk,
            vec![1e-8, 1e-4],
            vec![1e-9, 1e-6],
            1.0,
            1.0,
            0.5,
        )
        .unwrap();
        let sizedist = GrainSizeDistribution::power_law(c, 3.5, amin, amax).unwrap();

        let mut builder = MixtureBuilder::new(&grid);
        builder.add_grain_populations(&composition, &sizedist, 5).unwrap();
        let mix = builder.build().unwrap();

        // mu = C rho (4 pi / 3) int a^-0.5 da = C rho (8 pi / 3)(sqrt(amax)-sqrt(amin))
        let expected = c * rho_bulk * 8.0 * PI / 3.0 * (amax.sqrt() - amin.sqrt());
        let relative = (mix.mu() - expected).abs() / expected;
        assert!(relative < 0.01, "grain mass off by {relative}");
    }

    #[test]
    fn narrower_composition_grids_are_rejected() {
        let grid = simple_grid();
        let composition = constant_composition(
            "narrow",
            3e3,
            vec![5e-7, 5e-6],
            vec![1e-8],
            1.0,
            1.0,
            0.0,
        )
        .unwrap();
        let sizedist = GrainSizeDistribution::power_law(1.0, 3.5, 1e-9, 1e-7).unwrap();
        let mut builder = MixtureBuilder::new(&grid);
        assert!(builder.add_grain_populations(&composition, &sizedist, 2).is_err());
    }

    #[test]
    fn henyey_greenstein_reduces_to_isotropic() {
        assert_eq!(henyey_greenstein(0.0, 0.3), 1.0);
        // forward peaked for positive g
        assert!(henyey_greenstein(0.6, 1.0) > henyey_greenstein(0.6, -1.0));
    }

    #[test]
    fn henyey_greenstein_sampling_matches_the_mean_cosine() {
        let mut random = Random::default();
        let g = 0.4;
        let n = 100_000;
        let mean: f64 = (0..n)
            .map(|_| sample_henyey_greenstein(g, &mut random))
            .sum::<f64>()
            / n as f64;
        assert!((mean - g).abs() < 0.01, "mean cosine {mean}");
    }

    #[test]
    fn planck_inversion_round_trips() {
        let grid = WavelengthGrid::new(
            dustrt_numeric::log_grid(1e-7, 1e-3, 200).unwrap(),
        )
        .unwrap();
        let mut builder = MixtureBuilder::new(&grid);
        let n = grid.n_lambda();
        builder
            .add_population("gray", 1e-29, vec![1e-25; n], vec![0.0; n], vec![0.0; n])
            .unwrap();
        let mix = builder.build().unwrap();

        for t in [20.0, 100.0, 1000.0] {
            let value = mix.planck_abs_pop(t, 0).unwrap();
            let recovered = mix.inv_planck_abs_pop(value, 0).unwrap();
            assert!(
                (recovered / t - 1.0).abs() < 0.02,
                "T {t} recovered as {recovered}"
            );
        }
    }

    #[test]
    fn scattering_directions_have_the_right_mean_cosine() {
        let grid = simple_grid();
        let mut builder = MixtureBuilder::new(&grid);
        builder
            .add_population("hg", 1e-29, vec![1.0; 3], vec![1.0; 3], vec![0.5; 3])
            .unwrap();
        let mix = builder.build().unwrap();
        let mut random = Random::default();
        let k_in = Direction::z_axis();
        let n = 50_000;
        let mean: f64 = (0..n)
            .map(|_| mix.sample_scattering_direction(&mut random, 1, &k_in).z())
            .sum::<f64>()
            / n as f64;
        assert!((mean - 0.5).abs() < 0.01, "mean cosine {mean}");
    }
}
