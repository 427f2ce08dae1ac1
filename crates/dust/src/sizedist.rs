//! Grain size distributions
//!
//! A size distribution specifies `Omega(a) = (dn_D/da)/n_H`, the number
//! of dust grains per unit size interval per hydrogen atom, on a range
//! `[a_min, a_max]`. Sizes are in metres throughout; the proportionality
//! factors carry the corresponding SI powers.

use crate::error::{Error, Result};
use std::f64::consts::PI;

// constants of the Weingartner & Draine (2001) Milky Way fits
const WD_GRA: (f64, f64, f64, f64, f64) = (9.99e-12, 0.0107e-6, 0.428e-6, -1.54, -0.165);
const WD_SIL: (f64, f64, f64, f64, f64) = (1.00e-13, 0.164e-6, 0.1e-6, -2.21, 0.300);
// double log-normal PAH parameters of Draine & Li (2001)
const PAH_SIGMA: f64 = 0.4;
const PAH_A0: [f64; 2] = [3.5e-10, 30e-10];
const PAH_BC: [f64; 2] = [4.5e-5, 1.5e-5];
const PAH_AMIN: f64 = 3.5e-10;
const CARBON_MASS: f64 = 1.9944e-26;
const GRAPHITE_DENSITY: f64 = 2.24e3;

/// The catalog of grain size distributions
#[derive(Debug, Clone, PartialEq)]
pub enum GrainSizeDistribution {
    /// A plain power law `C a^-gamma`
    PowerLaw {
        c: f64,
        gamma: f64,
        amin: f64,
        amax: f64,
    },
    /// A power law with an exponential decay beyond a turnover size
    PowerLawExpTail {
        c: f64,
        alpha: f64,
        at: f64,
        ac: f64,
        gamma: f64,
        amin: f64,
        amax: f64,
    },
    /// A power law with curvature and an exponential decay
    ModifiedPowerLaw {
        c: f64,
        alpha: f64,
        at: f64,
        ac: f64,
        gamma: f64,
        au: f64,
        zeta: f64,
        eta: f64,
        amin: f64,
        amax: f64,
    },
    /// All grains share (very nearly) a single size
    SingleSize { a0: f64, c: f64 },
    /// A log-normal distribution
    LogNormal {
        c: f64,
        a0: f64,
        sigma: f64,
        amin: f64,
        amax: f64,
    },
    /// The fitted Weingartner-Draine Milky Way graphite distribution
    WeingartnerDraineGraphite { amin: f64, amax: f64 },
    /// The fitted Weingartner-Draine Milky Way silicate distribution
    WeingartnerDraineSilicate { amin: f64, amax: f64 },
    /// The fitted Draine-Li PAH distribution (per charge state)
    WeingartnerDrainePah { amin: f64, amax: f64 },
}

impl GrainSizeDistribution {
    /// A plain power law on `[amin, amax]`
    pub fn power_law(c: f64, gamma: f64, amin: f64, amax: f64) -> Result<Self> {
        check_range("PowerLaw", amin, amax)?;
        check_positive("PowerLaw", "c", c)?;
        Ok(Self::PowerLaw {
            c,
            gamma,
            amin,
            amax,
        })
    }

    /// A power law with an exponential tail beyond `at`
    pub fn power_law_exp_tail(
        c: f64,
        alpha: f64,
        at: f64,
        ac: f64,
        gamma: f64,
        amin: f64,
        amax: f64,
    ) -> Result<Self> {
        check_range("PowerLawExpTail", amin, amax)?;
        check_positive("PowerLawExpTail", "c", c)?;
        check_positive("PowerLawExpTail", "at", at)?;
        check_positive("PowerLawExpTail", "ac", ac)?;
        Ok(Self::PowerLawExpTail {
            c,
            alpha,
            at,
            ac,
            gamma,
            amin,
            amax,
        })
    }

    /// A curved power law with an exponential tail
    #[allow(clippy::too_many_arguments)]
    pub fn modified_power_law(
        c: f64,
        alpha: f64,
        at: f64,
        ac: f64,
        gamma: f64,
        au: f64,
        zeta: f64,
        eta: f64,
        amin: f64,
        amax: f64,
    ) -> Result<Self> {
        check_range("ModifiedPowerLaw", amin, amax)?;
        check_positive("ModifiedPowerLaw", "c", c)?;
        check_positive("ModifiedPowerLaw", "at", at)?;
        check_positive("ModifiedPowerLaw", "ac", ac)?;
        check_positive("ModifiedPowerLaw", "au", au)?;
        Ok(Self::ModifiedPowerLaw {
            c,
            alpha,
            at,
            ac,
            gamma,
            au,
            zeta,
            eta,
            amin,
            amax,
        })
    }

    /// A narrow distribution around a single grain size
    pub fn single_size(a0: f64, c: f64) -> Result<Self> {
        check_positive("SingleSize", "a0", a0)?;
        check_positive("SingleSize", "c", c)?;
        Ok(Self::SingleSize { a0, c })
    }

    /// A log-normal distribution centred on `a0`
    pub fn log_normal(c: f64, a0: f64, sigma: f64, amin: f64, amax: f64) -> Result<Self> {
        check_range("LogNormal", amin, amax)?;
        check_positive("LogNormal", "c", c)?;
        check_positive("LogNormal", "a0", a0)?;
        check_positive("LogNormal", "sigma", sigma)?;
        Ok(Self::LogNormal {
            c,
            a0,
            sigma,
            amin,
            amax,
        })
    }

    /// The Weingartner-Draine Milky Way graphite fit
    pub fn weingartner_draine_graphite() -> Self {
        Self::WeingartnerDraineGraphite {
            amin: 0.001e-6,
            amax: 10.0e-6,
        }
    }

    /// The Weingartner-Draine Milky Way silicate fit
    pub fn weingartner_draine_silicate() -> Self {
        Self::WeingartnerDraineSilicate {
            amin: 0.001e-6,
            amax: 10.0e-6,
        }
    }

    /// The Draine-Li PAH fit for a single charge state
    pub fn weingartner_draine_pah() -> Self {
        Self::WeingartnerDrainePah {
            amin: 0.0003548e-6,
            amax: 0.01e-6,
        }
    }

    /// The size range `[a_min, a_max]` of the distribution
    pub fn range(&self) -> (f64, f64) {
        match *self {
            Self::PowerLaw { amin, amax, .. }
            | Self::PowerLawExpTail { amin, amax, .. }
            | Self::ModifiedPowerLaw { amin, amax, .. }
            | Self::LogNormal { amin, amax, .. }
            | Self::WeingartnerDraineGraphite { amin, amax }
            | Self::WeingartnerDraineSilicate { amin, amax }
            | Self::WeingartnerDrainePah { amin, amax } => (amin, amax),
            Self::SingleSize { a0, .. } => (a0 * (1.0 - 5e-4), a0 * (1.0 + 5e-4)),
        }
    }

    /// The value `Omega(a)`; zero outside the size range
    pub fn omega(&self, a: f64) -> f64 {
        let (amin, amax) = self.range();
        if a < amin || a > amax {
            return 0.0;
        }
        match *self {
            Self::PowerLaw { c, gamma, .. } => c * a.powf(-gamma),
            Self::PowerLawExpTail {
                c,
                alpha,
                at,
                ac,
                gamma,
                ..
            } => {
                let tail = if a <= at {
                    1.0
                } else {
                    (-((a - at) / ac).powf(gamma)).exp()
                };
                c * a.powf(alpha) * tail
            }
            Self::ModifiedPowerLaw {
                c,
                alpha,
                at,
                ac,
                gamma,
                au,
                zeta,
                eta,
                ..
            } => {
                let curvature =
                    (1.0 + zeta.abs() * (a / au).powf(eta)).powi(if zeta >= 0.0 { 1 } else { -1 });
                let tail = if a <= at {
                    1.0
                } else {
                    (-((a - at) / ac).powf(gamma)).exp()
                };
                c * a.powf(alpha) * curvature * tail
            }
            Self::SingleSize { a0, c } => {
                // a top hat over the narrow range keeps the integral at c
                c / (a0 * 1e-3)
            }
            Self::LogNormal { c, a0, sigma, .. } => {
                let u = (a / a0).ln() / sigma;
                c / a * (-0.5 * u * u).exp()
            }
            Self::WeingartnerDraineGraphite { .. } => {
                let (c, at, ac, alpha, beta) = WD_GRA;
                wd_grain(a, c, at, ac, alpha, beta)
            }
            Self::WeingartnerDraineSilicate { .. } => {
                let (c, at, ac, alpha, beta) = WD_SIL;
                wd_grain(a, c, at, ac, alpha, beta)
            }
            Self::WeingartnerDrainePah { .. } => 0.5 * dl_pah(a),
        }
    }
}

// the Weingartner-Draine graphite/silicate parameterisation
fn wd_grain(a: f64, c: f64, at: f64, ac: f64, alpha: f64, beta: f64) -> f64 {
    let f0 = c / a * (a / at).powf(alpha);
    let f1 = if beta > 0.0 {
        1.0 + beta * a / at
    } else {
        1.0 / (1.0 - beta * a / at)
    };
    let f2 = if a < at {
        1.0
    } else {
        (-((a - at) / ac).powi(3)).exp()
    };
    f0 * f1 * f2
}

// the Draine-Li double log-normal PAH parameterisation
fn dl_pah(a: f64) -> f64 {
    let mut b = [0.0; 2];
    for i in 0..2 {
        let t0 = 3.0 / (2.0 * PI).powf(1.5);
        let t1 = (-4.5 * PAH_SIGMA * PAH_SIGMA).exp();
        let t2 = 1.0 / GRAPHITE_DENSITY / PAH_A0[i].powi(3) / PAH_SIGMA;
        let erffac = 3.0 * PAH_SIGMA / 2.0_f64.sqrt()
            + (PAH_A0[i] / PAH_AMIN).ln() / (2.0_f64.sqrt() * PAH_SIGMA);
        let t3 = PAH_BC[i] * CARBON_MASS / (1.0 + erf(erffac));
        b[i] = t0 * t1 * t2 * t3;
    }
    let mut sum = 0.0;
    for i in 0..2 {
        let u = (a / PAH_A0[i]).ln() / PAH_SIGMA;
        sum += b[i] / a * (-0.5 * u * u).exp();
    }
    sum
}

// Abramowitz & Stegun 7.1.26 rational approximation, |error| < 1.5e-7
fn erf(x: f64) -> f64 {
    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + 0.3275911 * x);
    let y = 1.0
        - (((((1.061405429 * t - 1.453152027) * t) + 1.421413741) * t - 0.284496736) * t
            + 0.254829592)
            * t
            * (-x * x).exp();
    sign * y
}

fn check_range(component: &'static str, amin: f64, amax: f64) -> Result<()> {
    check_positive(component, "amin", amin)?;
    if amax <= amin {
        return Err(Error::InvalidConfiguration {
            component,
            requirement: "a maximum size larger than the minimum size",
        });
    }
    Ok(())
}

fn check_positive(component: &'static str, parameter: &'static str, value: f64) -> Result<()> {
    if value <= 0.0 {
        return Err(Error::NonPositiveParameter {
            component,
            parameter,
            value,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_law_values() {
        let dist = GrainSizeDistribution::power_law(2.0, 3.5, 1e-9, 1e-7).unwrap();
        assert_eq!(dist.omega(1e-8), 2.0 * 1e-8_f64.powf(-3.5));
        assert_eq!(dist.omega(1e-10), 0.0);
        assert_eq!(dist.omega(1e-6), 0.0);
    }

    #[test]
    fn exp_tail_decays_beyond_turnover() {
        let dist =
            GrainSizeDistribution::power_law_exp_tail(1.0, -3.5, 1e-8, 1e-8, 3.0, 1e-9, 1e-6)
                .unwrap();
        let below = dist.omega(0.9e-8) / 0.9e-8_f64.powf(-3.5);
        let above = dist.omega(3e-8) / 3e-8_f64.powf(-3.5);
        assert!((below - 1.0).abs() < 1e-12);
        assert!(above < 1e-3);
    }

    #[test]
    fn erf_matches_reference_values() {
        assert!((erf(0.0)).abs() < 1e-7);
        assert!((erf(1.0) - 0.8427007929).abs() < 1e-6);
        assert!((erf(-1.0) + 0.8427007929).abs() < 1e-6);
    }

    #[test]
    fn pah_distribution_is_positive_in_range() {
        let dist = GrainSizeDistribution::weingartner_draine_pah();
        let (amin, amax) = dist.range();
        let mid = (amin * amax).sqrt();
        assert!(dist.omega(mid) > 0.0);
        assert_eq!(dist.omega(amax * 2.0), 0.0);
    }
}
