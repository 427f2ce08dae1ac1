//! Spherically symmetric density profiles
//!
//! These geometries depend on the radius only. On top of the general
//! contract they expose the radial density `density_r(r)` and the radial
//! surface density `sigma_r()`, which the τ-based normalization rules and
//! the spheroidal decorator build on.
//!
//! Profiles without a closed-form mass function (Einasto, Sérsic) carry a
//! tabulated cumulative radial mass distribution built at construction
//! time, which also backs their position sampler.

use crate::error::{Error, Result};
use crate::special::{gexp, gln, gln2};
use dustrt_numeric::{cdf_with, log_grid, Random};
use std::f64::consts::PI;

/// Number of points in tabulated radial mass profiles
const N_RADIAL: usize = 501;

/// The catalog of spherically symmetric geometries
#[derive(Debug, Clone, PartialEq)]
pub enum SpheGeometry {
    /// The Plummer sphere with scale radius `c`
    Plummer { c: f64 },
    /// The Einasto profile with index `n` and effective radius `r_eff`
    Einasto {
        n: f64,
        r_eff: f64,
        d_n: f64,
        rho0: f64,
        rv: Vec<f64>,
        cumulative: Vec<f64>,
        sigma: f64,
    },
    /// The Sérsic profile (Prugniel-Simien deprojection) with index `n`
    Sersic {
        n: f64,
        r_eff: f64,
        b_n: f64,
        p_n: f64,
        rho0: f64,
        rv: Vec<f64>,
        cumulative: Vec<f64>,
        sigma: f64,
    },
    /// A power-law shell `r^-p` between an inner and an outer radius
    Shell {
        p: f64,
        rmin: f64,
        rmax: f64,
        a: f64,
        smin: f64,
        sdiff: f64,
    },
}

impl SpheGeometry {
    /// Initialise a Plummer sphere with scale radius `c`
    pub fn plummer(c: f64) -> Result<Self> {
        positive("Plummer", "c", c)?;
        Ok(Self::Plummer { c })
    }

    /// Initialise an Einasto profile
    ///
    /// The density is `rho0 exp(-d_n ((r/r_eff)^(1/n) - 1))` with `d_n`
    /// chosen so that `r_eff` encloses half of the total mass.
    pub fn einasto(n: f64, r_eff: f64) -> Result<Self> {
        positive("Einasto", "n", n)?;
        positive("Einasto", "r_eff", r_eff)?;

        let d_n = 3.0 * n - 1.0 / 3.0 + 0.0079 / n;
        let shape = move |r: f64| (-d_n * ((r / r_eff).powf(1.0 / n) - 1.0)).exp();

        // truncate where the profile has decayed by ~e^-40
        let r_out = r_eff * (1.0 + 40.0 / d_n).powf(n);
        let (rv, cumulative, mass, line) = tabulate_radial("Einasto", r_eff, r_out, shape)?;
        let rho0 = 1.0 / (4.0 * PI * mass);

        Ok(Self::Einasto {
            n,
            r_eff,
            d_n,
            rho0,
            rv,
            cumulative,
            sigma: rho0 * line,
        })
    }

    /// Initialise a Sérsic profile with index `n` and effective radius
    ///
    /// Uses the Prugniel-Simien analytical deprojection
    /// `rho(r) = rho0 (r/r_eff)^(-p_n) exp(-b_n (r/r_eff)^(1/n))`.
    pub fn sersic(n: f64, r_eff: f64) -> Result<Self> {
        positive("Sersic", "n", n)?;
        positive("Sersic", "r_eff", r_eff)?;

        let b_n = 2.0 * n - 1.0 / 3.0 + 0.009876 / n;
        let p_n = 1.0 - 0.6097 / n + 0.05563 / (n * n);
        let shape =
            move |r: f64| (r / r_eff).powf(-p_n) * (-b_n * (r / r_eff).powf(1.0 / n)).exp();

        let r_out = r_eff * (1.0 + 40.0 / b_n).powf(n);
        let (rv, cumulative, mass, line) = tabulate_radial("Sersic", r_eff, r_out, shape)?;
        let rho0 = 1.0 / (4.0 * PI * mass);

        Ok(Self::Sersic {
            n,
            r_eff,
            b_n,
            p_n,
            rho0,
            rv,
            cumulative,
            sigma: rho0 * line,
        })
    }

    /// Initialise a power-law shell between `rmin` and `rmax`
    pub fn shell(p: f64, rmin: f64, rmax: f64) -> Result<Self> {
        positive("Shell", "rmin", rmin)?;
        if rmax <= rmin {
            return Err(Error::InvalidConfiguration {
                component: "Shell",
                requirement: "an outer radius larger than the inner radius",
            });
        }

        // total mass 4 pi A int r^(2-p) dr over the shell equals one
        let sdiff = gln2(p - 2.0, rmax, rmin);
        let a = 1.0 / (4.0 * PI * sdiff);
        let smin = gln(p - 2.0, rmin);

        Ok(Self::Shell {
            p,
            rmin,
            rmax,
            a,
            smin,
            sdiff,
        })
    }

    /// The density at radius `r`
    pub fn density_r(&self, r: f64) -> f64 {
        match self {
            Self::Plummer { c } => {
                3.0 / (4.0 * PI * c.powi(3)) * (1.0 + (r / c).powi(2)).powf(-2.5)
            }
            Self::Einasto {
                n,
                r_eff,
                d_n,
                rho0,
                ..
            } => rho0 * (-d_n * ((r / r_eff).powf(1.0 / *n) - 1.0)).exp(),
            Self::Sersic {
                n,
                r_eff,
                b_n,
                p_n,
                rho0,
                ..
            } => {
                if r <= 0.0 {
                    return f64::INFINITY;
                }
                rho0 * (r / r_eff).powf(-p_n) * (-b_n * (r / r_eff).powf(1.0 / *n)).exp()
            }
            Self::Shell {
                p, rmin, rmax, a, ..
            } => {
                if r < *rmin || r > *rmax {
                    0.0
                } else {
                    a * r.powf(-p)
                }
            }
        }
    }

    /// Draw a radius from the cumulative radial mass distribution
    pub fn sample_radius(&self, random: &mut Random) -> f64 {
        match self {
            Self::Plummer { c } => {
                // closed-form inversion of M(r) = r^3 (r^2+c^2)^(-3/2)
                let x = random.uniform();
                let t = x.powf(-2.0 / 3.0) - 1.0;
                c / t.sqrt()
            }
            Self::Einasto { rv, cumulative, .. } | Self::Sersic { rv, cumulative, .. } => {
                random.cdf(rv, cumulative)
            }
            Self::Shell { p, smin, sdiff, .. } => {
                let s = smin + random.uniform() * sdiff;
                gexp(p - 2.0, s)
            }
        }
    }

    /// The radial surface density `int_0^inf rho(r) dr`
    pub fn sigma_r(&self) -> f64 {
        match self {
            Self::Plummer { c } => 1.0 / (2.0 * PI * c * c),
            Self::Einasto { sigma, .. } | Self::Sersic { sigma, .. } => *sigma,
            Self::Shell {
                p,
                rmin,
                rmax,
                a,
                ..
            } => a * gln2(*p, *rmax, *rmin),
        }
    }
}

/// Tabulate the shape function on `[0, r_out]` and return the radius grid,
/// the normalised cumulative mass, the mass integral `int s r^2 dr` and
/// the line integral `int s dr`
fn tabulate_radial(
    component: &'static str,
    r_scale: f64,
    r_out: f64,
    shape: impl Fn(f64) -> f64,
) -> Result<(Vec<f64>, Vec<f64>, f64, f64)> {
    // logarithmic interior grid with an explicit origin point
    let mut rv = vec![0.0];
    rv.extend(
        log_grid(r_scale * 1e-4, r_out, N_RADIAL - 1).map_err(Error::numeric(component))?,
    );

    let n = rv.len();
    let mut mass = 0.0;
    let mut line = 0.0;
    let mut weights = Vec::with_capacity(n - 1);
    let mut prev_r = rv[0];
    // the shape may be singular at the origin; open the first bin there
    let mut prev_m = 0.0;
    let mut prev_l = 0.0;
    for &r in rv.iter().skip(1) {
        let s = shape(r);
        let m = s * r * r;
        let dm = 0.5 * (r - prev_r) * (prev_m + m);
        let dl = 0.5 * (r - prev_r) * (prev_l + s);
        mass += dm;
        line += dl;
        weights.push(dm);
        prev_r = r;
        prev_m = m;
        prev_l = s;
    }

    let cumulative = cdf_with(weights.len(), |i| weights[i]).map_err(Error::numeric(component))?;
    Ok((rv, cumulative, mass, line))
}

pub(crate) fn positive(component: &'static str, parameter: &'static str, value: f64) -> Result<()> {
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

    fn total_mass(geometry: &SpheGeometry, r_out: f64) -> f64 {
        let n = 20000;
        let mut mass = 0.0;
        for i in 0..n {
            let r1 = r_out * i as f64 / n as f64;
            let r2 = r_out * (i + 1) as f64 / n as f64;
            let f1 = geometry.density_r(r1.max(1e-12 * r_out)) * r1 * r1;
            let f2 = geometry.density_r(r2) * r2 * r2;
            mass += 0.5 * (r2 - r1) * (f1 + f2);
        }
        4.0 * PI * mass
    }

    #[test]
    fn plummer_mass_and_surface_density() {
        let geometry = SpheGeometry::plummer(2.0).unwrap();
        assert!((total_mass(&geometry, 2000.0) - 1.0).abs() < 1e-3);
        assert!((geometry.sigma_r() - 1.0 / (8.0 * PI)).abs() < 1e-12);
    }

    #[test]
    fn einasto_mass_is_normalised() {
        let geometry = SpheGeometry::einasto(2.0, 1.0).unwrap();
        assert!((total_mass(&geometry, 60.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn sersic_mass_is_normalised() {
        let geometry = SpheGeometry::sersic(4.0, 1.0).unwrap();
        assert!((total_mass(&geometry, 2000.0) - 1.0).abs() < 2e-2);
    }

    #[test]
    fn shell_density_vanishes_outside() {
        let geometry = SpheGeometry::shell(2.0, 1.0, 3.0).unwrap();
        assert_eq!(geometry.density_r(0.5), 0.0);
        assert_eq!(geometry.density_r(3.5), 0.0);
        assert!((total_mass(&geometry, 3.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn sampled_radii_follow_the_mass_profile() {
        let mut random = Random::default();
        let geometry = SpheGeometry::plummer(1.0).unwrap();
        // the median of the Plummer mass profile: M(r) = 1/2 at
        // r = 1/sqrt(2^(2/3) - 1)
        let expected_median = 1.0 / (2.0_f64.powf(2.0 / 3.0) - 1.0).sqrt();
        let mut below = 0;
        let n = 20000;
        for _ in 0..n {
            if geometry.sample_radius(&mut random) < expected_median {
                below += 1;
            }
        }
        let fraction = below as f64 / n as f64;
        assert!((fraction - 0.5).abs() < 0.02, "median fraction {fraction}");
    }
}
