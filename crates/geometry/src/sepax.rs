//! Separable axisymmetric density profiles
//!
//! These geometries factorise as `rho(R, z) = rho_R(R) * rho_z(z)`, so the
//! position sampler draws the cylindrical radius and the height from two
//! independent one-dimensional distributions and the azimuth uniformly.

use crate::error::{Error, Result};
use crate::sphe::positive;
use dustrt_numeric::{cdf_with, lin_grid, Random};
use std::f64::consts::PI;

/// The catalog of separable axisymmetric geometries
#[derive(Debug, Clone, PartialEq)]
pub enum SepAxGeometry {
    /// The double-exponential disk with radial and vertical scale lengths
    ExpDisk { h_r: f64, h_z: f64, rho0: f64 },
    /// A disk with different inner and outer radial scale lengths joined
    /// smoothly at a break radius
    BrokenExpDisk {
        h_inn: f64,
        h_out: f64,
        h_z: f64,
        r_break: f64,
        sharpness: f64,
        beta: f64,
        rho0: f64,
        sigma_r: f64,
        rv: Vec<f64>,
        cumulative: Vec<f64>,
    },
    /// A flattened Gaussian with dispersion `sigma` and flattening `q`
    Gaussian { sigma: f64, q: f64, rho0: f64 },
    /// A Gaussian ring in radius with an exponential vertical profile
    Ring {
        r_ring: f64,
        width: f64,
        h_z: f64,
        rho0: f64,
        sigma_r: f64,
        rv: Vec<f64>,
        cumulative: Vec<f64>,
    },
}

impl SepAxGeometry {
    /// Initialise a double-exponential disk
    pub fn exp_disk(h_r: f64, h_z: f64) -> Result<Self> {
        positive("ExpDisk", "h_r", h_r)?;
        positive("ExpDisk", "h_z", h_z)?;
        let rho0 = 1.0 / (4.0 * PI * h_r * h_r * h_z);
        Ok(Self::ExpDisk { h_r, h_z, rho0 })
    }

    /// Initialise a broken-exponential disk
    ///
    /// The radial profile is `exp(-R/h_inn) (1 + exp(s (R - r_break) /
    /// h_out))^beta` with `beta = (h_out/h_inn - 1)/s`, which tends to
    /// `exp(-R/h_inn)` well inside the break radius and to a scaled
    /// `exp(-R/h_out)` well outside it. The radial mass distribution has
    /// no closed form and is tabulated at construction.
    pub fn broken_exp_disk(
        h_inn: f64,
        h_out: f64,
        h_z: f64,
        r_break: f64,
        sharpness: f64,
    ) -> Result<Self> {
        positive("BrokenExpDisk", "h_inn", h_inn)?;
        positive("BrokenExpDisk", "h_out", h_out)?;
        positive("BrokenExpDisk", "h_z", h_z)?;
        positive("BrokenExpDisk", "r_break", r_break)?;
        positive("BrokenExpDisk", "sharpness", sharpness)?;

        let beta = (h_out / h_inn - 1.0) / sharpness;
        let radial =
            move |r: f64| (-r / h_inn).exp() * (1.0 + (sharpness * (r - r_break) / h_out).exp()).powf(beta);

        // inner part resolved up to the break, outer part to ~10 scale lengths
        let mut rv = lin_grid(0.0, r_break, 201).map_err(Error::numeric("BrokenExpDisk"))?;
        rv.pop();
        rv.extend(
            lin_grid(r_break, r_break + 10.0 * h_out, 401)
                .map_err(Error::numeric("BrokenExpDisk"))?,
        );

        let (cumulative, mass, line) = tabulate_radial(&rv, radial)?;
        let rho0 = 1.0 / (4.0 * PI * h_z * mass);

        Ok(Self::BrokenExpDisk {
            h_inn,
            h_out,
            h_z,
            r_break,
            sharpness,
            beta,
            rho0,
            sigma_r: rho0 * line,
            rv,
            cumulative,
        })
    }

    /// Initialise a flattened Gaussian
    pub fn gaussian(sigma: f64, q: f64) -> Result<Self> {
        positive("Gaussian", "sigma", sigma)?;
        flattening("Gaussian", q)?;
        let rho0 = 1.0 / ((2.0 * PI).sqrt() * sigma).powi(3) / q;
        Ok(Self::Gaussian { sigma, q, rho0 })
    }

    /// Initialise a Gaussian ring with an exponential vertical profile
    pub fn ring(r_ring: f64, width: f64, h_z: f64) -> Result<Self> {
        positive("Ring", "r_ring", r_ring)?;
        positive("Ring", "width", width)?;
        positive("Ring", "h_z", h_z)?;

        let radial = move |r: f64| (-(r - r_ring) * (r - r_ring) / (2.0 * width * width)).exp();
        let rv = lin_grid(0.0, r_ring + 10.0 * width, 601).map_err(Error::numeric("Ring"))?;
        let (cumulative, mass, line) = tabulate_radial(&rv, radial)?;
        let rho0 = 1.0 / (4.0 * PI * h_z * mass);

        Ok(Self::Ring {
            r_ring,
            width,
            h_z,
            rho0,
            sigma_r: rho0 * line,
            rv,
            cumulative,
        })
    }

    /// The density at cylindrical coordinates `(R, z)`
    pub fn density_rz(&self, r: f64, z: f64) -> f64 {
        match self {
            Self::ExpDisk { h_r, h_z, rho0 } => rho0 * (-r / h_r - z.abs() / h_z).exp(),
            Self::BrokenExpDisk {
                h_inn,
                h_out,
                h_z,
                r_break,
                sharpness,
                beta,
                rho0,
                ..
            } => {
                let radial = (-r / h_inn).exp()
                    * (1.0 + (sharpness * (r - r_break) / h_out).exp()).powf(*beta);
                rho0 * (-z.abs() / h_z).exp() * radial
            }
            Self::Gaussian { sigma, q, rho0 } => {
                let m2 = r * r + z * z / (q * q);
                rho0 * (-0.5 * m2 / (sigma * sigma)).exp()
            }
            Self::Ring {
                r_ring,
                width,
                h_z,
                rho0,
                ..
            } => {
                let u = (r - r_ring) / width;
                rho0 * (-0.5 * u * u).exp() * (-z.abs() / h_z).exp()
            }
        }
    }

    /// Draw a cylindrical radius from the radial mass distribution
    pub fn random_cyl_radius(&self, random: &mut Random) -> f64 {
        match self {
            Self::ExpDisk { h_r, .. } => {
                // R exp(-R/h) is the sum of two exponential deviates
                -h_r * (random.uniform().max(f64::MIN_POSITIVE).ln()
                    + random.uniform().max(f64::MIN_POSITIVE).ln())
            }
            Self::BrokenExpDisk { rv, cumulative, .. } | Self::Ring { rv, cumulative, .. } => {
                random.cdf(rv, cumulative)
            }
            Self::Gaussian { sigma, .. } => {
                sigma * (-2.0 * (1.0 - random.uniform()).ln()).sqrt()
            }
        }
    }

    /// Draw a height from the vertical mass distribution
    pub fn random_height(&self, random: &mut Random) -> f64 {
        match self {
            Self::ExpDisk { h_z, .. }
            | Self::BrokenExpDisk { h_z, .. }
            | Self::Ring { h_z, .. } => double_sided_exp(*h_z, random.uniform()),
            Self::Gaussian { sigma, q, .. } => q * sigma * random.gauss(),
        }
    }

    /// The radial surface density `int_0^inf rho(R, 0) dR`
    pub fn sigma_r(&self) -> f64 {
        match self {
            Self::ExpDisk { h_r, h_z, .. } => 1.0 / (4.0 * PI * h_r * h_z),
            Self::BrokenExpDisk { sigma_r, .. } | Self::Ring { sigma_r, .. } => *sigma_r,
            Self::Gaussian { sigma, q, .. } => 1.0 / (4.0 * PI * q * sigma * sigma),
        }
    }

    /// The Z-axis surface density `int_-inf^inf rho(0, z) dz`
    pub fn sigma_z(&self) -> f64 {
        match self {
            Self::ExpDisk { h_r, .. } => 1.0 / (2.0 * PI * h_r * h_r),
            Self::BrokenExpDisk { h_z, rho0, .. } => 2.0 * rho0 * h_z * self_radial_at_zero(self),
            Self::Gaussian { sigma, .. } => 1.0 / (2.0 * PI * sigma * sigma),
            Self::Ring { h_z, rho0, .. } => 2.0 * rho0 * h_z * self_radial_at_zero(self),
        }
    }
}

// the radial factor at R = 0, without the central density scaling
fn self_radial_at_zero(geometry: &SepAxGeometry) -> f64 {
    match geometry {
        SepAxGeometry::BrokenExpDisk {
            h_out,
            r_break,
            sharpness,
            beta,
            ..
        } => (1.0 + (-sharpness * r_break / h_out).exp()).powf(*beta),
        SepAxGeometry::Ring { r_ring, width, .. } => {
            let u = r_ring / width;
            (-0.5 * u * u).exp()
        }
        _ => 1.0,
    }
}

/// Sample a double-sided exponential with scale `h` from a uniform deviate
fn double_sided_exp(h: f64, x_uniform: f64) -> f64 {
    if x_uniform <= 0.5 {
        h * (2.0 * x_uniform).max(f64::MIN_POSITIVE).ln()
    } else {
        -h * (2.0 * (1.0 - x_uniform)).max(f64::MIN_POSITIVE).ln()
    }
}

// trapezoidal radial integration: returns the cumulative distribution of
// R f(R), the mass integral int R f dR, and the line integral int f dR
fn tabulate_radial(
    rv: &[f64],
    radial: impl Fn(f64) -> f64,
) -> Result<(Vec<f64>, f64, f64)> {
    let mut mass = 0.0;
    let mut line = 0.0;
    let mut weights = Vec::with_capacity(rv.len() - 1);
    for pair in rv.windows(2) {
        let (r1, r2) = (pair[0], pair[1]);
        let (f1, f2) = (radial(r1), radial(r2));
        let dm = 0.5 * (r2 - r1) * (r1 * f1 + r2 * f2);
        mass += dm;
        line += 0.5 * (r2 - r1) * (f1 + f2);
        weights.push(dm);
    }
    let cumulative =
        cdf_with(weights.len(), |i| weights[i]).map_err(Error::numeric("SepAxGeometry"))?;
    Ok((cumulative, mass, line))
}

pub(crate) fn flattening(component: &'static str, q: f64) -> Result<()> {
    if q <= 0.0 || q > 1.0 {
        return Err(Error::ParameterOutOfRange {
            component,
            parameter: "q",
            value: q,
            lower: 0.0,
            upper: 1.0,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_mass(geometry: &SepAxGeometry, r_out: f64, z_out: f64) -> f64 {
        let (nr, nz) = (400, 400);
        let mut mass = 0.0;
        for i in 0..nr {
            let r = r_out * (i as f64 + 0.5) / nr as f64;
            for j in 0..nz {
                let z = -z_out + 2.0 * z_out * (j as f64 + 0.5) / nz as f64;
                mass += 2.0 * PI * r * geometry.density_rz(r, z);
            }
        }
        mass * (r_out / nr as f64) * (2.0 * z_out / nz as f64)
    }

    #[test]
    fn exp_disk_surface_densities() {
        // the face-on and edge-on columns of the double-exponential disk
        let geometry = SepAxGeometry::exp_disk(2.0, 0.5).unwrap();
        let rho0 = 1.0 / (4.0 * PI * 2.0 * 2.0 * 0.5);
        assert!((geometry.sigma_r() - rho0 * 2.0).abs() < 1e-12);
        assert!((geometry.sigma_z() - 2.0 * rho0 * 0.5).abs() < 1e-12);
        assert!((total_mass(&geometry, 40.0, 10.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn broken_exp_disk_is_normalised() {
        let geometry = SepAxGeometry::broken_exp_disk(1.0, 3.0, 0.2, 4.0, 2.0).unwrap();
        assert!((total_mass(&geometry, 40.0, 4.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn gaussian_matches_reference_columns() {
        let geometry = SepAxGeometry::gaussian(1.5, 0.6).unwrap();
        assert!((geometry.sigma_r() - 1.0 / (4.0 * PI * 0.6 * 2.25)).abs() < 1e-12);
        assert!((geometry.sigma_z() - 1.0 / (2.0 * PI * 2.25)).abs() < 1e-12);
    }

    #[test]
    fn ring_mass_is_normalised() {
        let geometry = SepAxGeometry::ring(5.0, 1.0, 0.3).unwrap();
        assert!((total_mass(&geometry, 20.0, 4.0) - 1.0).abs() < 1e-2);
    }

    #[test]
    fn sampled_radii_match_the_radial_mean() {
        // mean of R-weighted exponential: E[R] = 2 h_r
        let geometry = SepAxGeometry::exp_disk(2.0, 0.5).unwrap();
        let mut random = Random::default();
        let n = 40000;
        let mean: f64 =
            (0..n).map(|_| geometry.random_cyl_radius(&mut random)).sum::<f64>() / n as f64;
        assert!((mean - 4.0).abs() < 0.05, "mean radius {mean}");
    }
}
