//! General axisymmetric density profiles
//!
//! These geometries depend on the cylindrical radius and the height
//! without factorising, so their samplers invert the radial and polar
//! distributions jointly, with a rejection step where a cutoff applies.

use crate::error::{Error, Result};
use crate::sphe::positive;
use crate::special::{gexp, gln, gln2};
use dustrt_numeric::{Position, Random};
use log::warn;
use std::f64::consts::PI;

// bail out of rejection sampling after this many attempts
const MAX_REJECTION_TRIES: usize = 100_000;

/// The catalog of general axisymmetric geometries
#[derive(Debug, Clone, PartialEq)]
pub enum AxGeometry {
    /// A dusty torus `r^-p exp(-q |cos theta|)` inside an opening angle
    Torus {
        p: f64,
        q: f64,
        delta: f64,
        rmin: f64,
        rmax: f64,
        aniso_inner: bool,
        rcut: f64,
        sin_delta: f64,
        smin: f64,
        sdiff: f64,
        norm: f64,
    },
    /// A conical shell between an inner and an outer opening angle
    ConicalShell {
        p: f64,
        q: f64,
        delta_in: f64,
        delta_out: f64,
        rmin: f64,
        rmax: f64,
        aniso_inner: bool,
        rcut: f64,
        sin_delta_in: f64,
        sin_delta_out: f64,
        cos_delta: f64,
        smin: f64,
        sdiff: f64,
        norm: f64,
    },
}

impl AxGeometry {
    /// Initialise a torus with half-opening angle `delta` from the equator
    ///
    /// With `aniso_inner` set, the inner wall follows the Netzer
    /// illumination profile and is cut below `rcut`.
    pub fn torus(
        p: f64,
        q: f64,
        delta: f64,
        rmin: f64,
        rmax: f64,
        aniso_inner: bool,
        rcut: f64,
    ) -> Result<Self> {
        positive("Torus", "delta", delta)?;
        positive("Torus", "rmin", rmin)?;
        if rmax <= rmin {
            return Err(Error::InvalidConfiguration {
                component: "Torus",
                requirement: "an outer radius larger than the inner radius",
            });
        }
        if aniso_inner {
            positive("Torus", "rcut", rcut)?;
        }

        let sin_delta = delta.sin();
        let smin = gln(p - 2.0, rmin);
        let sdiff = gln2(p - 2.0, rmax, rmin);
        let norm = if q > 1e-3 {
            q * 0.25 / PI / sdiff / (1.0 - (-q * sin_delta).exp())
        } else {
            0.25 / PI / sdiff / sin_delta
        };

        Ok(Self::Torus {
            p,
            q,
            delta,
            rmin,
            rmax,
            aniso_inner,
            rcut,
            sin_delta,
            smin,
            sdiff,
            norm,
        })
    }

    /// Initialise a conical shell between two opening angles
    pub fn conical_shell(
        p: f64,
        q: f64,
        delta_in: f64,
        delta_out: f64,
        rmin: f64,
        rmax: f64,
        aniso_inner: bool,
        rcut: f64,
    ) -> Result<Self> {
        if delta_in < 0.0 || delta_out <= delta_in {
            return Err(Error::InvalidConfiguration {
                component: "ConicalShell",
                requirement: "opening angles with 0 <= delta_in < delta_out",
            });
        }
        positive("ConicalShell", "rmin", rmin)?;
        if rmax <= rmin {
            return Err(Error::InvalidConfiguration {
                component: "ConicalShell",
                requirement: "an outer radius larger than the inner radius",
            });
        }
        if aniso_inner {
            positive("ConicalShell", "rcut", rcut)?;
        }

        let sin_delta_in = delta_in.sin();
        let sin_delta_out = delta_out.sin();
        let cos_delta = ((delta_out + delta_in) / 2.0).cos();
        let smin = gln(p - 2.0, rmin);
        let sdiff = gln2(p - 2.0, rmax, rmin);
        let norm = if q > 1e-3 {
            q * 0.25 / PI / sdiff / ((-q * sin_delta_in).exp() - (-q * sin_delta_out).exp())
        } else {
            0.25 / PI / sdiff / (sin_delta_out - sin_delta_in)
        };

        Ok(Self::ConicalShell {
            p,
            q,
            delta_in,
            delta_out,
            rmin,
            rmax,
            aniso_inner,
            rcut,
            sin_delta_in,
            sin_delta_out,
            cos_delta,
            smin,
            sdiff,
            norm,
        })
    }

    /// The density at cylindrical coordinates `(R, z)`
    pub fn density_rz(&self, big_r: f64, z: f64) -> f64 {
        let r = big_r.hypot(z);
        if r == 0.0 {
            return 0.0;
        }
        let cos_theta = z / r;

        match self {
            Self::Torus {
                p,
                q,
                rmin,
                rmax,
                aniso_inner,
                rcut,
                sin_delta,
                norm,
                ..
            } => {
                if r >= *rmax || cos_theta.abs() >= *sin_delta {
                    return 0.0;
                }
                if *aniso_inner {
                    let ct = cos_theta.abs();
                    let rmin_aniso = rmin * (6.0 / 7.0 * ct * (2.0 * ct + 1.0)).sqrt();
                    if r <= rmin_aniso || r < *rcut {
                        return 0.0;
                    }
                } else if r <= *rmin {
                    return 0.0;
                }
                norm * r.powf(-p) * (-q * cos_theta.abs()).exp()
            }
            Self::ConicalShell {
                p,
                q,
                rmin,
                rmax,
                aniso_inner,
                rcut,
                sin_delta_in,
                sin_delta_out,
                norm,
                ..
            } => {
                if r >= *rmax {
                    return 0.0;
                }
                if *aniso_inner {
                    let ct = cos_theta.abs();
                    let rmin_aniso = rmin * (6.0 / 7.0 * ct * (2.0 * ct + 1.0)).sqrt();
                    if r <= rmin_aniso || r < *rcut {
                        return 0.0;
                    }
                } else if r <= *rmin {
                    return 0.0;
                }
                if cos_theta.abs() >= *sin_delta_out || cos_theta.abs() <= *sin_delta_in {
                    return 0.0;
                }
                norm * r.powf(-p) * (-q * cos_theta.abs()).exp()
            }
        }
    }

    /// Draw a position from the density by inversion plus rejection
    pub fn generate_position(&self, random: &mut Random) -> Position {
        let mut candidate = Position::origin();
        for _ in 0..MAX_REJECTION_TRIES {
            candidate = self.propose(random);
            if self.density_rz(candidate.cyl_radius(), candidate.height()) > 0.0 {
                return candidate;
            }
        }
        warn!("axisymmetric position sampler exhausted its rejection budget");
        candidate
    }

    // draw from the unconstrained radial and polar inversions
    fn propose(&self, random: &mut Random) -> Position {
        let (p, q, smin, sdiff) = match self {
            Self::Torus {
                p, q, smin, sdiff, ..
            }
            | Self::ConicalShell {
                p, q, smin, sdiff, ..
            } => (*p, *q, *smin, *sdiff),
        };

        let s = smin + random.uniform() * sdiff;
        let r = gexp(p - 2.0, s);

        let x = random.uniform();
        let cos_theta = match self {
            Self::Torus { sin_delta, .. } => {
                if q < 1e-3 {
                    (1.0 - 2.0 * x) * sin_delta
                } else {
                    let b = 1.0 - (-q * sin_delta).exp();
                    if x < 0.5 {
                        -(1.0 - b * (1.0 - 2.0 * x)).ln() / q
                    } else {
                        (1.0 - b * (2.0 * x - 1.0)).ln() / q
                    }
                }
            }
            Self::ConicalShell { sin_delta_out, .. } => {
                if q < 1e-3 {
                    (1.0 - 2.0 * x) * sin_delta_out
                } else {
                    let b = 1.0 - (-q * sin_delta_out).exp();
                    if x < 0.5 {
                        -(1.0 - b * (1.0 - 2.0 * x)).ln() / q
                    } else {
                        (1.0 - b * (2.0 * x - 1.0)).ln() / q
                    }
                }
            }
        };

        let theta = cos_theta.clamp(-1.0, 1.0).acos();
        let phi = 2.0 * PI * random.uniform();
        Position::from_spherical(r, theta, phi)
    }

    /// The radial surface density along the equatorial plane
    pub fn sigma_r(&self) -> f64 {
        match self {
            Self::Torus {
                p,
                rmin,
                rmax,
                norm,
                ..
            } => norm * gln2(*p, *rmax, *rmin),
            Self::ConicalShell {
                p,
                q,
                rmin,
                rmax,
                cos_delta,
                norm,
                ..
            } => norm * (-q * cos_delta).exp() * gln2(*p, *rmax, *rmin),
        }
    }

    /// The Z-axis surface density; zero, since the polar axis is empty
    pub fn sigma_z(&self) -> f64 {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_mass(geometry: &AxGeometry, r_out: f64) -> f64 {
        let (nr, nz) = (500, 500);
        let mut mass = 0.0;
        for i in 0..nr {
            let r = r_out * (i as f64 + 0.5) / nr as f64;
            for j in 0..nz {
                let z = -r_out + 2.0 * r_out * (j as f64 + 0.5) / nz as f64;
                mass += 2.0 * PI * r * geometry.density_rz(r, z);
            }
        }
        mass * (r_out / nr as f64) * (2.0 * r_out / nz as f64)
    }

    #[test]
    fn torus_mass_is_normalised() {
        let geometry = AxGeometry::torus(1.0, 2.0, 0.7, 0.5, 6.0, false, 0.0).unwrap();
        assert!((total_mass(&geometry, 6.0) - 1.0).abs() < 2e-2);
    }

    #[test]
    fn conical_shell_mass_is_normalised() {
        let geometry =
            AxGeometry::conical_shell(1.5, 1.0, 0.3, 1.0, 0.5, 8.0, false, 0.0).unwrap();
        assert!((total_mass(&geometry, 8.0) - 1.0).abs() < 2e-2);
    }

    #[test]
    fn samples_respect_the_support() {
        let geometry = AxGeometry::torus(1.0, 2.0, 0.7, 0.5, 6.0, false, 0.0).unwrap();
        let mut random = Random::default();
        for _ in 0..2000 {
            let position = geometry.generate_position(&mut random);
            assert!(
                geometry.density_rz(position.cyl_radius(), position.height()) > 0.0,
                "sampled position outside the torus support"
            );
        }
    }

    #[test]
    fn shell_opening_angles_bound_the_density() {
        let geometry =
            AxGeometry::conical_shell(1.5, 1.0, 0.3, 1.0, 0.5, 8.0, false, 0.0).unwrap();
        // on the polar axis and on the equator the shell is empty
        assert_eq!(geometry.density_rz(0.0, 3.0), 0.0);
        assert_eq!(geometry.density_rz(3.0, 0.2), 0.0);
    }
}
