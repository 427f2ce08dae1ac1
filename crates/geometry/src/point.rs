//! Point-like and surface emitters
//!
//! These geometries describe sources rather than extended media: their
//! densities are delta-like (infinite on a point or surface, zero
//! elsewhere) and they carry an anisotropic emission distribution. The
//! directional probabilities are normalised so that an isotropic emitter
//! has probability one for every direction.

use crate::error::{Error, Result};
use crate::sphe::positive;
use dustrt_numeric::{cdf_with, Direction, Position, Random, Vec3};
use std::f64::consts::PI;

/// The anisotropic emission pattern carried along by photon packages
///
/// Only a few distinct anisotropy shapes exist, so the pattern is an
/// inline value rather than a reference into the geometry tree. Peel-off
/// photons evaluate the closed-form directional probability; the samplers
/// stay with the emitting geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Anisotropy {
    /// Uniform emission over the unit sphere
    Isotropic,
    /// The Netzer accretion-disk pattern `(6/7) cos t (2 cos t +- 1)`
    Netzer,
    /// Outward cosine law from a stellar surface of radius `rstar`
    StellarSurface { rstar: f64 },
    /// A delta distribution along the positive z-axis
    Laser,
    /// Inward cosine law from a background sphere of radius `rbg`
    InwardSphere { rbg: f64 },
    /// Inward cosine law from the faces of a cube with half-extent `h`
    InwardCube { h: f64 },
    /// Outward cosine law from a patch in the equatorial plane
    SolarPatch,
}

impl Anisotropy {
    /// The directional probability at the given position
    ///
    /// Normalised so that the average over the unit sphere is one.
    pub fn probability(&self, position: &Position, direction: &Direction) -> f64 {
        match self {
            Self::Isotropic => 1.0,
            Self::Netzer => {
                let ct = direction.z();
                let sign = if ct > 0.0 { 1.0 } else { -1.0 };
                6.0 / 7.0 * ct * (2.0 * ct + sign)
            }
            Self::StellarSurface { rstar } => {
                debug_assert!(
                    (position.radius() / rstar - 1.0).abs() < 1e-5,
                    "stellar-surface emission away from the surface"
                );
                let cos_out = direction.dot_position(position) / rstar;
                if cos_out >= 0.0 {
                    4.0 * cos_out
                } else {
                    0.0
                }
            }
            Self::Laser => {
                let (theta, _) = direction.spherical();
                if theta == 0.0 {
                    f64::INFINITY
                } else {
                    0.0
                }
            }
            Self::InwardSphere { rbg } => {
                debug_assert!(
                    (position.radius() / rbg - 1.0).abs() < 1e-5,
                    "background-sphere emission away from the sphere"
                );
                let cos_out = direction.dot_position(position) / rbg;
                if cos_out > 0.0 {
                    0.0
                } else {
                    -4.0 * cos_out
                }
            }
            Self::InwardCube { h } => match cube_face(position, *h) {
                Some(normal) => {
                    let cos_out = normal.dot(&direction.to_vec());
                    if cos_out > 0.0 {
                        0.0
                    } else {
                        -4.0 * cos_out
                    }
                }
                None => 0.0,
            },
            Self::SolarPatch => {
                let kz = direction.z();
                if kz > 0.0 {
                    4.0 * kz
                } else {
                    0.0
                }
            }
        }
    }
}

/// The catalog of point-like and surface emitters
#[derive(Debug, Clone, PartialEq)]
pub enum PointGeometry {
    /// Outward cosine-law emission from a sphere of radius `rstar`
    StellarSurface { rstar: f64 },
    /// A point source emitting along the positive z-axis only
    Laser,
    /// A point source with the Netzer accretion-disk pattern
    NetzerAccretionDisk {
        thetav: Vec<f64>,
        cumulative: Vec<f64>,
    },
    /// Inward cosine-law emission from a background sphere
    SphereBackground { rbg: f64 },
    /// Inward cosine-law emission from the faces of a background cube
    CubeBackground { h: f64 },
    /// Outward cosine-law emission from a disk in the equatorial plane
    SolarPatch { rmax: f64 },
}

impl PointGeometry {
    /// Initialise a stellar-surface emitter
    pub fn stellar_surface(rstar: f64) -> Result<Self> {
        positive("StellarSurface", "rstar", rstar)?;
        Ok(Self::StellarSurface { rstar })
    }

    /// Initialise a laser emitter
    pub fn laser() -> Self {
        Self::Laser
    }

    /// Initialise the Netzer accretion-disk emitter
    ///
    /// Tabulates the cumulative luminosity distribution of
    /// `L(theta) ~ cos theta (2 cos theta +- 1)` on 401 polar angles for
    /// inversion sampling.
    pub fn netzer_accretion_disk() -> Result<Self> {
        const N: usize = 401;
        let mut thetav = vec![0.0; N];
        let mut raw = vec![0.0; N];
        for i in 1..N - 1 {
            thetav[i] = PI * i as f64 / (N - 1) as f64;
            let ct = thetav[i].cos();
            let sign = if ct > 0.0 { 1.0 } else { -1.0 };
            raw[i] = 0.5 - 2.0 / 7.0 * ct.powi(3) - sign * 3.0 / 14.0 * ct * ct;
        }
        thetav[N - 1] = PI;
        raw[N - 1] = 1.0;

        // convert the cumulative values to per-bin weights for the cdf
        let cumulative = cdf_with(N - 1, |i| raw[i + 1] - raw[i])
            .map_err(Error::numeric("NetzerAccretionDisk"))?;
        Ok(Self::NetzerAccretionDisk { thetav, cumulative })
    }

    /// Initialise a background-sphere emitter
    pub fn sphere_background(rbg: f64) -> Result<Self> {
        positive("SphereBackground", "rbg", rbg)?;
        Ok(Self::SphereBackground { rbg })
    }

    /// Initialise a background-cube emitter with half-extent `h`
    pub fn cube_background(h: f64) -> Result<Self> {
        positive("CubeBackground", "h", h)?;
        Ok(Self::CubeBackground { h })
    }

    /// Initialise a solar-patch emitter with patch radius `rmax`
    pub fn solar_patch(rmax: f64) -> Result<Self> {
        positive("SolarPatch", "rmax", rmax)?;
        Ok(Self::SolarPatch { rmax })
    }

    /// The symmetry dimension of the emitter
    pub fn dimension(&self) -> u8 {
        match self {
            Self::SphereBackground { .. } => 1,
            Self::CubeBackground { .. } => 3,
            _ => 2,
        }
    }

    /// The delta-like density: infinite on the support, zero elsewhere
    pub fn density(&self, position: &Position) -> f64 {
        let on_support = match self {
            Self::StellarSurface { rstar } => position.radius() == *rstar,
            Self::Laser | Self::NetzerAccretionDisk { .. } => position.radius() == 0.0,
            Self::SphereBackground { rbg } => position.radius() == *rbg,
            Self::CubeBackground { h } => cube_face(position, *h).is_some(),
            Self::SolarPatch { rmax } => {
                position.height() == 0.0 && position.cyl_radius() <= *rmax
            }
        };
        if on_support {
            f64::INFINITY
        } else {
            0.0
        }
    }

    /// Draw an emission position on the support
    pub fn generate_position(&self, random: &mut Random) -> Position {
        match self {
            Self::StellarSurface { rstar } => {
                Position::from_radius_direction(*rstar, &random.direction())
            }
            Self::Laser | Self::NetzerAccretionDisk { .. } => Position::origin(),
            Self::SphereBackground { rbg } => {
                Position::from_radius_direction(*rbg, &random.direction())
            }
            Self::CubeBackground { h } => {
                let t1 = h * (2.0 * random.uniform() - 1.0);
                let t2 = h * (2.0 * random.uniform() - 1.0);
                let x = random.uniform();
                if x < 1.0 / 6.0 {
                    Position::new(-h, t1, t2)
                } else if x < 1.0 / 3.0 {
                    Position::new(*h, t1, t2)
                } else if x < 0.5 {
                    Position::new(t1, -h, t2)
                } else if x < 2.0 / 3.0 {
                    Position::new(t1, *h, t2)
                } else if x < 5.0 / 6.0 {
                    Position::new(t1, t2, -h)
                } else {
                    Position::new(t1, t2, *h)
                }
            }
            Self::SolarPatch { rmax } => {
                let r = rmax * random.uniform().sqrt();
                let phi = 2.0 * PI * random.uniform();
                Position::from_cylindrical(r, phi, 0.0)
            }
        }
    }

    /// The X-axis surface density
    pub fn sigma_x(&self) -> f64 {
        match self {
            Self::StellarSurface { rstar } => 1.0 / (2.0 * PI * rstar * rstar),
            Self::SphereBackground { rbg } => 1.0 / (2.0 * PI * rbg * rbg),
            Self::CubeBackground { h } => 1.0 / (12.0 * h * h),
            _ => f64::INFINITY,
        }
    }

    /// The Y-axis surface density
    pub fn sigma_y(&self) -> f64 {
        self.sigma_x()
    }

    /// The Z-axis surface density
    pub fn sigma_z(&self) -> f64 {
        match self {
            Self::SolarPatch { rmax } => 1.0 / (PI * rmax * rmax),
            _ => self.sigma_x(),
        }
    }

    /// The inline anisotropy value propagated to photon packages
    pub fn anisotropy(&self) -> Anisotropy {
        match self {
            Self::StellarSurface { rstar } => Anisotropy::StellarSurface { rstar: *rstar },
            Self::Laser => Anisotropy::Laser,
            Self::NetzerAccretionDisk { .. } => Anisotropy::Netzer,
            Self::SphereBackground { rbg } => Anisotropy::InwardSphere { rbg: *rbg },
            Self::CubeBackground { h } => Anisotropy::InwardCube { h: *h },
            Self::SolarPatch { .. } => Anisotropy::SolarPatch,
        }
    }

    /// The directional emission probability at a position
    ///
    /// Fails when queried away from the emitting support.
    pub fn direction_probability(
        &self,
        position: &Position,
        direction: &Direction,
    ) -> Result<f64> {
        self.check_support(position)?;
        Ok(self.anisotropy().probability(position, direction))
    }

    /// Draw an emission direction at a position on the support
    pub fn generate_direction(
        &self,
        random: &mut Random,
        position: &Position,
    ) -> Result<Direction> {
        self.check_support(position)?;
        Ok(match self {
            Self::StellarSurface { .. } => {
                // outward cosine law in the local surface frame
                let theta_p = random.uniform().sqrt().clamp(-1.0, 1.0).asin();
                let phi_p = 2.0 * PI * random.uniform();
                rotate_to_radial(position, theta_p, phi_p)
            }
            Self::Laser => Direction::z_axis(),
            Self::NetzerAccretionDisk { thetav, cumulative } => {
                let theta = random.cdf(thetav, cumulative);
                let phi = 2.0 * PI * random.uniform();
                Direction::from_spherical(theta, phi)
            }
            Self::SphereBackground { .. } => {
                let theta_p = PI - random.uniform().sqrt().clamp(-1.0, 1.0).acos();
                let phi_p = 2.0 * PI * random.uniform();
                rotate_to_radial(position, theta_p, phi_p)
            }
            Self::CubeBackground { h } => {
                // inward cosine law around the face normal
                let normal = cube_face(position, *h).expect("position checked on support");
                let inward = -normal;
                let ct = random.uniform().sqrt();
                let st = (1.0 - ct * ct).sqrt();
                let phi = 2.0 * PI * random.uniform();
                let (u, v) = orthonormal_basis(&inward);
                let k = st * phi.cos() * u + st * phi.sin() * v + ct * inward;
                Direction::new(k.x, k.y, k.z).expect("unit construction")
            }
            Self::SolarPatch { .. } => {
                let theta = random.uniform().sqrt().clamp(-1.0, 1.0).asin();
                let phi = 2.0 * PI * random.uniform();
                Direction::from_spherical(theta, phi)
            }
        })
    }

    // support membership with a small relative tolerance
    fn check_support(&self, position: &Position) -> Result<()> {
        let name = self.name();
        let ok = match self {
            Self::StellarSurface { rstar } => (position.radius() / rstar - 1.0).abs() < 1e-8,
            Self::Laser | Self::NetzerAccretionDisk { .. } => position.radius() == 0.0,
            Self::SphereBackground { rbg } => (position.radius() / rbg - 1.0).abs() < 1e-8,
            Self::CubeBackground { h } => cube_face(position, *h).is_some(),
            Self::SolarPatch { rmax } => {
                position.height().abs() < 1e-8 * rmax && position.cyl_radius() <= *rmax
            }
        };
        if ok {
            Ok(())
        } else {
            Err(Error::DirectionOffSupport(name))
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::StellarSurface { .. } => "StellarSurface",
            Self::Laser => "Laser",
            Self::NetzerAccretionDisk { .. } => "NetzerAccretionDisk",
            Self::SphereBackground { .. } => "SphereBackground",
            Self::CubeBackground { .. } => "CubeBackground",
            Self::SolarPatch { .. } => "SolarPatch",
        }
    }
}

// the outward normal of the cube face the position lies on, if any
fn cube_face(position: &Position, h: f64) -> Option<Vec3> {
    let eps = 1e-8 * h;
    let (x, y, z) = position.cartesian();
    let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
    if (ax - h).abs() < eps && ay <= h + eps && az <= h + eps {
        Some(Vec3::new(x.signum(), 0.0, 0.0))
    } else if (ay - h).abs() < eps && ax <= h + eps && az <= h + eps {
        Some(Vec3::new(0.0, y.signum(), 0.0))
    } else if (az - h).abs() < eps && ax <= h + eps && ay <= h + eps {
        Some(Vec3::new(0.0, 0.0, z.signum()))
    } else {
        None
    }
}

// rotate a direction given in the local frame (z' along the radial unit
// vector of the position) to the global frame
fn rotate_to_radial(position: &Position, theta_p: f64, phi_p: f64) -> Direction {
    let kp = Direction::from_spherical(theta_p, phi_p);
    let (kpx, kpy, kpz) = kp.cartesian();
    let (_, theta, phi) = position.spherical();
    let (ct, st) = (theta.cos(), theta.sin());
    let (cp, sp) = (phi.cos(), phi.sin());
    let kx = ct * cp * kpx - sp * kpy + st * cp * kpz;
    let ky = ct * sp * kpx + cp * kpy + st * sp * kpz;
    let kz = -st * kpx + ct * kpz;
    Direction::new(kx, ky, kz).expect("rotation preserves the norm")
}

// any orthonormal pair completing the given unit vector to a basis
fn orthonormal_basis(n: &Vec3) -> (Vec3, Vec3) {
    let helper = if n.x.abs() < 0.9 {
        Vec3::new(1.0, 0.0, 0.0)
    } else {
        Vec3::new(0.0, 1.0, 0.0)
    };
    let u = n.cross(&helper).normalize();
    let v = n.cross(&u);
    (u, v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netzer_probability_integrates_to_unity() {
        // the average of p over the sphere must be one
        let n = 20000;
        let mut sum = 0.0;
        for i in 0..n {
            let ct = -1.0 + 2.0 * (i as f64 + 0.5) / n as f64;
            let direction = Direction::from_spherical(ct.acos(), 0.0);
            sum += Anisotropy::Netzer.probability(&Position::origin(), &direction);
        }
        let average = sum / n as f64;
        assert!((average - 1.0).abs() < 1e-3, "average probability {average}");
    }

    #[test]
    fn stellar_surface_emits_outward() {
        let geometry = PointGeometry::stellar_surface(2.0).unwrap();
        let mut random = Random::default();
        for _ in 0..500 {
            let position = geometry.generate_position(&mut random);
            let direction = geometry.generate_direction(&mut random, &position).unwrap();
            assert!(direction.dot_position(&position) >= 0.0);
        }
    }

    #[test]
    fn sphere_background_emits_inward() {
        let geometry = PointGeometry::sphere_background(5.0).unwrap();
        let mut random = Random::default();
        for _ in 0..500 {
            let position = geometry.generate_position(&mut random);
            let direction = geometry.generate_direction(&mut random, &position).unwrap();
            assert!(direction.dot_position(&position) <= 0.0);
        }
    }

    #[test]
    fn direction_queries_off_support_fail() {
        let geometry = PointGeometry::stellar_surface(1.0).unwrap();
        let position = Position::new(0.3, 0.0, 0.0);
        assert!(geometry
            .direction_probability(&position, &Direction::z_axis())
            .is_err());
    }

    #[test]
    fn netzer_sampling_matches_the_pattern_median() {
        let geometry = PointGeometry::netzer_accretion_disk().unwrap();
        let mut random = Random::default();
        let n = 20000;
        let mut upper = 0;
        for _ in 0..n {
            let direction = geometry
                .generate_direction(&mut random, &Position::origin())
                .unwrap();
            if direction.z() > 0.0 {
                upper += 1;
            }
        }
        // the pattern is symmetric about the equator
        let fraction = upper as f64 / n as f64;
        assert!((fraction - 0.5).abs() < 0.02, "upper fraction {fraction}");
    }
}
