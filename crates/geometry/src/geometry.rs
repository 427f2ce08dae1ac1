//! The polymorphic density-distribution model
//!
//! [`Geometry`] is the closed set of density fields the engine can work
//! with: the capability-tiered catalogs (spherical, separable
//! axisymmetric, general axisymmetric, general 3-D, point-like emitters)
//! plus the decorators, each owning a boxed inner geometry.
//!
//! Every geometry integrates to unit mass over all space and is
//! responsible for its own normalization. The broad operations below are
//! defined in terms of the narrower tier-specific ones.

use crate::ax::AxGeometry;
use crate::decorators::{
    segment_integral, ClumpyDecorator, CombineDecorator, CylindricalCavityDecorator,
    OffsetDecorator, SphereCropDecorator, SphericalCavityDecorator, SpheroidalDecorator,
    SpiralArmDecorator,
};
use crate::error::Result;
use crate::gen::GenGeometry;
use crate::point::{Anisotropy, PointGeometry};
use crate::sepax::SepAxGeometry;
use crate::sphe::SpheGeometry;
use dustrt_numeric::{Direction, Position, Random};

/// A density distribution composed from the catalog and its decorators
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// A spherically symmetric profile
    Sphe(SpheGeometry),
    /// A separable axisymmetric profile
    SepAx(SepAxGeometry),
    /// A general axisymmetric profile
    Ax(AxGeometry),
    /// A general three-dimensional field
    Gen(GenGeometry),
    /// A point-like or surface emitter
    Point(PointGeometry),
    /// The inner geometry shifted by a fixed offset
    Offset(OffsetDecorator),
    /// A flattened spherical inner geometry
    Spheroidal(SpheroidalDecorator),
    /// Part of the inner mass redistributed into clumps
    Clumpy(ClumpyDecorator),
    /// A spiral-arm perturbation on an axisymmetric inner geometry
    SpiralArm(SpiralArmDecorator),
    /// An axial cylindrical cavity carved out of the inner geometry
    CylindricalCavity(CylindricalCavityDecorator),
    /// A spherical cavity carved out of the inner geometry
    SphericalCavity(SphericalCavityDecorator),
    /// The inner geometry cropped to a sphere
    SphereCrop(SphereCropDecorator),
    /// A weighted combination of two geometries
    Combine(CombineDecorator),
}

impl Geometry {
    /// The symmetry dimension: 1 spherical, 2 axial, 3 none
    pub fn dimension(&self) -> u8 {
        match self {
            Self::Sphe(_) => 1,
            Self::SepAx(_) | Self::Ax(_) | Self::Spheroidal(_) => 2,
            Self::Gen(_) | Self::Clumpy(_) | Self::SpiralArm(_) => 3,
            Self::Point(g) => g.dimension(),
            Self::Offset(d) => d.dimension(),
            Self::CylindricalCavity(d) => d.inner.dimension().max(2),
            Self::SphericalCavity(d) => d.inner.dimension().max(center_dimension(&d.center)),
            Self::SphereCrop(d) => d.inner.dimension().max(center_dimension(&d.center)),
            Self::Combine(d) => d.first.dimension().max(d.second.dimension()),
        }
    }

    /// The density at a position; zero outside the domain
    pub fn density(&self, position: &Position) -> f64 {
        match self {
            Self::Sphe(g) => g.density_r(position.radius()),
            Self::SepAx(g) => g.density_rz(position.cyl_radius(), position.height()),
            Self::Ax(g) => g.density_rz(position.cyl_radius(), position.height()),
            Self::Gen(g) => g.density(position),
            Self::Point(g) => g.density(position),
            Self::Offset(d) => d.density(position),
            Self::Spheroidal(d) => d.density_rz(position.cyl_radius(), position.height()),
            Self::Clumpy(d) => d.density(position),
            Self::SpiralArm(d) => d.density(position),
            Self::CylindricalCavity(d) => d.density(position),
            Self::SphericalCavity(d) => d.density(position),
            Self::SphereCrop(d) => d.density(position),
            Self::Combine(d) => d.density(position),
        }
    }

    /// Draw a position from the density distribution
    pub fn generate_position(&self, random: &mut Random) -> Position {
        match self {
            Self::Sphe(g) => {
                let radius = g.sample_radius(random);
                Position::from_radius_direction(radius, &random.direction())
            }
            Self::SepAx(g) => {
                let big_r = g.random_cyl_radius(random);
                let phi = 2.0 * std::f64::consts::PI * random.uniform();
                let z = g.random_height(random);
                Position::from_cylindrical(big_r, phi, z)
            }
            Self::Ax(g) => g.generate_position(random),
            Self::Gen(g) => g.generate_position(random),
            Self::Point(g) => g.generate_position(random),
            Self::Offset(d) => d.generate_position(random),
            Self::Spheroidal(d) => d.generate_position(random),
            Self::Clumpy(d) => d.generate_position(random),
            Self::SpiralArm(d) => d.generate_position(random),
            Self::CylindricalCavity(d) => d.generate_position(random),
            Self::SphericalCavity(d) => d.generate_position(random),
            Self::SphereCrop(d) => d.generate_position(random),
            Self::Combine(d) => d.generate_position(random),
        }
    }

    /// The X-axis surface density
    pub fn sigma_x(&self) -> f64 {
        match self {
            Self::Sphe(g) => 2.0 * g.sigma_r(),
            Self::SepAx(g) => 2.0 * g.sigma_r(),
            Self::Ax(g) => 2.0 * g.sigma_r(),
            Self::Gen(g) => g.sigma_x(),
            Self::Point(g) => g.sigma_x(),
            Self::Offset(d) => d.inner.sigma_x(),
            Self::Spheroidal(d) => 2.0 * d.sigma_r(),
            Self::Clumpy(d) => d.inner.sigma_x(),
            Self::SpiralArm(d) => d.inner.sigma_x(),
            Self::CylindricalCavity(d) => {
                let correction = segment_integral(
                    |x| d.inner.density(&Position::new(x, 0.0, 0.0)),
                    -d.radius,
                    d.radius,
                );
                d.norm * (d.inner.sigma_x() - correction).max(0.0)
            }
            Self::SphericalCavity(d) => {
                cavity_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::X)
            }
            Self::SphereCrop(d) => crop_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::X),
            Self::Combine(d) => d.w1 * d.first.sigma_x() + d.w2 * d.second.sigma_x(),
        }
    }

    /// The Y-axis surface density
    pub fn sigma_y(&self) -> f64 {
        match self {
            Self::Sphe(g) => 2.0 * g.sigma_r(),
            Self::SepAx(g) => 2.0 * g.sigma_r(),
            Self::Ax(g) => 2.0 * g.sigma_r(),
            Self::Gen(g) => g.sigma_y(),
            Self::Point(g) => g.sigma_y(),
            Self::Offset(d) => d.inner.sigma_y(),
            Self::Spheroidal(d) => 2.0 * d.sigma_r(),
            Self::Clumpy(d) => d.inner.sigma_y(),
            Self::SpiralArm(d) => d.inner.sigma_y(),
            Self::CylindricalCavity(d) => {
                let correction = segment_integral(
                    |y| d.inner.density(&Position::new(0.0, y, 0.0)),
                    -d.radius,
                    d.radius,
                );
                d.norm * (d.inner.sigma_y() - correction).max(0.0)
            }
            Self::SphericalCavity(d) => {
                cavity_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::Y)
            }
            Self::SphereCrop(d) => crop_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::Y),
            Self::Combine(d) => d.w1 * d.first.sigma_y() + d.w2 * d.second.sigma_y(),
        }
    }

    /// The Z-axis surface density
    pub fn sigma_z(&self) -> f64 {
        match self {
            Self::Sphe(g) => 2.0 * g.sigma_r(),
            Self::SepAx(g) => g.sigma_z(),
            Self::Ax(g) => g.sigma_z(),
            Self::Gen(g) => g.sigma_z(),
            Self::Point(g) => g.sigma_z(),
            Self::Offset(d) => d.inner.sigma_z(),
            Self::Spheroidal(d) => d.sigma_z(),
            Self::Clumpy(d) => d.inner.sigma_z(),
            Self::SpiralArm(d) => d.inner.sigma_z(),
            // the whole z-axis lies inside an axial cylindrical cavity
            Self::CylindricalCavity(_) => 0.0,
            Self::SphericalCavity(d) => {
                cavity_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::Z)
            }
            Self::SphereCrop(d) => crop_sigma(&d.inner, &d.center, d.radius, d.norm, Axis::Z),
            Self::Combine(d) => d.w1 * d.first.sigma_z() + d.w2 * d.second.sigma_z(),
        }
    }

    /// The radial surface density, defined for spherically symmetric
    /// geometries as `int_0^inf rho(r) dr`
    pub fn sigma_r(&self) -> Option<f64> {
        match self {
            Self::Sphe(g) => Some(g.sigma_r()),
            _ => None,
        }
    }

    /// The cylindrical-radius surface density for axisymmetric geometries
    pub fn sigma_cyl_r(&self) -> Option<f64> {
        match self {
            Self::Sphe(g) => Some(g.sigma_r()),
            Self::SepAx(g) => Some(g.sigma_r()),
            Self::Ax(g) => Some(g.sigma_r()),
            Self::Spheroidal(d) => Some(d.sigma_r()),
            _ => None,
        }
    }

    /// The emission anisotropy propagated onto photon packages
    pub fn anisotropy(&self) -> Anisotropy {
        match self {
            Self::Point(g) => g.anisotropy(),
            _ => Anisotropy::Isotropic,
        }
    }

    /// The directional emission probability at a position
    ///
    /// Isotropic geometries return one for every direction.
    pub fn direction_probability(
        &self,
        position: &Position,
        direction: &Direction,
    ) -> Result<f64> {
        match self {
            Self::Point(g) => g.direction_probability(position, direction),
            Self::Combine(d) => Ok(d.w1
                * d.first.direction_probability(position, direction)?
                + d.w2 * d.second.direction_probability(position, direction)?),
            Self::Offset(d) => d.inner.direction_probability(position, direction),
            _ => Ok(1.0),
        }
    }

    /// Draw an emission direction at a position
    ///
    /// Isotropic geometries draw uniformly from the unit sphere.
    pub fn generate_direction(
        &self,
        random: &mut Random,
        position: &Position,
    ) -> Result<Direction> {
        match self {
            Self::Point(g) => g.generate_direction(random, position),
            Self::Combine(d) => {
                if random.uniform() < d.w1 {
                    d.first.generate_direction(random, position)
                } else {
                    d.second.generate_direction(random, position)
                }
            }
            Self::Offset(d) => d.inner.generate_direction(random, position),
            _ => Ok(random.direction()),
        }
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

fn axis_position(axis: Axis, t: f64) -> Position {
    match axis {
        Axis::X => Position::new(t, 0.0, 0.0),
        Axis::Y => Position::new(0.0, t, 0.0),
        Axis::Z => Position::new(0.0, 0.0, t),
    }
}

// the chord the coordinate axis cuts through a sphere, if any
fn axis_chord(center: &Position, radius: f64, axis: Axis) -> Option<(f64, f64)> {
    let (cx, cy, cz) = center.cartesian();
    let (along, d2) = match axis {
        Axis::X => (cx, cy * cy + cz * cz),
        Axis::Y => (cy, cx * cx + cz * cz),
        Axis::Z => (cz, cx * cx + cy * cy),
    };
    let half2 = radius * radius - d2;
    if half2 <= 0.0 {
        return None;
    }
    let half = half2.sqrt();
    Some((along - half, along + half))
}

fn cavity_sigma(inner: &Geometry, center: &Position, radius: f64, norm: f64, axis: Axis) -> f64 {
    let base = match axis {
        Axis::X => inner.sigma_x(),
        Axis::Y => inner.sigma_y(),
        Axis::Z => inner.sigma_z(),
    };
    let correction = match axis_chord(center, radius, axis) {
        Some((a, b)) => segment_integral(|t| inner.density(&axis_position(axis, t)), a, b),
        None => 0.0,
    };
    norm * (base - correction).max(0.0)
}

fn crop_sigma(inner: &Geometry, center: &Position, radius: f64, norm: f64, axis: Axis) -> f64 {
    match axis_chord(center, radius, axis) {
        Some((a, b)) => {
            norm * segment_integral(|t| inner.density(&axis_position(axis, t)), a, b)
        }
        None => 0.0,
    }
}

fn center_dimension(center: &Position) -> u8 {
    if center.x() != 0.0 || center.y() != 0.0 {
        3
    } else if center.z() != 0.0 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::SmoothingKernel;

    #[test]
    fn plummer_through_the_broad_interface() {
        let geometry = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        assert_eq!(geometry.dimension(), 1);
        // the axis column is twice the radial surface density 1/(2 pi c^2)
        let sigma = 1.0 / std::f64::consts::PI;
        assert!((geometry.sigma_x() - sigma).abs() < 1e-12);
        assert!((geometry.sigma_z() - sigma).abs() < 1e-12);
    }

    #[test]
    fn combine_weights_are_renormalised() {
        let a = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let b = Geometry::Sphe(SpheGeometry::plummer(2.0).unwrap());
        let combined = Geometry::Combine(CombineDecorator::new(a.clone(), 2.0, b, 6.0).unwrap());
        let origin = Position::origin();
        let expected = 0.25 * a.density(&origin)
            + 0.75 * Geometry::Sphe(SpheGeometry::plummer(2.0).unwrap()).density(&origin);
        assert!((combined.density(&origin) - expected).abs() < 1e-12);
    }

    #[test]
    fn spherical_cavity_removes_central_mass() {
        let mut random = Random::default();
        let inner = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let decorated = Geometry::SphericalCavity(
            SphericalCavityDecorator::new(inner, Position::origin(), 0.5, &mut random).unwrap(),
        );
        assert_eq!(decorated.density(&Position::new(0.2, 0.0, 0.0)), 0.0);
        assert!(decorated.density(&Position::new(0.8, 0.0, 0.0)) > 0.0);
        // samples avoid the cavity
        for _ in 0..500 {
            let position = decorated.generate_position(&mut random);
            assert!(position.radius() > 0.5);
        }
    }

    #[test]
    fn clumpy_decorator_preserves_mass_split() {
        let mut random = Random::default();
        let inner = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let decorated = Geometry::Clumpy(
            ClumpyDecorator::new(
                inner,
                0.4,
                50,
                0.2,
                false,
                SmoothingKernel::cubic_spline(),
                &mut random,
            )
            .unwrap(),
        );
        assert_eq!(decorated.dimension(), 3);
        // density stays finite and nonnegative around the clumps
        for _ in 0..200 {
            let position = decorated.generate_position(&mut random);
            assert!(decorated.density(&position).is_finite());
        }
    }

    #[test]
    fn offset_moves_the_distribution() {
        let inner = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let peak = inner.density(&Position::origin());
        let shifted = Geometry::Offset(OffsetDecorator::new(inner, 0.0, 0.0, 3.0));
        assert_eq!(shifted.dimension(), 2);
        assert!((shifted.density(&Position::new(0.0, 0.0, 3.0)) - peak).abs() < 1e-12);
    }
}
