//! Value types for points, unit vectors and axis-aligned boxes
//!
//! A [`Position`] is a point in space, a [`Direction`] is a unit vector,
//! and a [`Box3`] is an axis-aligned cuboid. All three convert between
//! Cartesian, cylindrical and spherical coordinates and never alias shared
//! storage.

use crate::error::{Error, Result};
use std::ops::{Add, Sub};

/// The underlying three-vector storage
pub type Vec3 = nalgebra::Vector3<f64>;

/// A point in three-dimensional space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position(Vec3);

impl Position {
    /// Initialise from Cartesian coordinates
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vec3::new(x, y, z))
    }

    /// The origin of the coordinate system
    pub fn origin() -> Self {
        Self(Vec3::zeros())
    }

    /// Initialise from cylindrical coordinates `(R, phi, z)`
    pub fn from_cylindrical(radius: f64, phi: f64, z: f64) -> Self {
        Self::new(radius * phi.cos(), radius * phi.sin(), z)
    }

    /// Initialise from spherical coordinates `(r, theta, phi)`
    pub fn from_spherical(r: f64, theta: f64, phi: f64) -> Self {
        let (st, ct) = (theta.sin(), theta.cos());
        Self::new(r * st * phi.cos(), r * st * phi.sin(), r * ct)
    }

    /// Initialise at distance `r` from the origin along a direction
    pub fn from_radius_direction(r: f64, direction: &Direction) -> Self {
        Self(r * direction.0)
    }

    /// x-coordinate
    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    /// y-coordinate
    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    /// z-coordinate
    #[inline]
    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Cartesian coordinates as a tuple
    pub fn cartesian(&self) -> (f64, f64, f64) {
        (self.0.x, self.0.y, self.0.z)
    }

    /// Distance from the origin
    pub fn radius(&self) -> f64 {
        self.0.norm()
    }

    /// Squared distance from the origin
    pub fn radius2(&self) -> f64 {
        self.0.norm_squared()
    }

    /// Distance from the z-axis
    pub fn cyl_radius(&self) -> f64 {
        self.0.x.hypot(self.0.y)
    }

    /// Height above the equatorial plane (the z-coordinate)
    pub fn height(&self) -> f64 {
        self.0.z
    }

    /// Cylindrical coordinates as `(R, phi, z)`
    pub fn cylindrical(&self) -> (f64, f64, f64) {
        (self.cyl_radius(), self.0.y.atan2(self.0.x), self.0.z)
    }

    /// Spherical coordinates as `(r, theta, phi)`
    ///
    /// The polar angle of the origin is defined to be zero.
    pub fn spherical(&self) -> (f64, f64, f64) {
        let r = self.radius();
        let theta = if r > 0.0 { (self.0.z / r).acos() } else { 0.0 };
        (r, theta, self.0.y.atan2(self.0.x))
    }

    /// The point reached by moving a distance `s` along `direction`
    pub fn shifted(&self, direction: &Direction, s: f64) -> Self {
        Self(self.0 + s * direction.0)
    }

    /// The underlying vector
    pub fn to_vec(self) -> Vec3 {
        self.0
    }

    /// Wrap a raw vector as a position
    pub fn from_vec(v: Vec3) -> Self {
        Self(v)
    }
}

impl Sub for Position {
    type Output = Vec3;

    fn sub(self, rhs: Self) -> Vec3 {
        self.0 - rhs.0
    }
}

impl Add<Vec3> for Position {
    type Output = Position;

    fn add(self, rhs: Vec3) -> Position {
        Position(self.0 + rhs)
    }
}

/// A unit vector in three-dimensional space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Direction(Vec3);

impl Direction {
    /// Initialise from Cartesian components, normalising to unit length
    ///
    /// Fails when the components have zero norm.
    pub fn new(x: f64, y: f64, z: f64) -> Result<Self> {
        let v = Vec3::new(x, y, z);
        let norm = v.norm();
        if norm == 0.0 {
            return Err(Error::ZeroDirection);
        }
        Ok(Self(v / norm))
    }

    /// Initialise from spherical angles `(theta, phi)`
    pub fn from_spherical(theta: f64, phi: f64) -> Self {
        let (st, ct) = (theta.sin(), theta.cos());
        Self(Vec3::new(st * phi.cos(), st * phi.sin(), ct))
    }

    /// The positive z-axis
    pub fn z_axis() -> Self {
        Self(Vec3::new(0.0, 0.0, 1.0))
    }

    /// x-component
    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    /// y-component
    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    /// z-component
    #[inline]
    pub fn z(&self) -> f64 {
        self.0.z
    }

    /// Cartesian components as a tuple
    pub fn cartesian(&self) -> (f64, f64, f64) {
        (self.0.x, self.0.y, self.0.z)
    }

    /// Spherical angles as `(theta, phi)`
    pub fn spherical(&self) -> (f64, f64) {
        (self.0.z.clamp(-1.0, 1.0).acos(), self.0.y.atan2(self.0.x))
    }

    /// The opposite direction
    pub fn reversed(&self) -> Self {
        Self(-self.0)
    }

    /// Scalar product with another direction
    pub fn dot(&self, other: &Direction) -> f64 {
        self.0.dot(&other.0)
    }

    /// Scalar product with the vector pointing to a position
    pub fn dot_position(&self, position: &Position) -> f64 {
        self.0.dot(&position.0)
    }

    /// The underlying unit vector
    pub fn to_vec(self) -> Vec3 {
        self.0
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::z_axis()
    }
}

/// An axis-aligned cuboid
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Box3 {
    xmin: f64,
    ymin: f64,
    zmin: f64,
    xmax: f64,
    ymax: f64,
    zmax: f64,
}

impl Box3 {
    /// Initialise from the extreme coordinates along each axis
    pub fn new(xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            xmin,
            ymin,
            zmin,
            xmax,
            ymax,
            zmax,
        }
    }

    /// A cube centred on the origin with the given half-extent
    pub fn cube(half_extent: f64) -> Self {
        Self::new(
            -half_extent,
            -half_extent,
            -half_extent,
            half_extent,
            half_extent,
            half_extent,
        )
    }

    /// Lower x border
    pub fn xmin(&self) -> f64 {
        self.xmin
    }

    /// Lower y border
    pub fn ymin(&self) -> f64 {
        self.ymin
    }

    /// Lower z border
    pub fn zmin(&self) -> f64 {
        self.zmin
    }

    /// Upper x border
    pub fn xmax(&self) -> f64 {
        self.xmax
    }

    /// Upper y border
    pub fn ymax(&self) -> f64 {
        self.ymax
    }

    /// Upper z border
    pub fn zmax(&self) -> f64 {
        self.zmax
    }

    /// Edge lengths as `(dx, dy, dz)`
    pub fn widths(&self) -> (f64, f64, f64) {
        (
            self.xmax - self.xmin,
            self.ymax - self.ymin,
            self.zmax - self.zmin,
        )
    }

    /// Volume of the cuboid
    pub fn volume(&self) -> f64 {
        let (dx, dy, dz) = self.widths();
        dx * dy * dz
    }

    /// Geometric centre
    pub fn center(&self) -> Position {
        Position::new(
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
            0.5 * (self.zmin + self.zmax),
        )
    }

    /// True when the position lies inside or on the border
    pub fn contains(&self, position: &Position) -> bool {
        let (x, y, z) = position.cartesian();
        x >= self.xmin
            && x <= self.xmax
            && y >= self.ymin
            && y <= self.ymax
            && z >= self.zmin
            && z <= self.zmax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_round_trips() {
        let p = Position::new(1.0, -2.0, 0.5);
        let (r, theta, phi) = p.spherical();
        let q = Position::from_spherical(r, theta, phi);
        assert!((p - q).norm() < 1e-12);

        let (cr, cphi, cz) = p.cylindrical();
        let q = Position::from_cylindrical(cr, cphi, cz);
        assert!((p - q).norm() < 1e-12);
    }

    #[test]
    fn directions_are_unit_vectors() {
        let k = Direction::new(3.0, 4.0, 0.0).unwrap();
        assert!((k.x() - 0.6).abs() < 1e-12);
        assert!((k.y() - 0.8).abs() < 1e-12);
        assert!(Direction::new(0.0, 0.0, 0.0).is_err());
    }

    #[test]
    fn box_volume_and_containment() {
        let b = Box3::new(-1.0, 0.0, 0.0, 1.0, 2.0, 3.0);
        assert_eq!(b.volume(), 12.0);
        assert!(b.contains(&Position::new(0.0, 1.0, 1.5)));
        assert!(!b.contains(&Position::new(0.0, 2.5, 1.5)));
    }
}
