//! Density-distribution geometries for Monte Carlo radiative transfer
//!
//! A [`Geometry`] describes the spatial distribution of dust or emitting
//! material, normalised to unit total mass. The catalog is organised in
//! capability tiers:
//!
//! - [`SpheGeometry`] — spherically symmetric profiles
//! - [`SepAxGeometry`] — separable axisymmetric profiles
//! - [`AxGeometry`] — general axisymmetric profiles
//! - [`GenGeometry`] — general three-dimensional fields
//! - [`PointGeometry`] — point-like and surface emitters with
//!   anisotropic emission patterns
//!
//! Decorators compose geometries into richer models: offsets, spheroidal
//! flattening, clumpy redistribution, spiral-arm perturbations, cavities,
//! crops and weighted combinations.
//!
//! ```rust
//! use dustrt_geometry::{Geometry, SpheGeometry};
//! use dustrt_numeric::{Position, Random};
//!
//! let geometry = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
//! let mut random = Random::default();
//!
//! // the density is highest at the centre and positions follow it
//! let rho0 = geometry.density(&Position::origin());
//! let sample = geometry.generate_position(&mut random);
//! assert!(geometry.density(&sample) <= rho0);
//! ```

// Modules
mod ax;
mod decorators;
mod error;
mod gen;
mod geometry;
mod kernel;
mod point;
mod sepax;
mod special;
mod sphe;

// Flatten
pub use ax::AxGeometry;
pub use decorators::{
    ClumpyDecorator, CombineDecorator, CylindricalCavityDecorator, OffsetDecorator,
    SphereCropDecorator, SphericalCavityDecorator, SpheroidalDecorator, SpiralArmDecorator,
};
pub use error::{Error, Result};
pub use gen::{GenGeometry, MeshCell, Particle, Site};
pub use geometry::Geometry;
pub use kernel::SmoothingKernel;
pub use point::{Anisotropy, PointGeometry};
pub use sepax::SepAxGeometry;
pub use special::{gamma, gexp, gln, gln2};
pub use sphe::SpheGeometry;
