//! Spatial dust grids and ray traversal for Monte Carlo transport
//!
//! A [`DustGrid`] partitions a bounded region of space into numbered
//! cells, maps positions to cell indices, knows cell volumes and random
//! in-cell positions, and — critically for the photon loop — computes
//! the ordered list of `(cell, path length)` segments produced by the
//! intersection of an arbitrary ray with the cell borders.
//!
//! Concrete grids: 3-D Cartesian with arbitrary meshes, 2-D cylindrical,
//! 2-D spherical, 1-D spherical shells, and a two-phase decorator that
//! adds per-cell density-contrast weights to a Cartesian grid.
//!
//! ```rust
//! use dustrt_grid::{CartesianGrid, DustGrid};
//! use dustrt_numeric::{Direction, Position};
//!
//! let grid = DustGrid::Cartesian(CartesianGrid::new(
//!     vec![-1.0, 0.0, 1.0],
//!     vec![-1.0, 0.0, 1.0],
//!     vec![-1.0, 0.0, 1.0],
//! ).unwrap());
//!
//! let path = grid.path(
//!     &Position::new(-2.0, 0.5, 0.5),
//!     &Direction::new(1.0, 0.0, 0.0).unwrap(),
//! );
//! // one untagged entry segment plus two unit cell crossings
//! assert_eq!(path.segments().len(), 3);
//! assert!((path.tagged_length() - 2.0).abs() < 1e-7);
//! ```

// Modules
mod cartesian;
mod cylinder;
mod error;
mod grid;
mod path;
mod sphere1d;
mod sphere2d;
mod twophase;

// Flatten
pub use cartesian::CartesianGrid;
pub use cylinder::CylinderGrid;
pub use error::{Error, Result};
pub use grid::DustGrid;
pub use path::{GridPath, Segment};
pub use sphere1d::Sphere1DGrid;
pub use sphere2d::Sphere2DGrid;
pub use twophase::TwoPhaseGrid;
