//! Photon transport orchestration for the dustrt radiative transfer core
//!
//! Binds the geometry, dust and grid crates together: [`DustComp`]
//! applies a [`Normalization`] rule to a unit-mass geometry,
//! [`DustSystem`] freezes the per-cell densities and owns the absorbed
//! energy accumulators, [`PhotonPackage`] is the traced state,
//! [`Observer`] collects peel-off images and SEDs, and [`PhotonEngine`]
//! runs the stellar- and thermal-emission Monte Carlo phases on a rayon
//! worker pool with reproducible per-bundle random streams.

// Modules
mod engine;
mod error;
mod observer;
mod photon;
mod system;

// Flatten
pub use engine::{EngineSettings, PhotonEngine, StellarSource};
pub use error::{Error, Result};
pub use observer::Observer;
pub use photon::{PhotonPackage, StokesVector};
pub use system::{DustComp, DustSystem, Normalization};
