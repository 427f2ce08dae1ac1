//! Schema-checked configuration records for dustrt simulations
//!
//! The configuration layer presents a simulation as a tree of plain
//! serde records. Every concrete component — geometry, mixture, size
//! distribution, grid, normalization — is named by a string tag that
//! selects a constructor, and every constructor consumes named, typed
//! fields. Records are range-checked before the setup pass runs, and
//! all failures name the offending component.
//!
//! ```rust
//! use dustrt_config::GeometryConfig;
//! use dustrt_numeric::Random;
//!
//! let record: GeometryConfig = serde_json::from_str(
//!     r#"{ "type": "plummer", "scale": 1.0 }"#,
//! ).unwrap();
//! let mut random = Random::default();
//! let geometry = record.build(&mut random).unwrap();
//! assert_eq!(geometry.dimension(), 1);
//! ```

// Modules
mod components;
mod error;
mod geometry;
mod simulation;

// Flatten
pub use components::{
    GrainPopulationConfig, MixtureConfig, NormalizationConfig, PopulationConfig,
    SizeDistributionConfig,
};
pub use error::{Error, Result};
pub use geometry::{GeometryConfig, MeshCellRecord, ParticleRecord, SiteRecord};
pub use simulation::{
    ComponentConfig, GridConfig, ObserverConfig, SimulationConfig, SourceConfig,
};
