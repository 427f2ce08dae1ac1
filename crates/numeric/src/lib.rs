//! Numerical primitives shared by the dustrt crates
//!
//! This crate collects the low-level machinery that the rest of the engine
//! is built on:
//!
//! - ordered-border binary searches with three boundary policies
//!   ([`locate`], [`locate_clip`], [`locate_fail`])
//! - grid constructors ([`lin_grid`], [`log_grid`], [`pow_grid`])
//! - interpolation and resampling in linear and logarithmic flavours
//! - cumulative-distribution construction and inversion
//! - dense row-major tables ([`Table2`], [`Table3`])
//! - the reproducible, worker-partitioned random source ([`Random`])
//! - the [`Position`], [`Direction`] and [`Box3`] value types
//!
//! All quantities are in SI base units unless a function documents
//! otherwise.

// Modules
mod cdf;
mod error;
mod grid;
mod interpolate;
mod random;
mod search;
mod table;
mod vector;

// Flatten
pub use cdf::{cdf, cdf_with, sample_cdf};
pub use error::{Error, Result};
pub use grid::{lin_grid, log_grid, pow_grid};
pub use interpolate::{
    interpolate_lin_lin, interpolate_log_lin, interpolate_log_log, resample,
};
pub use random::{Random, DEFAULT_SEED};
pub use search::{locate, locate_clip, locate_fail};
pub use table::{Table2, Table3};
pub use vector::{Box3, Direction, Position, Vec3};
