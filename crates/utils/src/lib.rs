//! Small formatting helpers shared by the dustrt crates
//!
//! Optical properties span many orders of magnitude, so the `Display`
//! implementations of mixtures and grids lean on a common
//! scientific-notation helper instead of ad-hoc format strings. The
//! helpers are left public for convenience.

// Alias for the format! macro
pub use std::format as f;

// Modules
mod value_ext;

// Flatten
pub use value_ext::ValueExt;
