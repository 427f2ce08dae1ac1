//! Result and Error types for dustrt-numeric

/// Type alias for `Result<T, numeric::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-numeric` crate
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("grid range is invalid (min {min:?} must be below max {max:?})")]
    InvalidGridRange { min: f64, max: f64 },

    #[error("a logarithmic grid needs a positive lower bound, found {0}")]
    NonPositiveLogBound(f64),

    #[error("at least {minimum:?} grid points are required, found {found:?}")]
    TooFewGridPoints { minimum: usize, found: usize },

    #[error("a distribution must contain at least one value")]
    EmptyDistribution,

    #[error("a distribution must have a positive total weight")]
    ZeroWeightDistribution,

    #[error("a direction vector must have a nonzero norm")]
    ZeroDirection,
}
