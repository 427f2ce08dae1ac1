//! Result and Error types for dustrt-grid

/// Type alias for `Result<T, grid::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-grid` crate
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("the {axis} mesh of {component} needs at least {minimum} border values, found {found}")]
    TooFewBorders {
        component: &'static str,
        axis: &'static str,
        minimum: usize,
        found: usize,
    },

    #[error("the {axis} mesh of {component} must be sorted in strictly ascending order")]
    UnsortedBorders {
        component: &'static str,
        axis: &'static str,
    },

    #[error("the {axis} mesh of {component} must lie within {requirement}")]
    BordersOutOfRange {
        component: &'static str,
        axis: &'static str,
        requirement: &'static str,
    },

    #[error(
        "the volume filling factor of the high-density phase must lie strictly between 0 and 1, \
         found {0}"
    )]
    InvalidFillingFactor(f64),

    #[error("the density contrast between the phases must be positive, found {0}")]
    InvalidContrast(f64),

    #[error("cell index {index} is out of range for a grid with {count} cells")]
    CellOutOfRange { index: usize, count: usize },
}
