//! Result and Error types for dustrt-transport

/// Type alias for `Result<T, transport::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-transport` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(
        "the {rule} normalization requires {requirement}, but the geometry has dimension {dimension}"
    )]
    IncompatibleNormalization {
        rule: &'static str,
        requirement: &'static str,
        dimension: u8,
    },

    #[error("the {rule} normalization needs a finite positive surface density, found {value}")]
    DegenerateSurfaceDensity { rule: &'static str, value: f64 },

    #[error("the parameter \"{parameter}\" of {component} must be positive, found {value}")]
    NonPositiveParameter {
        component: &'static str,
        parameter: &'static str,
        value: f64,
    },

    #[error("{component} requires {requirement}")]
    InvalidConfiguration {
        component: &'static str,
        requirement: &'static str,
    },

    #[error("a dust system needs at least one dust component")]
    NoComponents,

    #[error("dust error")]
    Dust(#[from] dustrt_dust::Error),

    #[error("geometry error")]
    Geometry(#[from] dustrt_geometry::Error),

    #[error("grid error")]
    Grid(#[from] dustrt_grid::Error),
}
