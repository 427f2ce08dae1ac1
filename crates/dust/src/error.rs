//! Result and Error types for dustrt-dust

/// Type alias for `Result<T, dust::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-dust` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("a wavelength grid must contain at least one wavelength")]
    EmptyWavelengthGrid,

    #[error("all wavelengths must be positive, found {0}")]
    NonPositiveWavelength(f64),

    #[error("wavelengths must be sorted in strictly ascending order")]
    UnsortedWavelengths,

    #[error("resource \"{resource}\" is malformed: {reason}")]
    MalformedResource { resource: String, reason: String },

    #[error(
        "the wavelength grid of \"{resource}\" ({found_min:.3e}..{found_max:.3e} m) does not \
         cover the simulation range ({needed_min:.3e}..{needed_max:.3e} m)"
    )]
    WavelengthCoverage {
        resource: String,
        found_min: f64,
        found_max: f64,
        needed_min: f64,
        needed_max: f64,
    },

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

    #[error("a dust mix needs at least one population")]
    NoPopulations,

    #[error("population index {index} is out of range for a mix with {count} populations")]
    PopulationOutOfRange { index: usize, count: usize },

    #[error("the dust mix carries no polarization tables")]
    NoPolarization,

    #[error("numerical setup failed for {component}")]
    Numeric {
        component: &'static str,
        #[source]
        source: dustrt_numeric::Error,
    },
}

impl Error {
    pub(crate) fn numeric(component: &'static str) -> impl Fn(dustrt_numeric::Error) -> Error {
        move |source| Error::Numeric { component, source }
    }

    pub(crate) fn malformed(resource: &str, reason: impl Into<String>) -> Error {
        Error::MalformedResource {
            resource: resource.to_string(),
            reason: reason.into(),
        }
    }
}
