//! Result and Error types for dustrt-geometry

/// Type alias for `Result<T, geometry::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-geometry` crate
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("the parameter \"{parameter}\" of {component} must be positive, found {value}")]
    NonPositiveParameter {
        component: &'static str,
        parameter: &'static str,
        value: f64,
    },

    #[error("the parameter \"{parameter}\" of {component} is outside ({lower}, {upper}], found {value}")]
    ParameterOutOfRange {
        component: &'static str,
        parameter: &'static str,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("{component} requires {requirement}")]
    InvalidConfiguration {
        component: &'static str,
        requirement: &'static str,
    },

    #[error("the directional probability of {0} is only defined on its emitting surface")]
    DirectionOffSupport(&'static str),

    #[error("the {0} decorator removes more than 99% of the original mass")]
    RemovesTooMuchMass(&'static str),

    #[error("{component} needs at least one {element}")]
    EmptyInput {
        component: &'static str,
        element: &'static str,
    },

    #[error("numerical setup failed for {component}")]
    Numeric {
        component: &'static str,
        #[source]
        source: dustrt_numeric::Error,
    },
}

impl Error {
    /// Tag a numeric setup failure with the component it occurred in
    pub(crate) fn numeric(component: &'static str) -> impl Fn(dustrt_numeric::Error) -> Error {
        move |source| Error::Numeric { component, source }
    }
}
