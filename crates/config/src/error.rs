//! Result and Error types for dustrt-config

/// Type alias for `Result<T, config::Error>`
pub type Result<T> = core::result::Result<T, Error>;

/// The error type for the `dustrt-config` crate
///
/// Configuration errors are fatal and reported before any setup work
/// runs; each message names the offending component or field.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to parse the configuration document")]
    Parse(#[from] serde_json::Error),

    #[error("the field \"{field}\" of {component} is out of range: {reason}")]
    FieldOutOfRange {
        component: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("{component} is missing a required child: {child}")]
    MissingChild {
        component: &'static str,
        child: &'static str,
    },

    #[error("the composition \"{0}\" is not registered with the builder")]
    UnknownComposition(String),

    #[error("the {decorator} decorator requires {requirement}")]
    ForbiddenCombination {
        decorator: &'static str,
        requirement: &'static str,
    },

    #[error("setting up \"{component}\" failed")]
    Geometry {
        component: String,
        #[source]
        source: dustrt_geometry::Error,
    },

    #[error("setting up \"{component}\" failed")]
    Dust {
        component: String,
        #[source]
        source: dustrt_dust::Error,
    },

    #[error("setting up \"{component}\" failed")]
    Grid {
        component: String,
        #[source]
        source: dustrt_grid::Error,
    },

    #[error("setting up \"{component}\" failed")]
    Transport {
        component: String,
        #[source]
        source: dustrt_transport::Error,
    },
}

impl Error {
    pub(crate) fn geometry(component: &str) -> impl Fn(dustrt_geometry::Error) -> Error + '_ {
        move |source| Error::Geometry {
            component: component.to_string(),
            source,
        }
    }

    pub(crate) fn dust(component: &str) -> impl Fn(dustrt_dust::Error) -> Error + '_ {
        move |source| Error::Dust {
            component: component.to_string(),
            source,
        }
    }

    pub(crate) fn grid(component: &str) -> impl Fn(dustrt_grid::Error) -> Error + '_ {
        move |source| Error::Grid {
            component: component.to_string(),
            source,
        }
    }

    pub(crate) fn transport(component: &str) -> impl Fn(dustrt_transport::Error) -> Error + '_ {
        move |source| Error::Transport {
            component: component.to_string(),
            source,
        }
    }
}
