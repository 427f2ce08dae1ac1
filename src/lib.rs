//! A modular Monte Carlo radiative transfer core for dusty astrophysical
//! media
//!
#![doc = include_str!("../readme.md")]
#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

// Flatten the default crates
#[doc(inline)]
pub use dustrt_numeric as numeric;

#[doc(inline)]
pub use dustrt_utils as utils;

// Re-exports of crates that are behind feature flags
#[cfg(feature = "config")]
#[cfg_attr(docsrs, doc(cfg(feature = "config")))]
#[doc(inline)]
pub use dustrt_config as config;

#[cfg(feature = "dust")]
#[cfg_attr(docsrs, doc(cfg(feature = "dust")))]
#[doc(inline)]
pub use dustrt_dust as dust;

#[cfg(feature = "geometry")]
#[cfg_attr(docsrs, doc(cfg(feature = "geometry")))]
#[doc(inline)]
pub use dustrt_geometry as geometry;

#[cfg(feature = "grid")]
#[cfg_attr(docsrs, doc(cfg(feature = "grid")))]
#[doc(inline)]
pub use dustrt_grid as grid;

#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
#[doc(inline)]
pub use dustrt_transport as transport;
