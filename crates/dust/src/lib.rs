//! Dust optical properties for Monte Carlo radiative transfer
//!
//! This crate models everything the photon loop needs to know about
//! dust: the simulation [`WavelengthGrid`], per-material
//! [`GrainComposition`]s (efficiency, enthalpy and optional Mueller
//! tables, parsed from the plain-text resource formats), analytical
//! [`GrainSizeDistribution`]s, and the [`DustMix`] aggregating one or
//! more populations into wavelength-indexed cross sections, opacities,
//! albedo, asymmetry parameter and a Planck-integrated temperature
//! inversion table.
//!
//! ```rust
//! use dustrt_dust::{MixtureBuilder, WavelengthGrid};
//!
//! let grid = WavelengthGrid::new(vec![1e-7, 1e-6, 1e-5]).unwrap();
//! let mut builder = MixtureBuilder::new(&grid);
//! builder
//!     .add_population("gray", 1e-29, vec![2.0; 3], vec![1.0; 3], vec![0.0; 3])
//!     .unwrap();
//! let mix = builder.build().unwrap();
//!
//! // extinction is the sum of absorption and scattering
//! assert_eq!(mix.sigma_ext(0), 3.0);
//! assert_eq!(mix.albedo(0), 1.0 / 3.0);
//! ```

// Modules
mod composition;
mod error;
mod loader;
mod mixture;
mod presets;
mod sizedist;
mod wavelength;

// Flatten
pub use composition::{constant_composition, GrainComposition};
pub use error::{Error, Result};
pub use loader::{
    parse_dustem_grids, parse_enthalpy, parse_optical_grid, parse_stokes, MuellerGrid,
    OpticalGrid,
};
pub use mixture::{
    henyey_greenstein, planck_lambda, sample_henyey_greenstein, DustMix, MixtureBuilder,
};
pub use presets::{benchmark_1d_mix, electron_mix};
pub use sizedist::GrainSizeDistribution;
pub use wavelength::WavelengthGrid;
