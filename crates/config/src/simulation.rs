//! Grid, observer, source and top-level simulation records

use crate::components::{MixtureConfig, NormalizationConfig};
use crate::error::{Error, Result};
use crate::geometry::GeometryConfig;
use dustrt_dust::{GrainComposition, WavelengthGrid};
use dustrt_grid::{CartesianGrid, CylinderGrid, DustGrid, Sphere1DGrid, Sphere2DGrid, TwoPhaseGrid};
use dustrt_numeric::{Direction, Random, DEFAULT_SEED};
use dustrt_transport::{
    DustComp, DustSystem, EngineSettings, Observer, PhotonEngine, StellarSource,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The configuration record selecting and parameterising a dust grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GridConfig {
    /// A Cartesian grid from three border meshes
    Cartesian {
        x_borders: Vec<f64>,
        y_borders: Vec<f64>,
        z_borders: Vec<f64>,
    },
    /// A 2-D cylindrical grid
    Cylinder2d {
        radial_borders: Vec<f64>,
        z_borders: Vec<f64>,
    },
    /// A 2-D spherical grid (angles in radians)
    Sphere2d {
        radial_borders: Vec<f64>,
        polar_borders: Vec<f64>,
    },
    /// A 1-D spherical shell grid
    Sphere1d { radial_borders: Vec<f64> },
    /// A Cartesian grid with two-phase density weights
    TwoPhase {
        x_borders: Vec<f64>,
        y_borders: Vec<f64>,
        z_borders: Vec<f64>,
        filling_factor: f64,
        contrast: f64,
    },
}

impl GridConfig {
    /// Construct the runtime grid
    pub fn build(&self, random: &mut Random) -> Result<DustGrid> {
        Ok(match self {
            Self::Cartesian {
                x_borders,
                y_borders,
                z_borders,
            } => DustGrid::Cartesian(
                CartesianGrid::new(x_borders.clone(), y_borders.clone(), z_borders.clone())
                    .map_err(Error::grid("cartesian grid"))?,
            ),
            Self::Cylinder2d {
                radial_borders,
                z_borders,
            } => DustGrid::Cylinder2D(
                CylinderGrid::new(radial_borders.clone(), z_borders.clone())
                    .map_err(Error::grid("cylinder grid"))?,
            ),
            Self::Sphere2d {
                radial_borders,
                polar_borders,
            } => DustGrid::Sphere2D(
                Sphere2DGrid::new(radial_borders.clone(), polar_borders.clone())
                    .map_err(Error::grid("sphere grid"))?,
            ),
            Self::Sphere1d { radial_borders } => DustGrid::Sphere1D(
                Sphere1DGrid::new(radial_borders.clone())
                    .map_err(Error::grid("shell grid"))?,
            ),
            Self::TwoPhase {
                x_borders,
                y_borders,
                z_borders,
                filling_factor,
                contrast,
            } => {
                let inner =
                    CartesianGrid::new(x_borders.clone(), y_borders.clone(), z_borders.clone())
                        .map_err(Error::grid("two-phase grid"))?;
                DustGrid::TwoPhase(
                    TwoPhaseGrid::new(inner, *filling_factor, *contrast, random)
                        .map_err(Error::grid("two-phase grid"))?,
                )
            }
        })
    }
}

/// One dust component: geometry, mixture and normalization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentConfig {
    /// The density distribution of the component
    pub geometry: GeometryConfig,
    /// The dust mixture filling the component
    pub mixture: MixtureConfig,
    /// The rule scaling the unit-mass geometry
    pub normalization: NormalizationConfig,
}

/// One stellar source: geometry and luminosity spectrum
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceConfig {
    /// The emitting geometry
    pub geometry: GeometryConfig,
    /// The luminosities per wavelength bin, in W
    pub luminosities: Vec<f64>,
}

/// One peel-off observer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObserverConfig {
    /// Instrument name used in outputs
    pub name: String,
    /// Viewing direction (from the system towards the observer)
    pub direction: [f64; 3],
    /// Full width of the square field of view
    pub field_of_view: f64,
    /// Pixels along each image axis
    pub pixels: [usize; 2],
}

/// The top-level description of a simulation
///
/// The record tree mirrors the runtime composition: wavelength grid,
/// dust grid, dust components, stellar sources and observers, plus the
/// seed and the photon budget. [`SimulationConfig::build`] checks the
/// schema and assembles the tree in dependency order, leaves first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationConfig {
    /// The base seed of the random source
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// The simulation wavelengths in metres, ascending
    pub wavelengths: Vec<f64>,
    /// The spatial grid
    pub grid: GridConfig,
    /// The dust components
    pub components: Vec<ComponentConfig>,
    /// The stellar sources
    pub sources: Vec<SourceConfig>,
    /// The observers
    #[serde(default)]
    pub observers: Vec<ObserverConfig>,
    /// Photon packages per source per wavelength
    #[serde(default = "default_packages")]
    pub packages_per_wavelength: usize,
    /// Density samples per grid cell during discretisation
    #[serde(default = "default_density_samples")]
    pub density_samples_per_cell: usize,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_packages() -> usize {
    10_000
}

fn default_density_samples() -> usize {
    100
}

impl SimulationConfig {
    /// Parse a configuration document from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Assemble the simulation tree
    ///
    /// Multi-grain mixtures resolve their compositions by name through
    /// the supplied registry. All configuration and setup errors are
    /// fatal and name the offending component.
    pub fn build(&self, compositions: &HashMap<String, GrainComposition>) -> Result<PhotonEngine> {
        if self.components.is_empty() {
            return Err(Error::MissingChild {
                component: "simulation",
                child: "dust component",
            });
        }
        if self.sources.is_empty() {
            return Err(Error::MissingChild {
                component: "simulation",
                child: "stellar source",
            });
        }

        let wavelengths = WavelengthGrid::new(self.wavelengths.clone())
            .map_err(Error::dust("wavelength grid"))?;
        let mut random = Random::new(self.seed);

        let grid = self.grid.build(&mut random)?;

        let mut comps = Vec::with_capacity(self.components.len());
        for component in &self.components {
            let geometry = component.geometry.build(&mut random)?;
            let mixture = component.mixture.build(&wavelengths, compositions)?;
            let normalization = component.normalization.build();
            comps.push(
                DustComp::new(geometry, mixture, normalization)
                    .map_err(Error::transport(component.geometry.tag()))?,
            );
        }

        let system = DustSystem::new(grid, comps, self.density_samples_per_cell, &mut random)
            .map_err(Error::transport("dust system"))?;

        let mut sources = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if source.luminosities.len() != wavelengths.n_lambda() {
                return Err(Error::FieldOutOfRange {
                    component: "stellar source",
                    field: "luminosities",
                    reason: format!(
                        "expected {} entries, found {}",
                        wavelengths.n_lambda(),
                        source.luminosities.len()
                    ),
                });
            }
            let geometry = source.geometry.build(&mut random)?;
            sources.push(
                StellarSource::new(geometry, source.luminosities.clone())
                    .map_err(Error::transport(source.geometry.tag()))?,
            );
        }

        let mut observers = Vec::with_capacity(self.observers.len());
        for observer in &self.observers {
            let [dx, dy, dz] = observer.direction;
            let direction = Direction::new(dx, dy, dz).map_err(|_| Error::FieldOutOfRange {
                component: "observer",
                field: "direction",
                reason: "the direction vector must have a nonzero norm".to_string(),
            })?;
            observers.push(
                Observer::new(
                    observer.name.clone(),
                    direction,
                    observer.field_of_view,
                    observer.pixels[0],
                    observer.pixels[1],
                    wavelengths.n_lambda(),
                )
                .map_err(Error::transport(&observer.name))?,
            );
        }

        PhotonEngine::new(
            system,
            sources,
            observers,
            Random::new(self.seed),
            EngineSettings {
                packages_per_wavelength: self.packages_per_wavelength,
                ..EngineSettings::default()
            },
        )
        .map_err(Error::transport("photon engine"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        r#"{
            "wavelengths": [1e-6],
            "grid": {
                "type": "sphere1d",
                "radial_borders": [0.0, 1.0, 2.0, 3.0, 4.0]
            },
            "components": [{
                "geometry": { "type": "plummer", "scale": 1.0 },
                "mixture": {
                    "type": "tabulated",
                    "populations": [{
                        "name": "gray",
                        "mu": 1e-29,
                        "sigma_abs": [1e-25],
                        "sigma_sca": [1e-25],
                        "asymmetry": [0.0]
                    }]
                },
                "normalization": { "type": "dust-mass", "mass": 1.0 }
            }],
            "sources": [{
                "geometry": { "type": "stellar-surface", "radius": 0.01 },
                "luminosities": [1.0]
            }],
            "observers": [{
                "name": "face-on",
                "direction": [0.0, 0.0, 1.0],
                "field_of_view": 8.0,
                "pixels": [5, 5]
            }],
            "packages_per_wavelength": 100,
            "density_samples_per_cell": 16
        }"#
        .to_string()
    }

    #[test]
    fn a_minimal_simulation_builds_and_runs() {
        let config = SimulationConfig::from_json(&minimal_json()).unwrap();
        assert_eq!(config.seed, DEFAULT_SEED);
        let mut engine = config.build(&HashMap::new()).unwrap();
        engine.run_stellar_emission().unwrap();
        assert!(engine.observers()[0].sed()[0] > 0.0);
    }

    #[test]
    fn missing_children_are_schema_errors() {
        let mut config = SimulationConfig::from_json(&minimal_json()).unwrap();
        config.components.clear();
        assert!(config.build(&HashMap::new()).is_err());
    }

    #[test]
    fn spectrum_length_mismatches_are_reported() {
        let mut config = SimulationConfig::from_json(&minimal_json()).unwrap();
        config.sources[0].luminosities = vec![1.0, 2.0];
        let error = config.build(&HashMap::new()).unwrap_err();
        assert!(error.to_string().contains("luminosities"));
    }
}
