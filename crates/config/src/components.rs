//! Dust mixture, size distribution and normalization records

use crate::error::{Error, Result};
use dustrt_dust::{DustMix, GrainComposition, GrainSizeDistribution, MixtureBuilder, WavelengthGrid};
use dustrt_transport::Normalization;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The configuration record for a grain size distribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SizeDistributionConfig {
    /// A plain power law
    PowerLaw {
        factor: f64,
        exponent: f64,
        min_size: f64,
        max_size: f64,
    },
    /// A power law with an exponential tail
    PowerLawExpTail {
        factor: f64,
        exponent: f64,
        turnover_size: f64,
        decay_size: f64,
        decay_exponent: f64,
        min_size: f64,
        max_size: f64,
    },
    /// A curved power law with an exponential tail
    ModifiedPowerLaw {
        factor: f64,
        exponent: f64,
        turnover_size: f64,
        decay_size: f64,
        decay_exponent: f64,
        curvature_size: f64,
        curvature_strength: f64,
        curvature_exponent: f64,
        min_size: f64,
        max_size: f64,
    },
    /// A single grain size
    SingleSize { size: f64, factor: f64 },
    /// A log-normal distribution
    LogNormal {
        factor: f64,
        centroid: f64,
        width: f64,
        min_size: f64,
        max_size: f64,
    },
    /// The fitted Weingartner-Draine Milky Way graphite distribution
    WeingartnerDraineGraphite,
    /// The fitted Weingartner-Draine Milky Way silicate distribution
    WeingartnerDraineSilicate,
    /// The fitted Draine-Li PAH distribution
    WeingartnerDrainePah,
}

impl SizeDistributionConfig {
    /// Construct the runtime size distribution
    pub fn build(&self) -> Result<GrainSizeDistribution> {
        let wrap = Error::dust("size distribution");
        Ok(match *self {
            Self::PowerLaw {
                factor,
                exponent,
                min_size,
                max_size,
            } => GrainSizeDistribution::power_law(factor, exponent, min_size, max_size)
                .map_err(wrap)?,
            Self::PowerLawExpTail {
                factor,
                exponent,
                turnover_size,
                decay_size,
                decay_exponent,
                min_size,
                max_size,
            } => GrainSizeDistribution::power_law_exp_tail(
                factor,
                exponent,
                turnover_size,
                decay_size,
                decay_exponent,
                min_size,
                max_size,
            )
            .map_err(wrap)?,
            Self::ModifiedPowerLaw {
                factor,
                exponent,
                turnover_size,
                decay_size,
                decay_exponent,
                curvature_size,
                curvature_strength,
                curvature_exponent,
                min_size,
                max_size,
            } => GrainSizeDistribution::modified_power_law(
                factor,
                exponent,
                turnover_size,
                decay_size,
                decay_exponent,
                curvature_size,
                curvature_strength,
                curvature_exponent,
                min_size,
                max_size,
            )
            .map_err(wrap)?,
            Self::SingleSize { size, factor } => {
                GrainSizeDistribution::single_size(size, factor).map_err(wrap)?
            }
            Self::LogNormal {
                factor,
                centroid,
                width,
                min_size,
                max_size,
            } => GrainSizeDistribution::log_normal(factor, centroid, width, min_size, max_size)
                .map_err(wrap)?,
            Self::WeingartnerDraineGraphite => {
                GrainSizeDistribution::weingartner_draine_graphite()
            }
            Self::WeingartnerDraineSilicate => {
                GrainSizeDistribution::weingartner_draine_silicate()
            }
            Self::WeingartnerDrainePah => GrainSizeDistribution::weingartner_draine_pah(),
        })
    }
}

/// A population defined directly by its cross sections
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PopulationConfig {
    /// Identifier used in messages
    pub name: String,
    /// Dust mass per hydrogen atom
    pub mu: f64,
    /// Absorption cross sections per hydrogen atom
    pub sigma_abs: Vec<f64>,
    /// Scattering cross sections per hydrogen atom
    pub sigma_sca: Vec<f64>,
    /// Asymmetry parameters
    pub asymmetry: Vec<f64>,
    /// The grid the values are sampled on; the simulation grid if absent
    #[serde(default)]
    pub wavelengths: Option<Vec<f64>>,
}

/// One (composition, size distribution, bins) triple of a mixture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GrainPopulationConfig {
    /// The name of a registered composition
    pub composition: String,
    /// The grain size distribution
    pub size_distribution: SizeDistributionConfig,
    /// The number of logarithmic size bins
    pub n_bins: usize,
}

/// The configuration record for a dust mixture
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MixtureConfig {
    /// Populations with pre-tabulated cross sections
    Tabulated { populations: Vec<PopulationConfig> },
    /// Populations integrated from grain compositions
    MultiGrain { grains: Vec<GrainPopulationConfig> },
    /// The analytic one-dimensional benchmark mixture
    Benchmark1d,
    /// Free electrons with polarised Thomson scattering
    Electron,
}

impl MixtureConfig {
    /// Construct the dust mix on the simulation wavelength grid
    ///
    /// Multi-grain mixtures look their compositions up by name in the
    /// registry supplied by the caller, keeping the resource-loading
    /// seam outside the configuration layer.
    pub fn build(
        &self,
        grid: &WavelengthGrid,
        compositions: &HashMap<String, GrainComposition>,
    ) -> Result<DustMix> {
        match self {
            Self::Benchmark1d => {
                return dustrt_dust::benchmark_1d_mix(grid).map_err(Error::dust("benchmark mix"))
            }
            Self::Electron => {
                return dustrt_dust::electron_mix(grid).map_err(Error::dust("electron mix"))
            }
            _ => {}
        }

        let mut builder = MixtureBuilder::new(grid);
        match self {
            Self::Tabulated { populations } => {
                if populations.is_empty() {
                    return Err(Error::MissingChild {
                        component: "tabulated mixture",
                        child: "population",
                    });
                }
                for population in populations {
                    let wrap = Error::dust(&population.name);
                    match &population.wavelengths {
                        Some(lambdav) => builder
                            .add_population_on_grid(
                                population.name.clone(),
                                population.mu,
                                lambdav,
                                &population.sigma_abs,
                                &population.sigma_sca,
                                &population.asymmetry,
                            )
                            .map_err(wrap)?,
                        None => builder
                            .add_population(
                                population.name.clone(),
                                population.mu,
                                population.sigma_abs.clone(),
                                population.sigma_sca.clone(),
                                population.asymmetry.clone(),
                            )
                            .map_err(wrap)?,
                    };
                }
            }
            Self::MultiGrain { grains } => {
                if grains.is_empty() {
                    return Err(Error::MissingChild {
                        component: "multi-grain mixture",
                        child: "grain population",
                    });
                }
                for grain in grains {
                    let composition = compositions
                        .get(&grain.composition)
                        .ok_or_else(|| Error::UnknownComposition(grain.composition.clone()))?;
                    let size_distribution = grain.size_distribution.build()?;
                    builder
                        .add_grain_populations(composition, &size_distribution, grain.n_bins)
                        .map_err(Error::dust(&grain.composition))?;
                }
            }
            // the analytic presets returned above
            Self::Benchmark1d | Self::Electron => {}
        }
        builder.build().map_err(Error::dust("dust mix"))
    }
}

/// The configuration record for a component normalization rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NormalizationConfig {
    /// Fix the total dust mass
    DustMass { mass: f64 },
    /// Fix the face-on optical depth at a wavelength
    FaceOnOpticalDepth { tau: f64, wavelength: f64 },
    /// Fix the edge-on optical depth at a wavelength
    EdgeOnOpticalDepth { tau: f64, wavelength: f64 },
    /// Fix the radial optical depth at a wavelength
    RadialOpticalDepth { tau: f64, wavelength: f64 },
    /// Fix the optical depth along the X axis
    XOpticalDepth { tau: f64, wavelength: f64 },
    /// Fix the optical depth along the Y axis
    YOpticalDepth { tau: f64, wavelength: f64 },
    /// Fix the optical depth along the Z axis
    ZOpticalDepth { tau: f64, wavelength: f64 },
}

impl NormalizationConfig {
    /// Translate the record into the runtime normalization rule
    pub fn build(&self) -> Normalization {
        match *self {
            Self::DustMass { mass } => Normalization::DustMass(mass),
            Self::FaceOnOpticalDepth { tau, wavelength } => Normalization::FaceOnOpticalDepth {
                tau,
                lambda: wavelength,
            },
            Self::EdgeOnOpticalDepth { tau, wavelength } => Normalization::EdgeOnOpticalDepth {
                tau,
                lambda: wavelength,
            },
            Self::RadialOpticalDepth { tau, wavelength } => Normalization::RadialOpticalDepth {
                tau,
                lambda: wavelength,
            },
            Self::XOpticalDepth { tau, wavelength } => Normalization::XOpticalDepth {
                tau,
                lambda: wavelength,
            },
            Self::YOpticalDepth { tau, wavelength } => Normalization::YOpticalDepth {
                tau,
                lambda: wavelength,
            },
            Self::ZOpticalDepth { tau, wavelength } => Normalization::ZOpticalDepth {
                tau,
                lambda: wavelength,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_compositions_are_reported_by_name() {
        let config = MixtureConfig::MultiGrain {
            grains: vec![GrainPopulationConfig {
                composition: "missing".to_string(),
                size_distribution: SizeDistributionConfig::WeingartnerDraineGraphite,
                n_bins: 3,
            }],
        };
        let grid = WavelengthGrid::new(vec![1e-6]).unwrap();
        let error = config.build(&grid, &HashMap::new()).unwrap_err();
        assert!(error.to_string().contains("missing"));
    }

    #[test]
    fn tabulated_mixtures_build() {
        let config = MixtureConfig::Tabulated {
            populations: vec![PopulationConfig {
                name: "gray".to_string(),
                mu: 1e-29,
                sigma_abs: vec![1.0],
                sigma_sca: vec![1.0],
                asymmetry: vec![0.0],
                wavelengths: None,
            }],
        };
        let grid = WavelengthGrid::new(vec![1e-6]).unwrap();
        let mix = config.build(&grid, &HashMap::new()).unwrap();
        assert_eq!(mix.n_pop(), 1);
        assert_eq!(mix.albedo(0), 0.5);
    }

    #[test]
    fn normalization_tags_parse() {
        let text = r#"{ "type": "face-on-optical-depth", "tau": 1.0, "wavelength": 5.5e-7 }"#;
        let record: NormalizationConfig = serde_json::from_str(text).unwrap();
        assert_eq!(
            record.build(),
            Normalization::FaceOnOpticalDepth {
                tau: 1.0,
                lambda: 5.5e-7
            }
        );
    }
}
