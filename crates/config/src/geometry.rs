//! Geometry configuration records
//!
//! Each record is a plain data description of one geometry; the string
//! tag in its serialised form selects the constructor. Decorator records
//! own their inner record, mirroring the runtime composition tree.

use crate::error::{Error, Result};
use dustrt_geometry::{
    AxGeometry, ClumpyDecorator, CombineDecorator, CylindricalCavityDecorator, GenGeometry,
    Geometry, MeshCell, OffsetDecorator, Particle, PointGeometry, SepAxGeometry, Site,
    SmoothingKernel, SphereCropDecorator, SphericalCavityDecorator, SpheGeometry,
    SpheroidalDecorator, SpiralArmDecorator,
};
use dustrt_numeric::{Box3, Position, Random};
use serde::{Deserialize, Serialize};

/// An inline particle record for the SPH importer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticleRecord {
    /// Particle centre
    pub position: [f64; 3],
    /// Smoothing length
    pub h: f64,
    /// Particle mass
    pub mass: f64,
}

/// An inline site record for the Voronoi importer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SiteRecord {
    /// Generating point
    pub position: [f64; 3],
    /// Site mass
    pub mass: f64,
}

/// An inline leaf-cell record for the adaptive-mesh importer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeshCellRecord {
    /// Cell extent as `[xmin, ymin, zmin, xmax, ymax, zmax]`
    pub extent: [f64; 6],
    /// Raw density value
    pub density: f64,
}

/// The configuration record selecting and parameterising a geometry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GeometryConfig {
    /// A Plummer sphere
    Plummer { scale: f64 },
    /// An Einasto profile
    Einasto { index: f64, effective_radius: f64 },
    /// A Sérsic profile
    Sersic { index: f64, effective_radius: f64 },
    /// A power-law shell
    Shell {
        exponent: f64,
        min_radius: f64,
        max_radius: f64,
    },
    /// A double-exponential disk
    ExpDisk { radial_scale: f64, axial_scale: f64 },
    /// A broken-exponential disk
    BrokenExpDisk {
        inner_scale: f64,
        outer_scale: f64,
        axial_scale: f64,
        break_radius: f64,
        sharpness: f64,
    },
    /// A flattened Gaussian
    Gaussian { dispersion: f64, flattening: f64 },
    /// A Gaussian ring with an exponential vertical profile
    Ring {
        radius: f64,
        width: f64,
        axial_scale: f64,
    },
    /// A dusty torus
    Torus {
        exponent: f64,
        polar_index: f64,
        opening_angle: f64,
        min_radius: f64,
        max_radius: f64,
        #[serde(default)]
        anisotropic_inner: bool,
        #[serde(default)]
        cutoff_radius: f64,
    },
    /// A conical shell
    ConicalShell {
        exponent: f64,
        polar_index: f64,
        inner_angle: f64,
        outer_angle: f64,
        min_radius: f64,
        max_radius: f64,
        #[serde(default)]
        anisotropic_inner: bool,
        #[serde(default)]
        cutoff_radius: f64,
    },
    /// A uniform box given by its extreme coordinates
    UniformBox { extent: [f64; 6] },
    /// A FITS-style pixel table with an exponential vertical profile
    TabulatedImage {
        pixels: Vec<f64>,
        n_x: usize,
        n_y: usize,
        pixel_size: f64,
        axial_scale: f64,
    },
    /// An SPH particle cloud
    ParticleCloud {
        particles: Vec<ParticleRecord>,
        #[serde(default = "default_kernel")]
        kernel: String,
    },
    /// A Voronoi site cloud in a bounding box
    VoronoiCloud {
        sites: Vec<SiteRecord>,
        extent: [f64; 6],
    },
    /// An imported adaptive mesh
    AdaptiveMesh { cells: Vec<MeshCellRecord> },
    /// A stellar surface emitter
    StellarSurface { radius: f64 },
    /// A laser emitter
    Laser,
    /// The Netzer accretion-disk emitter
    NetzerAccretionDisk,
    /// A background-sphere emitter
    SphereBackground { radius: f64 },
    /// A background-cube emitter
    CubeBackground { half_extent: f64 },
    /// A solar-patch emitter
    SolarPatch { radius: f64 },
    /// The inner geometry shifted by an offset
    Offset {
        offset: [f64; 3],
        geometry: Box<GeometryConfig>,
    },
    /// A flattened spherical inner geometry
    Spheroidal {
        flattening: f64,
        geometry: Box<GeometryConfig>,
    },
    /// Part of the inner mass redistributed into clumps
    Clumpy {
        fraction: f64,
        n_clumps: usize,
        clump_radius: f64,
        #[serde(default)]
        cutoff: bool,
        #[serde(default = "default_kernel")]
        kernel: String,
        geometry: Box<GeometryConfig>,
    },
    /// A spiral-arm perturbation
    SpiralArm {
        arms: u32,
        pitch: f64,
        radius: f64,
        #[serde(default)]
        phase: f64,
        weight: f64,
        index: u32,
        geometry: Box<GeometryConfig>,
    },
    /// An axial cylindrical cavity
    CylindricalCavity {
        radius: f64,
        geometry: Box<GeometryConfig>,
    },
    /// A spherical cavity
    SphericalCavity {
        radius: f64,
        #[serde(default)]
        center: [f64; 3],
        geometry: Box<GeometryConfig>,
    },
    /// A spherical crop
    SphereCrop {
        radius: f64,
        #[serde(default)]
        center: [f64; 3],
        geometry: Box<GeometryConfig>,
    },
    /// A weighted combination of two geometries
    Combine {
        first: Box<GeometryConfig>,
        first_weight: f64,
        second: Box<GeometryConfig>,
        second_weight: f64,
    },
}

fn default_kernel() -> String {
    "cubic-spline".to_string()
}

impl GeometryConfig {
    /// A short tag naming the record in error messages
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Plummer { .. } => "plummer",
            Self::Einasto { .. } => "einasto",
            Self::Sersic { .. } => "sersic",
            Self::Shell { .. } => "shell",
            Self::ExpDisk { .. } => "exp-disk",
            Self::BrokenExpDisk { .. } => "broken-exp-disk",
            Self::Gaussian { .. } => "gaussian",
            Self::Ring { .. } => "ring",
            Self::Torus { .. } => "torus",
            Self::ConicalShell { .. } => "conical-shell",
            Self::UniformBox { .. } => "uniform-box",
            Self::TabulatedImage { .. } => "tabulated-image",
            Self::ParticleCloud { .. } => "particle-cloud",
            Self::VoronoiCloud { .. } => "voronoi-cloud",
            Self::AdaptiveMesh { .. } => "adaptive-mesh",
            Self::StellarSurface { .. } => "stellar-surface",
            Self::Laser => "laser",
            Self::NetzerAccretionDisk => "netzer-accretion-disk",
            Self::SphereBackground { .. } => "sphere-background",
            Self::CubeBackground { .. } => "cube-background",
            Self::SolarPatch { .. } => "solar-patch",
            Self::Offset { .. } => "offset",
            Self::Spheroidal { .. } => "spheroidal",
            Self::Clumpy { .. } => "clumpy",
            Self::SpiralArm { .. } => "spiral-arm",
            Self::CylindricalCavity { .. } => "cylindrical-cavity",
            Self::SphericalCavity { .. } => "spherical-cavity",
            Self::SphereCrop { .. } => "sphere-crop",
            Self::Combine { .. } => "combine",
        }
    }

    /// Construct the runtime geometry this record describes
    ///
    /// Decorators that need Monte Carlo setup (clump placement, cavity
    /// renormalisation) consume deviates from the shared random source.
    pub fn build(&self, random: &mut Random) -> Result<Geometry> {
        let tag = self.tag();
        Ok(match self {
            Self::Plummer { scale } => Geometry::Sphe(SpheGeometry::plummer(*scale).map_err(Error::geometry(tag))?),
            Self::Einasto {
                index,
                effective_radius,
            } => Geometry::Sphe(SpheGeometry::einasto(*index, *effective_radius).map_err(Error::geometry(tag))?),
            Self::Sersic {
                index,
                effective_radius,
            } => Geometry::Sphe(SpheGeometry::sersic(*index, *effective_radius).map_err(Error::geometry(tag))?),
            Self::Shell {
                exponent,
                min_radius,
                max_radius,
            } => Geometry::Sphe(
                SpheGeometry::shell(*exponent, *min_radius, *max_radius).map_err(Error::geometry(tag))?,
            ),
            Self::ExpDisk {
                radial_scale,
                axial_scale,
            } => Geometry::SepAx(SepAxGeometry::exp_disk(*radial_scale, *axial_scale).map_err(Error::geometry(tag))?),
            Self::BrokenExpDisk {
                inner_scale,
                outer_scale,
                axial_scale,
                break_radius,
                sharpness,
            } => Geometry::SepAx(
                SepAxGeometry::broken_exp_disk(
                    *inner_scale,
                    *outer_scale,
                    *axial_scale,
                    *break_radius,
                    *sharpness,
                )
                .map_err(Error::geometry(tag))?,
            ),
            Self::Gaussian {
                dispersion,
                flattening,
            } => Geometry::SepAx(SepAxGeometry::gaussian(*dispersion, *flattening).map_err(Error::geometry(tag))?),
            Self::Ring {
                radius,
                width,
                axial_scale,
            } => Geometry::SepAx(SepAxGeometry::ring(*radius, *width, *axial_scale).map_err(Error::geometry(tag))?),
            Self::Torus {
                exponent,
                polar_index,
                opening_angle,
                min_radius,
                max_radius,
                anisotropic_inner,
                cutoff_radius,
            } => Geometry::Ax(
                AxGeometry::torus(
                    *exponent,
                    *polar_index,
                    *opening_angle,
                    *min_radius,
                    *max_radius,
                    *anisotropic_inner,
                    *cutoff_radius,
                )
                .map_err(Error::geometry(tag))?,
            ),
            Self::ConicalShell {
                exponent,
                polar_index,
                inner_angle,
                outer_angle,
                min_radius,
                max_radius,
                anisotropic_inner,
                cutoff_radius,
            } => Geometry::Ax(
                AxGeometry::conical_shell(
                    *exponent,
                    *polar_index,
                    *inner_angle,
                    *outer_angle,
                    *min_radius,
                    *max_radius,
                    *anisotropic_inner,
                    *cutoff_radius,
                )
                .map_err(Error::geometry(tag))?,
            ),
            Self::UniformBox { extent } => Geometry::Gen(
                GenGeometry::uniform_box(box_from(extent)).map_err(Error::geometry(tag))?,
            ),
            Self::TabulatedImage {
                pixels,
                n_x,
                n_y,
                pixel_size,
                axial_scale,
            } => Geometry::Gen(
                GenGeometry::tabulated_image(pixels.clone(), *n_x, *n_y, *pixel_size, *axial_scale)
                    .map_err(Error::geometry(tag))?,
            ),
            Self::ParticleCloud { particles, kernel } => {
                let particles = particles
                    .iter()
                    .map(|p| Particle {
                        position: Position::new(p.position[0], p.position[1], p.position[2]),
                        h: p.h,
                        mass: p.mass,
                    })
                    .collect();
                let kernel = SmoothingKernel::from_tag(kernel).map_err(Error::geometry(tag))?;
                Geometry::Gen(GenGeometry::particle_cloud(particles, kernel).map_err(Error::geometry(tag))?)
            }
            Self::VoronoiCloud { sites, extent } => {
                let sites = sites
                    .iter()
                    .map(|s| Site {
                        position: Position::new(s.position[0], s.position[1], s.position[2]),
                        mass: s.mass,
                    })
                    .collect();
                Geometry::Gen(
                    GenGeometry::voronoi_cloud(sites, box_from(extent), random).map_err(Error::geometry(tag))?,
                )
            }
            Self::AdaptiveMesh { cells } => {
                let cells = cells
                    .iter()
                    .map(|c| MeshCell {
                        extent: box_from(&c.extent),
                        density: c.density,
                    })
                    .collect();
                Geometry::Gen(GenGeometry::adaptive_mesh(cells).map_err(Error::geometry(tag))?)
            }
            Self::StellarSurface { radius } => {
                Geometry::Point(PointGeometry::stellar_surface(*radius).map_err(Error::geometry(tag))?)
            }
            Self::Laser => Geometry::Point(PointGeometry::laser()),
            Self::NetzerAccretionDisk => {
                Geometry::Point(PointGeometry::netzer_accretion_disk().map_err(Error::geometry(tag))?)
            }
            Self::SphereBackground { radius } => {
                Geometry::Point(PointGeometry::sphere_background(*radius).map_err(Error::geometry(tag))?)
            }
            Self::CubeBackground { half_extent } => {
                Geometry::Point(PointGeometry::cube_background(*half_extent).map_err(Error::geometry(tag))?)
            }
            Self::SolarPatch { radius } => {
                Geometry::Point(PointGeometry::solar_patch(*radius).map_err(Error::geometry(tag))?)
            }
            Self::Offset { offset, geometry } => {
                let inner = geometry.build(random)?;
                Geometry::Offset(OffsetDecorator::new(inner, offset[0], offset[1], offset[2]))
            }
            Self::Spheroidal {
                flattening,
                geometry,
            } => {
                let inner = geometry.build(random)?;
                let Geometry::Sphe(sphe) = inner else {
                    return Err(Error::ForbiddenCombination {
                        decorator: "spheroidal",
                        requirement: "a spherically symmetric inner geometry",
                    });
                };
                Geometry::Spheroidal(SpheroidalDecorator::new(sphe, *flattening).map_err(Error::geometry(tag))?)
            }
            Self::Clumpy {
                fraction,
                n_clumps,
                clump_radius,
                cutoff,
                kernel,
                geometry,
            } => {
                let inner = geometry.build(random)?;
                let kernel = SmoothingKernel::from_tag(kernel).map_err(Error::geometry(tag))?;
                Geometry::Clumpy(
                    ClumpyDecorator::new(
                        inner,
                        *fraction,
                        *n_clumps,
                        *clump_radius,
                        *cutoff,
                        kernel,
                        random,
                    )
                    .map_err(Error::geometry(tag))?,
                )
            }
            Self::SpiralArm {
                arms,
                pitch,
                radius,
                phase,
                weight,
                index,
                geometry,
            } => {
                let inner = geometry.build(random)?;
                Geometry::SpiralArm(
                    SpiralArmDecorator::new(inner, *arms, *pitch, *radius, *phase, *weight, *index)
                        .map_err(Error::geometry(tag))?,
                )
            }
            Self::CylindricalCavity { radius, geometry } => {
                let inner = geometry.build(random)?;
                Geometry::CylindricalCavity(
                    CylindricalCavityDecorator::new(inner, *radius, random).map_err(Error::geometry(tag))?,
                )
            }
            Self::SphericalCavity {
                radius,
                center,
                geometry,
            } => {
                let inner = geometry.build(random)?;
                Geometry::SphericalCavity(
                    SphericalCavityDecorator::new(
                        inner,
                        Position::new(center[0], center[1], center[2]),
                        *radius,
                        random,
                    )
                    .map_err(Error::geometry(tag))?,
                )
            }
            Self::SphereCrop {
                radius,
                center,
                geometry,
            } => {
                let inner = geometry.build(random)?;
                Geometry::SphereCrop(
                    SphereCropDecorator::new(
                        inner,
                        Position::new(center[0], center[1], center[2]),
                        *radius,
                        random,
                    )
                    .map_err(Error::geometry(tag))?,
                )
            }
            Self::Combine {
                first,
                first_weight,
                second,
                second_weight,
            } => {
                let a = first.build(random)?;
                let b = second.build(random)?;
                Geometry::Combine(
                    CombineDecorator::new(a, *first_weight, b, *second_weight).map_err(Error::geometry(tag))?,
                )
            }
        })
    }
}

fn box_from(extent: &[f64; 6]) -> Box3 {
    Box3::new(extent[0], extent[1], extent[2], extent[3], extent[4], extent[5])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_round_trip_through_json() {
        let record = GeometryConfig::Spheroidal {
            flattening: 0.6,
            geometry: Box::new(GeometryConfig::Plummer { scale: 2.0 }),
        };
        let text = serde_json::to_string(&record).unwrap();
        assert!(text.contains("\"type\":\"spheroidal\""));
        let parsed: GeometryConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn string_tags_select_constructors() {
        let text = r#"{ "type": "exp-disk", "radial_scale": 2.0, "axial_scale": 0.5 }"#;
        let record: GeometryConfig = serde_json::from_str(text).unwrap();
        let mut random = Random::default();
        let geometry = record.build(&mut random).unwrap();
        assert_eq!(geometry.dimension(), 2);
    }

    #[test]
    fn forbidden_combinations_are_reported() {
        // flattening a disk is not allowed; the decorator needs a
        // spherically symmetric inner geometry
        let record = GeometryConfig::Spheroidal {
            flattening: 0.5,
            geometry: Box::new(GeometryConfig::ExpDisk {
                radial_scale: 1.0,
                axial_scale: 0.2,
            }),
        };
        let mut random = Random::default();
        assert!(record.build(&mut random).is_err());
    }

    #[test]
    fn out_of_range_fields_fail_at_build() {
        let record = GeometryConfig::Plummer { scale: -1.0 };
        let mut random = Random::default();
        assert!(record.build(&mut random).is_err());
    }
}
