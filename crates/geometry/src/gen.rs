//! General three-dimensional density fields
//!
//! Besides the analytic uniform box, this module hosts the data-driven
//! geometries: a FITS-style pixel table expanded with an exponential
//! vertical profile, an SPH particle cloud, a Voronoi site cloud, and an
//! imported adaptive-mesh leaf list. The importers consume pre-loaded
//! in-memory tables; file readers live outside the core.

use crate::error::{Error, Result};
use crate::kernel::SmoothingKernel;
use crate::sphe::positive;
use dustrt_numeric::{cdf_with, locate_clip, Box3, Position, Random};
use log::warn;

// sample count for Monte Carlo cell-volume estimates
const VORONOI_VOLUME_SAMPLES: usize = 100_000;
// rejection budget for density-based position sampling
const MAX_REJECTION_TRIES: usize = 100_000;
// resolution of numeric axis integrals
const LINE_INTEGRAL_STEPS: usize = 4096;

/// An SPH-style particle with a smoothing length and a mass fraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Centre of the smoothing kernel
    pub position: Position,
    /// Smoothing length
    pub h: f64,
    /// Particle mass (normalised during setup)
    pub mass: f64,
}

/// A Voronoi generating site with an associated mass fraction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Site {
    /// Generating point of the cell
    pub position: Position,
    /// Site mass (normalised during setup)
    pub mass: f64,
}

/// A leaf cell of an imported adaptive mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshCell {
    /// Extent of the leaf
    pub extent: Box3,
    /// Raw density value (arbitrary units; normalised during setup)
    pub density: f64,
}

/// The catalog of general three-dimensional geometries
#[derive(Debug, Clone, PartialEq)]
pub enum GenGeometry {
    /// Constant density inside an axis-aligned box
    UniformBox { extent: Box3, rho: f64 },
    /// A pixel table in the xy-plane with an exponential vertical profile
    TabulatedImage {
        nx: usize,
        ny: usize,
        pixel_size: f64,
        h_z: f64,
        weights: Vec<f64>,
        cumulative: Vec<f64>,
    },
    /// A cloud of kernel-smoothed particles
    ParticleCloud {
        particles: Vec<Particle>,
        kernel: SmoothingKernel,
        cumulative: Vec<f64>,
        extent: Box3,
    },
    /// Sites with Monte-Carlo estimated cell volumes in a bounding box
    VoronoiCloud {
        sites: Vec<Site>,
        extent: Box3,
        densities: Vec<f64>,
        max_density: f64,
    },
    /// An imported list of adaptive-mesh leaf cells
    AdaptiveMesh {
        cells: Vec<MeshCell>,
        densities: Vec<f64>,
        cumulative: Vec<f64>,
    },
}

impl GenGeometry {
    /// Initialise a uniform box
    pub fn uniform_box(extent: Box3) -> Result<Self> {
        let volume = extent.volume();
        positive("UniformBox", "volume", volume)?;
        Ok(Self::UniformBox {
            extent,
            rho: 1.0 / volume,
        })
    }

    /// Initialise from a pixel table centred on the origin
    ///
    /// The table holds `nx * ny` nonnegative weights in row-major order
    /// (x fastest). Each pixel is a square of side `pixel_size`; the
    /// vertical profile is exponential with scale height `h_z`.
    pub fn tabulated_image(
        weights: Vec<f64>,
        nx: usize,
        ny: usize,
        pixel_size: f64,
        h_z: f64,
    ) -> Result<Self> {
        if weights.len() != nx * ny || weights.is_empty() {
            return Err(Error::EmptyInput {
                component: "TabulatedImage",
                element: "pixel weight",
            });
        }
        positive("TabulatedImage", "pixel_size", pixel_size)?;
        positive("TabulatedImage", "h_z", h_z)?;

        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(Error::EmptyInput {
                component: "TabulatedImage",
                element: "positive pixel weight",
            });
        }
        let weights: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let cumulative = cdf_with(weights.len(), |i| weights[i])
            .map_err(Error::numeric("TabulatedImage"))?;

        Ok(Self::TabulatedImage {
            nx,
            ny,
            pixel_size,
            h_z,
            weights,
            cumulative,
        })
    }

    /// Initialise a particle cloud smoothed with the given kernel
    pub fn particle_cloud(mut particles: Vec<Particle>, kernel: SmoothingKernel) -> Result<Self> {
        if particles.is_empty() {
            return Err(Error::EmptyInput {
                component: "ParticleCloud",
                element: "particle",
            });
        }
        let total: f64 = particles.iter().map(|p| p.mass).sum();
        positive("ParticleCloud", "total mass", total)?;
        particles.iter_mut().for_each(|p| p.mass /= total);

        let cumulative = cdf_with(particles.len(), |i| particles[i].mass)
            .map_err(Error::numeric("ParticleCloud"))?;
        let extent = particle_extent(&particles);

        Ok(Self::ParticleCloud {
            particles,
            kernel,
            cumulative,
            extent,
        })
    }

    /// Initialise a Voronoi site cloud in a bounding box
    ///
    /// Cell volumes are estimated by Monte Carlo sampling of the box at
    /// setup; the relative error on a cell volume scales with the inverse
    /// square root of the hits it receives.
    pub fn voronoi_cloud(mut sites: Vec<Site>, extent: Box3, random: &mut Random) -> Result<Self> {
        if sites.is_empty() {
            return Err(Error::EmptyInput {
                component: "VoronoiCloud",
                element: "site",
            });
        }
        let total: f64 = sites.iter().map(|s| s.mass).sum();
        positive("VoronoiCloud", "total mass", total)?;
        sites.iter_mut().for_each(|s| s.mass /= total);

        // estimate cell volumes by nearest-site counting
        let mut hits = vec![0_usize; sites.len()];
        for _ in 0..VORONOI_VOLUME_SAMPLES {
            let sample = random.position(&extent);
            hits[nearest_site(&sites, &sample)] += 1;
        }

        let volume = extent.volume();
        let mut densities = Vec::with_capacity(sites.len());
        for (site, &count) in sites.iter().zip(&hits) {
            if count == 0 {
                warn!("a Voronoi site received no volume samples; its density is set to zero");
                densities.push(0.0);
            } else {
                let cell_volume = volume * count as f64 / VORONOI_VOLUME_SAMPLES as f64;
                densities.push(site.mass / cell_volume);
            }
        }
        let max_density = densities.iter().cloned().fold(0.0, f64::max);

        Ok(Self::VoronoiCloud {
            sites,
            extent,
            densities,
            max_density,
        })
    }

    /// Initialise from an imported list of adaptive-mesh leaf cells
    pub fn adaptive_mesh(cells: Vec<MeshCell>) -> Result<Self> {
        if cells.is_empty() {
            return Err(Error::EmptyInput {
                component: "AdaptiveMesh",
                element: "leaf cell",
            });
        }
        let total: f64 = cells.iter().map(|c| c.density * c.extent.volume()).sum();
        positive("AdaptiveMesh", "total mass", total)?;

        let densities: Vec<f64> = cells.iter().map(|c| c.density / total).collect();
        let cumulative = cdf_with(cells.len(), |i| cells[i].density * cells[i].extent.volume())
            .map_err(Error::numeric("AdaptiveMesh"))?;

        Ok(Self::AdaptiveMesh {
            cells,
            densities,
            cumulative,
        })
    }

    /// The density at a position
    pub fn density(&self, position: &Position) -> f64 {
        match self {
            Self::UniformBox { extent, rho } => {
                if extent.contains(position) {
                    *rho
                } else {
                    0.0
                }
            }
            Self::TabulatedImage {
                nx,
                ny,
                pixel_size,
                h_z,
                weights,
                ..
            } => {
                let (x, y, z) = position.cartesian();
                match pixel_index(x, y, *nx, *ny, *pixel_size) {
                    Some((i, j)) => {
                        let w = weights[j * nx + i];
                        w / (pixel_size * pixel_size) * (-z.abs() / h_z).exp() / (2.0 * h_z)
                    }
                    None => 0.0,
                }
            }
            Self::ParticleCloud {
                particles, kernel, ..
            } => particles
                .iter()
                .map(|p| {
                    let u = (*position - p.position).norm() / p.h;
                    p.mass * kernel.density(u) / p.h.powi(3)
                })
                .sum(),
            Self::VoronoiCloud {
                sites,
                extent,
                densities,
                ..
            } => {
                if !extent.contains(position) {
                    return 0.0;
                }
                densities[nearest_site(sites, position)]
            }
            Self::AdaptiveMesh {
                cells, densities, ..
            } => cells
                .iter()
                .position(|c| c.extent.contains(position))
                .map_or(0.0, |i| densities[i]),
        }
    }

    /// Draw a position from the density
    pub fn generate_position(&self, random: &mut Random) -> Position {
        match self {
            Self::UniformBox { extent, .. } => random.position(extent),
            Self::TabulatedImage {
                nx,
                pixel_size,
                h_z,
                cumulative,
                ny,
                ..
            } => {
                let index = locate_clip(cumulative, random.uniform());
                let (i, j) = (index % nx, index / nx);
                let x = (i as f64 + random.uniform() - *nx as f64 / 2.0) * pixel_size;
                let y = (j as f64 + random.uniform() - *ny as f64 / 2.0) * pixel_size;
                let u = random.uniform();
                let z = if u <= 0.5 {
                    h_z * (2.0 * u).max(f64::MIN_POSITIVE).ln()
                } else {
                    -h_z * (2.0 * (1.0 - u)).max(f64::MIN_POSITIVE).ln()
                };
                Position::new(x, y, z)
            }
            Self::ParticleCloud {
                particles,
                kernel,
                cumulative,
                ..
            } => {
                let index = locate_clip(cumulative, random.uniform());
                let particle = &particles[index];
                let u = kernel.generate_radius(random);
                let direction = random.direction();
                particle.position.shifted(&direction, u * particle.h)
            }
            Self::VoronoiCloud {
                extent,
                max_density,
                ..
            } => {
                // rejection against the cellwise-constant density
                for _ in 0..MAX_REJECTION_TRIES {
                    let candidate = random.position(extent);
                    if random.uniform() * max_density <= self.density(&candidate) {
                        return candidate;
                    }
                }
                warn!("Voronoi position sampler exhausted its rejection budget");
                random.position(extent)
            }
            Self::AdaptiveMesh {
                cells, cumulative, ..
            } => {
                let index = locate_clip(cumulative, random.uniform());
                random.position(&cells[index].extent)
            }
        }
    }

    /// The X-axis surface density
    pub fn sigma_x(&self) -> f64 {
        match self {
            Self::UniformBox { extent, rho } => axis_column(extent, rho, Axis::X),
            Self::TabulatedImage {
                nx,
                ny,
                pixel_size,
                h_z,
                weights,
                ..
            } => {
                // the x-axis crosses the pixel row at y = 0
                match pixel_index(0.0, 0.0, *nx, *ny, *pixel_size) {
                    Some((_, j0)) => {
                        let row: f64 = (0..*nx).map(|i| weights[j0 * nx + i]).sum();
                        row / (pixel_size * 2.0 * h_z)
                    }
                    None => 0.0,
                }
            }
            Self::AdaptiveMesh {
                cells, densities, ..
            } => cells
                .iter()
                .zip(densities)
                .filter(|(c, _)| on_axis(&c.extent, Axis::X))
                .map(|(c, rho)| rho * (c.extent.xmax() - c.extent.xmin()))
                .sum(),
            _ => self.line_integral(Axis::X),
        }
    }

    /// The Y-axis surface density
    pub fn sigma_y(&self) -> f64 {
        match self {
            Self::UniformBox { extent, rho } => axis_column(extent, rho, Axis::Y),
            Self::TabulatedImage {
                nx,
                ny,
                pixel_size,
                h_z,
                weights,
                ..
            } => match pixel_index(0.0, 0.0, *nx, *ny, *pixel_size) {
                Some((i0, _)) => {
                    let column: f64 = (0..*ny).map(|j| weights[j * nx + i0]).sum();
                    column / (pixel_size * 2.0 * h_z)
                }
                None => 0.0,
            },
            Self::AdaptiveMesh {
                cells, densities, ..
            } => cells
                .iter()
                .zip(densities)
                .filter(|(c, _)| on_axis(&c.extent, Axis::Y))
                .map(|(c, rho)| rho * (c.extent.ymax() - c.extent.ymin()))
                .sum(),
            _ => self.line_integral(Axis::Y),
        }
    }

    /// The Z-axis surface density
    pub fn sigma_z(&self) -> f64 {
        match self {
            Self::UniformBox { extent, rho } => axis_column(extent, rho, Axis::Z),
            Self::TabulatedImage {
                nx,
                ny,
                pixel_size,
                weights,
                ..
            } => match pixel_index(0.0, 0.0, *nx, *ny, *pixel_size) {
                Some((i0, j0)) => weights[j0 * nx + i0] / (pixel_size * pixel_size),
                None => 0.0,
            },
            Self::AdaptiveMesh {
                cells, densities, ..
            } => cells
                .iter()
                .zip(densities)
                .filter(|(c, _)| on_axis(&c.extent, Axis::Z))
                .map(|(c, rho)| rho * (c.extent.zmax() - c.extent.zmin()))
                .sum(),
            _ => self.line_integral(Axis::Z),
        }
    }

    /// The bounding extent used by samplers and line integrals
    pub fn extent(&self) -> Box3 {
        match self {
            Self::UniformBox { extent, .. } => *extent,
            Self::TabulatedImage {
                nx,
                ny,
                pixel_size,
                h_z,
                ..
            } => {
                let hx = 0.5 * *nx as f64 * pixel_size;
                let hy = 0.5 * *ny as f64 * pixel_size;
                Box3::new(-hx, -hy, -20.0 * h_z, hx, hy, 20.0 * h_z)
            }
            Self::ParticleCloud { extent, .. } | Self::VoronoiCloud { extent, .. } => *extent,
            Self::AdaptiveMesh { cells, .. } => {
                let mut extent = cells[0].extent;
                for cell in cells.iter().skip(1) {
                    extent = Box3::new(
                        extent.xmin().min(cell.extent.xmin()),
                        extent.ymin().min(cell.extent.ymin()),
                        extent.zmin().min(cell.extent.zmin()),
                        extent.xmax().max(cell.extent.xmax()),
                        extent.ymax().max(cell.extent.ymax()),
                        extent.zmax().max(cell.extent.zmax()),
                    );
                }
                extent
            }
        }
    }

    // trapezoidal line integral of the density along a coordinate axis
    fn line_integral(&self, axis: Axis) -> f64 {
        let extent = self.extent();
        let (tmin, tmax) = match axis {
            Axis::X => (extent.xmin(), extent.xmax()),
            Axis::Y => (extent.ymin(), extent.ymax()),
            Axis::Z => (extent.zmin(), extent.zmax()),
        };
        if tmin >= tmax {
            return 0.0;
        }
        let dt = (tmax - tmin) / LINE_INTEGRAL_STEPS as f64;
        let mut sum = 0.0;
        for step in 0..=LINE_INTEGRAL_STEPS {
            let t = tmin + step as f64 * dt;
            let position = match axis {
                Axis::X => Position::new(t, 0.0, 0.0),
                Axis::Y => Position::new(0.0, t, 0.0),
                Axis::Z => Position::new(0.0, 0.0, t),
            };
            let weight = if step == 0 || step == LINE_INTEGRAL_STEPS {
                0.5
            } else {
                1.0
            };
            sum += weight * self.density(&position);
        }
        sum * dt
    }
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

fn axis_column(extent: &Box3, rho: &f64, axis: Axis) -> f64 {
    let crosses = match axis {
        Axis::X => {
            extent.ymin() <= 0.0 && extent.ymax() >= 0.0 && extent.zmin() <= 0.0 && extent.zmax() >= 0.0
        }
        Axis::Y => {
            extent.xmin() <= 0.0 && extent.xmax() >= 0.0 && extent.zmin() <= 0.0 && extent.zmax() >= 0.0
        }
        Axis::Z => {
            extent.xmin() <= 0.0 && extent.xmax() >= 0.0 && extent.ymin() <= 0.0 && extent.ymax() >= 0.0
        }
    };
    if !crosses {
        return 0.0;
    }
    let (dx, dy, dz) = extent.widths();
    match axis {
        Axis::X => rho * dx,
        Axis::Y => rho * dy,
        Axis::Z => rho * dz,
    }
}

fn on_axis(extent: &Box3, axis: Axis) -> bool {
    match axis {
        Axis::X => {
            extent.ymin() <= 0.0 && extent.ymax() >= 0.0 && extent.zmin() <= 0.0 && extent.zmax() >= 0.0
        }
        Axis::Y => {
            extent.xmin() <= 0.0 && extent.xmax() >= 0.0 && extent.zmin() <= 0.0 && extent.zmax() >= 0.0
        }
        Axis::Z => {
            extent.xmin() <= 0.0 && extent.xmax() >= 0.0 && extent.ymin() <= 0.0 && extent.ymax() >= 0.0
        }
    }
}

fn pixel_index(x: f64, y: f64, nx: usize, ny: usize, pixel_size: f64) -> Option<(usize, usize)> {
    let i = (x / pixel_size + nx as f64 / 2.0).floor();
    let j = (y / pixel_size + ny as f64 / 2.0).floor();
    if i < 0.0 || j < 0.0 || i >= nx as f64 || j >= ny as f64 {
        return None;
    }
    Some((i as usize, j as usize))
}

fn nearest_site(sites: &[Site], position: &Position) -> usize {
    let mut best = 0;
    let mut best_d2 = f64::INFINITY;
    for (index, site) in sites.iter().enumerate() {
        let d2 = (*position - site.position).norm_squared();
        if d2 < best_d2 {
            best_d2 = d2;
            best = index;
        }
    }
    best
}

fn particle_extent(particles: &[Particle]) -> Box3 {
    let mut extent = Box3::new(
        f64::INFINITY,
        f64::INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
        f64::NEG_INFINITY,
    );
    for p in particles {
        let (x, y, z) = p.position.cartesian();
        extent = Box3::new(
            extent.xmin().min(x - p.h),
            extent.ymin().min(y - p.h),
            extent.zmin().min(z - p.h),
            extent.xmax().max(x + p.h),
            extent.ymax().max(y + p.h),
            extent.zmax().max(z + p.h),
        );
    }
    extent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_box_density_and_columns() {
        let geometry = GenGeometry::uniform_box(Box3::new(-1.0, -2.0, -0.5, 1.0, 2.0, 0.5)).unwrap();
        let rho = 1.0 / 8.0;
        assert_eq!(geometry.density(&Position::origin()), rho);
        assert_eq!(geometry.density(&Position::new(0.0, 3.0, 0.0)), 0.0);
        assert!((geometry.sigma_x() - rho * 2.0).abs() < 1e-12);
        assert!((geometry.sigma_z() - rho * 1.0).abs() < 1e-12);
    }

    #[test]
    fn particle_cloud_mass_concentrates_at_particles() {
        let particles = vec![
            Particle {
                position: Position::new(-1.0, 0.0, 0.0),
                h: 0.5,
                mass: 1.0,
            },
            Particle {
                position: Position::new(1.0, 0.0, 0.0),
                h: 0.5,
                mass: 3.0,
            },
        ];
        let geometry =
            GenGeometry::particle_cloud(particles, SmoothingKernel::cubic_spline()).unwrap();
        let mut random = Random::default();
        let mut right = 0;
        let n = 4000;
        for _ in 0..n {
            if geometry.generate_position(&mut random).x() > 0.0 {
                right += 1;
            }
        }
        let fraction = right as f64 / n as f64;
        assert!((fraction - 0.75).abs() < 0.03, "right fraction {fraction}");
    }

    #[test]
    fn adaptive_mesh_columns_are_exact() {
        let cells = vec![
            MeshCell {
                extent: Box3::new(-1.0, -1.0, -1.0, 0.0, 1.0, 1.0),
                density: 1.0,
            },
            MeshCell {
                extent: Box3::new(0.0, -1.0, -1.0, 1.0, 1.0, 1.0),
                density: 3.0,
            },
        ];
        let geometry = GenGeometry::adaptive_mesh(cells).unwrap();
        // total mass: 1*2 + 3*2 = 8, so densities become 1/8 and 3/8
        assert!((geometry.density(&Position::new(-0.5, 0.0, 0.0)) - 0.125).abs() < 1e-12);
        assert!((geometry.sigma_x() - (0.125 + 0.375)).abs() < 1e-12);
    }

    #[test]
    fn voronoi_cells_share_the_box() {
        let mut random = Random::default();
        let sites = vec![
            Site {
                position: Position::new(-0.5, 0.0, 0.0),
                mass: 1.0,
            },
            Site {
                position: Position::new(0.5, 0.0, 0.0),
                mass: 1.0,
            },
        ];
        let extent = Box3::cube(1.0);
        let geometry = GenGeometry::voronoi_cloud(sites, extent, &mut random).unwrap();
        // each cell holds half the box volume, so both densities are 1/8
        let rho = geometry.density(&Position::new(-0.5, 0.0, 0.0));
        assert!((rho - 0.125).abs() < 0.01, "site density {rho}");
    }
}
