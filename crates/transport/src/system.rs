//! Dust components and the gridded dust system
//!
//! A [`DustComp`] binds a geometry, a dust mixture and a normalization
//! rule into a mass-scaled component whose density is the geometry's
//! unit-mass density times the normalization factor. The [`DustSystem`]
//! discretises the combined components onto a dust grid, holding the
//! frozen per-cell densities and the mutable absorbed-energy
//! accumulators that the photon loop writes into.

use crate::error::{Error, Result};
use dustrt_dust::DustMix;
use dustrt_geometry::Geometry;
use dustrt_grid::DustGrid;
use dustrt_numeric::{Position, Random};

/// The normalization rules turning a unit-mass geometry into a
/// mass-scaled dust component
///
/// The τ-based rules divide the requested optical depth by the relevant
/// surface density times the extinction opacity at the reference
/// wavelength; rules demanding symmetry the geometry cannot provide fail
/// at setup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Fix the total dust mass in kg
    DustMass(f64),
    /// Fix the face-on optical depth at a wavelength (axisymmetric only)
    FaceOnOpticalDepth { tau: f64, lambda: f64 },
    /// Fix the edge-on optical depth at a wavelength (axisymmetric only)
    EdgeOnOpticalDepth { tau: f64, lambda: f64 },
    /// Fix the radial optical depth at a wavelength (spherical only)
    RadialOpticalDepth { tau: f64, lambda: f64 },
    /// Fix the optical depth along the X axis at a wavelength
    XOpticalDepth { tau: f64, lambda: f64 },
    /// Fix the optical depth along the Y axis at a wavelength
    YOpticalDepth { tau: f64, lambda: f64 },
    /// Fix the optical depth along the Z axis at a wavelength
    ZOpticalDepth { tau: f64, lambda: f64 },
}

impl Normalization {
    /// The multiplier on the geometry's unit-mass density
    pub fn factor(&self, geometry: &Geometry, mix: &DustMix) -> Result<f64> {
        match *self {
            Self::DustMass(mass) => {
                if mass <= 0.0 {
                    return Err(Error::NonPositiveParameter {
                        component: "Normalization",
                        parameter: "dust mass",
                        value: mass,
                    });
                }
                Ok(mass)
            }
            Self::FaceOnOpticalDepth { tau, lambda } => {
                if geometry.dimension() > 2 {
                    return Err(Error::IncompatibleNormalization {
                        rule: "face-on optical depth",
                        requirement: "an axisymmetric geometry",
                        dimension: geometry.dimension(),
                    });
                }
                tau_factor("face-on optical depth", tau, geometry.sigma_z(), mix, lambda)
            }
            Self::EdgeOnOpticalDepth { tau, lambda } => {
                let sigma = geometry.sigma_cyl_r().ok_or(Error::IncompatibleNormalization {
                    rule: "edge-on optical depth",
                    requirement: "an axisymmetric geometry",
                    dimension: geometry.dimension(),
                })?;
                tau_factor("edge-on optical depth", tau, sigma, mix, lambda)
            }
            Self::RadialOpticalDepth { tau, lambda } => {
                let sigma = geometry.sigma_r().ok_or(Error::IncompatibleNormalization {
                    rule: "radial optical depth",
                    requirement: "a spherically symmetric geometry",
                    dimension: geometry.dimension(),
                })?;
                tau_factor("radial optical depth", tau, sigma, mix, lambda)
            }
            Self::XOpticalDepth { tau, lambda } => {
                tau_factor("X optical depth", tau, geometry.sigma_x(), mix, lambda)
            }
            Self::YOpticalDepth { tau, lambda } => {
                tau_factor("Y optical depth", tau, geometry.sigma_y(), mix, lambda)
            }
            Self::ZOpticalDepth { tau, lambda } => {
                tau_factor("Z optical depth", tau, geometry.sigma_z(), mix, lambda)
            }
        }
    }
}

fn tau_factor(
    rule: &'static str,
    tau: f64,
    sigma: f64,
    mix: &DustMix,
    lambda: f64,
) -> Result<f64> {
    if tau <= 0.0 {
        return Err(Error::NonPositiveParameter {
            component: "Normalization",
            parameter: "tau",
            value: tau,
        });
    }
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(Error::DegenerateSurfaceDensity { rule, value: sigma });
    }
    Ok(tau / (sigma * mix.kappa_ext_at(lambda)?))
}

/// A mass-scaled dust component
#[derive(Debug, Clone)]
pub struct DustComp {
    geometry: Geometry,
    mix: DustMix,
    normalization: Normalization,
    nf: f64,
}

impl DustComp {
    /// Bind a geometry, a mixture and a normalization rule
    pub fn new(geometry: Geometry, mix: DustMix, normalization: Normalization) -> Result<Self> {
        let nf = normalization.factor(&geometry, &mix)?;
        Ok(Self {
            geometry,
            mix,
            normalization,
            nf,
        })
    }

    /// The underlying unit-mass geometry
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The dust mixture of the component
    pub fn mix(&self) -> &DustMix {
        &self.mix
    }

    /// The normalization rule the component was scaled with
    pub fn normalization(&self) -> &Normalization {
        &self.normalization
    }

    /// The mass density at a position, in kg/m^3
    pub fn density(&self, position: &Position) -> f64 {
        self.nf * self.geometry.density(position)
    }

    /// The total dust mass of the component
    pub fn mass(&self) -> f64 {
        self.nf
    }

    /// The X-axis surface density, mass-scaled
    pub fn sigma_x(&self) -> f64 {
        self.nf * self.geometry.sigma_x()
    }

    /// The Y-axis surface density, mass-scaled
    pub fn sigma_y(&self) -> f64 {
        self.nf * self.geometry.sigma_y()
    }

    /// The Z-axis surface density, mass-scaled
    pub fn sigma_z(&self) -> f64 {
        self.nf * self.geometry.sigma_z()
    }
}

/// The dust medium discretised on a spatial grid
///
/// Per-cell densities are sampled at setup and frozen; the absorbed
/// luminosity table indexed `(cell, wavelength)` is the only mutable
/// state, written by the photon loop through [`DustSystem::absorb`] (or
/// merged from per-worker shadow tables).
#[derive(Debug, Clone)]
pub struct DustSystem {
    grid: DustGrid,
    comps: Vec<DustComp>,
    n_lambda: usize,
    // densities indexed (cell, comp)
    rhovv: Vec<f64>,
    // absorbed luminosity indexed (cell, ell)
    absorbed: Vec<f64>,
}

impl DustSystem {
    /// Discretise the components on a grid
    ///
    /// Every cell's density is the average of the component densities
    /// over `samples_per_cell` random in-cell positions, scaled by the
    /// grid's two-phase weight where applicable.
    pub fn new(
        grid: DustGrid,
        comps: Vec<DustComp>,
        samples_per_cell: usize,
        random: &mut Random,
    ) -> Result<Self> {
        if comps.is_empty() {
            return Err(Error::NoComponents);
        }
        if samples_per_cell == 0 {
            return Err(Error::InvalidConfiguration {
                component: "DustSystem",
                requirement: "at least one density sample per cell",
            });
        }
        let n_lambda = comps[0].mix().wavelength_grid().n_lambda();
        for comp in &comps {
            if comp.mix().wavelength_grid().n_lambda() != n_lambda {
                return Err(Error::InvalidConfiguration {
                    component: "DustSystem",
                    requirement: "all components to share the simulation wavelength grid",
                });
            }
        }

        let n_cells = grid.n_cells();
        let n_comps = comps.len();
        let mut rhovv = vec![0.0; n_cells * n_comps];
        for m in 0..n_cells {
            for _ in 0..samples_per_cell {
                let position = grid.random_position(m, random)?;
                for (h, comp) in comps.iter().enumerate() {
                    rhovv[m * n_comps + h] += comp.density(&position);
                }
            }
            let weight = grid.weight(m) / samples_per_cell as f64;
            for h in 0..n_comps {
                rhovv[m * n_comps + h] *= weight;
            }
        }

        Ok(Self {
            grid,
            comps,
            n_lambda,
            rhovv,
            absorbed: vec![0.0; n_cells * n_lambda],
        })
    }

    /// The spatial grid of the system
    pub fn grid(&self) -> &DustGrid {
        &self.grid
    }

    /// The dust components of the system
    pub fn comps(&self) -> &[DustComp] {
        &self.comps
    }

    /// The number of cells
    pub fn n_cells(&self) -> usize {
        self.grid.n_cells()
    }

    /// The number of wavelengths
    pub fn n_lambda(&self) -> usize {
        self.n_lambda
    }

    /// The frozen mass density of component `h` in cell `m`
    pub fn density_comp(&self, m: usize, h: usize) -> f64 {
        self.rhovv[m * self.comps.len() + h]
    }

    /// The total frozen mass density in cell `m`
    pub fn density(&self, m: usize) -> f64 {
        let n_comps = self.comps.len();
        self.rhovv[m * n_comps..(m + 1) * n_comps].iter().sum()
    }

    /// The total dust mass of the discretised medium
    pub fn dust_mass(&self) -> f64 {
        (0..self.n_cells())
            .map(|m| self.density(m) * self.grid.volume(m))
            .sum()
    }

    /// The extinction opacity per unit length in cell `m`
    pub fn opacity_ext(&self, ell: usize, m: usize) -> f64 {
        self.comps
            .iter()
            .enumerate()
            .map(|(h, comp)| self.density_comp(m, h) * comp.mix().kappa_ext(ell))
            .sum()
    }

    /// The scattering albedo of the medium in cell `m`
    pub fn albedo(&self, ell: usize, m: usize) -> f64 {
        let mut sca = 0.0;
        let mut ext = 0.0;
        for (h, comp) in self.comps.iter().enumerate() {
            let rho = self.density_comp(m, h);
            sca += rho * comp.mix().kappa_sca(ell);
            ext += rho * comp.mix().kappa_ext(ell);
        }
        if ext > 0.0 {
            sca / ext
        } else {
            0.0
        }
    }

    /// Pick the mixture responsible for a scattering event in cell `m`
    ///
    /// Components are weighted by their scattering opacity in the cell.
    pub fn scattering_mix(&self, ell: usize, m: usize, random: &mut Random) -> &DustMix {
        if self.comps.len() == 1 {
            return self.comps[0].mix();
        }
        let weights: Vec<f64> = self
            .comps
            .iter()
            .enumerate()
            .map(|(h, comp)| self.density_comp(m, h) * comp.mix().kappa_sca(ell))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return self.comps[0].mix();
        }
        let mut pick = random.uniform() * total;
        for (h, weight) in weights.iter().enumerate() {
            pick -= weight;
            if pick <= 0.0 {
                return self.comps[h].mix();
            }
        }
        self.comps.last().expect("checked non-empty").mix()
    }

    /// Deposit absorbed luminosity into a cell's wavelength bin
    pub fn absorb(&mut self, m: usize, ell: usize, luminosity: f64) {
        self.absorbed[m * self.n_lambda + ell] += luminosity;
    }

    /// The absorbed luminosity accumulated in `(cell, wavelength)`
    pub fn absorbed_luminosity(&self, m: usize, ell: usize) -> f64 {
        self.absorbed[m * self.n_lambda + ell]
    }

    /// The absorbed luminosity summed over wavelengths for a cell
    pub fn absorbed_luminosity_cell(&self, m: usize) -> f64 {
        self.absorbed[m * self.n_lambda..(m + 1) * self.n_lambda]
            .iter()
            .sum()
    }

    /// A zeroed shadow table for a worker's absorption bookkeeping
    pub fn shadow_absorption(&self) -> Vec<f64> {
        vec![0.0; self.absorbed.len()]
    }

    /// Merge a worker's shadow table into the global accumulator
    pub fn merge_absorption(&mut self, shadow: &[f64]) {
        for (total, delta) in self.absorbed.iter_mut().zip(shadow) {
            *total += delta;
        }
    }

    /// Reset the absorption accumulators between phases
    pub fn clear_absorption(&mut self) {
        self.absorbed.iter_mut().for_each(|value| *value = 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustrt_dust::{MixtureBuilder, WavelengthGrid};
    use dustrt_geometry::SpheGeometry;
    use dustrt_grid::Sphere1DGrid;

    fn gray_mix(grid: &WavelengthGrid) -> DustMix {
        let n = grid.n_lambda();
        let mut builder = MixtureBuilder::new(grid);
        builder
            .add_population("gray", 1e-29, vec![1e-25; n], vec![1e-25; n], vec![0.0; n])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn dust_mass_normalization_recovers_the_mass() {
        let wavelengths = WavelengthGrid::new(vec![1e-6]).unwrap();
        let mix = gray_mix(&wavelengths);
        let geometry = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let comp = DustComp::new(geometry, mix, Normalization::DustMass(5.0)).unwrap();
        assert_eq!(comp.mass(), 5.0);
        // the density scales accordingly
        let origin = Position::origin();
        let unit = comp.geometry().density(&origin);
        assert!((comp.density(&origin) - 5.0 * unit).abs() < 1e-12);
    }

    #[test]
    fn radial_tau_normalization_requires_spherical_symmetry() {
        let wavelengths = WavelengthGrid::new(vec![1e-6]).unwrap();
        let mix = gray_mix(&wavelengths);
        let geometry = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let rule = Normalization::RadialOpticalDepth {
            tau: 1.0,
            lambda: 1e-6,
        };
        let comp = DustComp::new(geometry, mix.clone(), rule).unwrap();
        // by construction the radial optical depth comes out at tau
        let sigma = comp.geometry().sigma_r().unwrap();
        let tau = comp.mass() * sigma * mix.kappa_ext(0);
        assert!((tau - 1.0).abs() < 1e-12);

        // a fully 3-D geometry is rejected
        let boxy = Geometry::Gen(
            dustrt_geometry::GenGeometry::uniform_box(dustrt_numeric::Box3::cube(1.0)).unwrap(),
        );
        assert!(DustComp::new(boxy, mix, rule).is_err());
    }

    #[test]
    fn system_densities_reproduce_the_component() {
        let wavelengths = WavelengthGrid::new(vec![1e-6]).unwrap();
        let mix = gray_mix(&wavelengths);
        let geometry = Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap());
        let comp = DustComp::new(geometry, mix, Normalization::DustMass(2.0)).unwrap();
        let grid = DustGrid::Sphere1D(
            Sphere1DGrid::new(dustrt_numeric::lin_grid(0.0, 8.0, 65).unwrap()).unwrap(),
        );

        let mut random = Random::default();
        let system = DustSystem::new(grid, vec![comp], 64, &mut random).unwrap();
        // most of the Plummer mass lies within the gridded sphere
        let mass = system.dust_mass();
        assert!((mass / 2.0 - 1.0).abs() < 0.1, "discretised mass {mass}");
    }
}
