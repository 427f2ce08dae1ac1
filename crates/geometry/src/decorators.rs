//! Geometry decorators
//!
//! A decorator owns an inner geometry and modifies its density field:
//! shifting it, flattening it, redistributing mass into clumps, imprinting
//! spiral arms, carving cavities, cropping, or combining two components.
//! Decorators that remove mass renormalise by a Monte Carlo estimate of
//! the removed fraction at construction time and fail when more than 99%
//! of the mass would disappear.

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::kernel::SmoothingKernel;
use crate::special::gamma;
use crate::sphe::{positive, SpheGeometry};
use dustrt_numeric::{Position, Random, Vec3};
use log::warn;
use std::f64::consts::PI;

// rejection budget shared by the decorator samplers
const MAX_REJECTION_TRIES: usize = 100_000;
// resolution of the axis-segment corrections to the surface densities
const SEGMENT_STEPS: usize = 512;
// sample count for Monte Carlo removed-mass estimates
const CAVITY_SAMPLES: usize = 1000;

/// Shifts the inner geometry by a fixed offset
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) offset: Vec3,
}

impl OffsetDecorator {
    /// Wrap a geometry shifted by `(dx, dy, dz)`
    pub fn new(inner: Geometry, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            inner: Box::new(inner),
            offset: Vec3::new(dx, dy, dz),
        }
    }

    pub(crate) fn dimension(&self) -> u8 {
        let required = if self.offset.x != 0.0 || self.offset.y != 0.0 {
            3
        } else if self.offset.z != 0.0 {
            2
        } else {
            1
        };
        self.inner.dimension().max(required)
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        self.inner
            .density(&Position::from_vec(position.to_vec() - self.offset))
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        self.inner.generate_position(random) + self.offset
    }
}

/// Flattens a spherically symmetric inner geometry into a spheroid
#[derive(Debug, Clone, PartialEq)]
pub struct SpheroidalDecorator {
    pub(crate) inner: SpheGeometry,
    pub(crate) q: f64,
}

impl SpheroidalDecorator {
    /// Wrap a spherical geometry with flattening `q` in `(0, 1]`
    pub fn new(inner: SpheGeometry, q: f64) -> Result<Self> {
        crate::sepax::flattening("SpheroidalDecorator", q)?;
        Ok(Self { inner, q })
    }

    pub(crate) fn density_rz(&self, big_r: f64, z: f64) -> f64 {
        let m = (big_r * big_r + z * z / (self.q * self.q)).sqrt();
        self.inner.density_r(m) / self.q
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        let radius = self.inner.sample_radius(random);
        let position = Position::from_radius_direction(radius, &random.direction());
        let (x, y, z) = position.cartesian();
        Position::new(x, y, self.q * z)
    }

    pub(crate) fn sigma_r(&self) -> f64 {
        self.inner.sigma_r() / self.q
    }

    pub(crate) fn sigma_z(&self) -> f64 {
        2.0 * self.inner.sigma_r()
    }
}

/// Redistributes part of the inner mass into kernel-smoothed clumps
#[derive(Debug, Clone, PartialEq)]
pub struct ClumpyDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) fraction: f64,
    pub(crate) clump_radius: f64,
    pub(crate) cutoff: bool,
    pub(crate) kernel: SmoothingKernel,
    // clump centres sorted by x-coordinate, for windowed density sums
    pub(crate) clumps: Vec<Position>,
}

impl ClumpyDecorator {
    /// Wrap a geometry, moving `fraction` of the mass into `n_clumps`
    /// clumps of scale `clump_radius`
    ///
    /// The clump positions are drawn from the inner density during
    /// construction. With `cutoff` set, clump material outside the smooth
    /// support is rejected.
    pub fn new(
        inner: Geometry,
        fraction: f64,
        n_clumps: usize,
        clump_radius: f64,
        cutoff: bool,
        kernel: SmoothingKernel,
        random: &mut Random,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::ParameterOutOfRange {
                component: "ClumpyDecorator",
                parameter: "fraction",
                value: fraction,
                lower: 0.0,
                upper: 1.0,
            });
        }
        if n_clumps == 0 {
            return Err(Error::EmptyInput {
                component: "ClumpyDecorator",
                element: "clump",
            });
        }
        positive("ClumpyDecorator", "clump_radius", clump_radius)?;

        let mut clumps: Vec<Position> =
            (0..n_clumps).map(|_| inner.generate_position(random)).collect();
        clumps.sort_by(|a, b| a.x().total_cmp(&b.x()));

        Ok(Self {
            inner: Box::new(inner),
            fraction,
            clump_radius,
            cutoff,
            kernel,
            clumps,
        })
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        let rho_smooth = (1.0 - self.fraction) * self.inner.density(position);
        if self.cutoff && rho_smooth == 0.0 {
            // no clumps outside the smooth support
            return 0.0;
        }

        let h = self.clump_radius;
        let clump_mass = self.fraction / self.clumps.len() as f64;

        // only clumps within one smoothing length in x can contribute
        let start = self
            .clumps
            .partition_point(|c| c.x() < position.x() - h);
        let mut rho_clumpy = 0.0;
        for clump in &self.clumps[start..] {
            if clump.x() > position.x() + h {
                break;
            }
            let u = (*position - *clump).norm() / h;
            rho_clumpy += clump_mass * self.kernel.density(u) / h.powi(3);
        }

        rho_smooth + rho_clumpy
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        for _ in 0..MAX_REJECTION_TRIES {
            let x = random.uniform();
            if x > self.fraction {
                return self.inner.generate_position(random);
            }
            let index =
                (((x / self.fraction) * self.clumps.len() as f64) as usize).min(self.clumps.len() - 1);
            let u = self.kernel.generate_radius(random);
            let direction = random.direction();
            let candidate = self.clumps[index].shifted(&direction, u * self.clump_radius);
            if !self.cutoff || self.inner.density(&candidate) > 0.0 {
                return candidate;
            }
        }
        warn!("clumpy position sampler exhausted its rejection budget");
        self.inner.generate_position(random)
    }
}

/// Imprints a logarithmic spiral-arm perturbation on an axisymmetric inner
#[derive(Debug, Clone, PartialEq)]
pub struct SpiralArmDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) arms: u32,
    pub(crate) pitch: f64,
    pub(crate) radius: f64,
    pub(crate) phase: f64,
    pub(crate) weight: f64,
    pub(crate) index: u32,
    tan_pitch: f64,
    c_n: f64,
    c_max: f64,
}

impl SpiralArmDecorator {
    /// Wrap an axisymmetric geometry with an `arms`-armed perturbation
    ///
    /// The perturbation is `1 - w + w C_N sin^(2N)(m/2 (gamma - phi))`
    /// with `C_N = sqrt(pi) Gamma(N+1) / Gamma(N+1/2)` keeping the
    /// azimuthal average equal to one.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        inner: Geometry,
        arms: u32,
        pitch: f64,
        radius: f64,
        phase: f64,
        weight: f64,
        index: u32,
    ) -> Result<Self> {
        if arms == 0 {
            return Err(Error::InvalidConfiguration {
                component: "SpiralArmDecorator",
                requirement: "at least one spiral arm",
            });
        }
        if pitch <= 0.0 || pitch >= PI / 2.0 {
            return Err(Error::ParameterOutOfRange {
                component: "SpiralArmDecorator",
                parameter: "pitch",
                value: pitch,
                lower: 0.0,
                upper: PI / 2.0,
            });
        }
        positive("SpiralArmDecorator", "radius", radius)?;
        if !(0.0..=1.0).contains(&weight) || weight == 0.0 {
            return Err(Error::ParameterOutOfRange {
                component: "SpiralArmDecorator",
                parameter: "weight",
                value: weight,
                lower: 0.0,
                upper: 1.0,
            });
        }
        if inner.dimension() > 2 {
            return Err(Error::InvalidConfiguration {
                component: "SpiralArmDecorator",
                requirement: "an axisymmetric inner geometry",
            });
        }

        let n = index as f64;
        let c_n = PI.sqrt() * gamma(n + 1.0) / gamma(n + 0.5);
        Ok(Self {
            inner: Box::new(inner),
            arms,
            pitch,
            radius,
            phase,
            weight,
            index,
            tan_pitch: pitch.tan(),
            c_n,
            c_max: 1.0 + (c_n - 1.0) * weight,
        })
    }

    fn perturbation(&self, big_r: f64, phi: f64) -> f64 {
        let m = self.arms as f64;
        let gamma_angle = (big_r / self.radius).ln() / self.tan_pitch
            + self.phase
            + PI / (2.0 * m);
        let s = (0.5 * m * (gamma_angle - phi)).sin();
        1.0 - self.weight + self.weight * self.c_n * s.powi(2 * self.index as i32)
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        let (big_r, phi, _) = position.cylindrical();
        if big_r == 0.0 {
            return self.inner.density(position);
        }
        self.inner.density(position) * self.perturbation(big_r, phi)
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        // rejection against the maximum of the azimuthal perturbation
        for _ in 0..MAX_REJECTION_TRIES {
            let candidate = self.inner.generate_position(random);
            let (big_r, phi, _) = candidate.cylindrical();
            if big_r == 0.0 {
                return candidate;
            }
            if random.uniform() * self.c_max <= self.perturbation(big_r, phi) {
                return candidate;
            }
        }
        warn!("spiral-arm position sampler exhausted its rejection budget");
        self.inner.generate_position(random)
    }
}

/// Carves an axial cylindrical cavity out of the inner geometry
#[derive(Debug, Clone, PartialEq)]
pub struct CylindricalCavityDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) radius: f64,
    pub(crate) norm: f64,
}

impl CylindricalCavityDecorator {
    /// Wrap a geometry, zeroing the density inside a cylinder around the
    /// z-axis and renormalising the remainder
    ///
    /// The removed mass fraction is estimated by Monte Carlo integration
    /// over a stack of cylinder slabs, extended until the added mass
    /// converges to 2%.
    pub fn new(inner: Geometry, radius: f64, random: &mut Random) -> Result<Self> {
        positive("CylindricalCavityDecorator", "radius", radius)?;

        // mass inside a slab of total height `radius` centred at height i*radius
        let slab_volume = PI * radius * radius * radius;
        let slab_mass = |inner: &Geometry, random: &mut Random, level: f64| {
            let mut mass = 0.0;
            for _ in 0..CAVITY_SAMPLES {
                let r = radius * random.uniform().sqrt();
                let phi = 2.0 * PI * random.uniform();
                let z = (level + random.uniform() - 0.5) * radius;
                mass += inner.density(&Position::from_cylindrical(r, phi, z));
            }
            mass / CAVITY_SAMPLES as f64 * slab_volume
        };

        let mut removed = slab_mass(&inner, random, 0.0);
        for level in 1..=200 {
            let delta = slab_mass(&inner, random, level as f64)
                + slab_mass(&inner, random, -(level as f64));
            removed += delta;
            if delta < 0.02 * removed {
                break;
            }
        }

        if removed > 0.99 {
            return Err(Error::RemovesTooMuchMass("CylindricalCavity"));
        }

        Ok(Self {
            inner: Box::new(inner),
            radius,
            norm: 1.0 / (1.0 - removed),
        })
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        if position.cyl_radius() < self.radius {
            return 0.0;
        }
        self.norm * self.inner.density(position)
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        reject_inside(&self.inner, random, |p| p.cyl_radius() < self.radius)
    }
}

/// Carves a spherical cavity out of the inner geometry
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalCavityDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) center: Position,
    pub(crate) radius: f64,
    pub(crate) norm: f64,
}

impl SphericalCavityDecorator {
    /// Wrap a geometry, zeroing the density inside a sphere and
    /// renormalising the remainder
    pub fn new(inner: Geometry, center: Position, radius: f64, random: &mut Random) -> Result<Self> {
        positive("SphericalCavityDecorator", "radius", radius)?;
        let removed = sphere_mass(&inner, &center, radius, random);
        if removed > 0.99 {
            return Err(Error::RemovesTooMuchMass("SphericalCavity"));
        }
        Ok(Self {
            inner: Box::new(inner),
            center,
            radius,
            norm: 1.0 / (1.0 - removed),
        })
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        if (*position - self.center).norm_squared() <= self.radius * self.radius {
            return 0.0;
        }
        self.norm * self.inner.density(position)
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        let (center, r2) = (self.center, self.radius * self.radius);
        reject_inside(&self.inner, random, move |p| {
            (*p - center).norm_squared() <= r2
        })
    }
}

/// Crops the inner geometry to a sphere around a centre
#[derive(Debug, Clone, PartialEq)]
pub struct SphereCropDecorator {
    pub(crate) inner: Box<Geometry>,
    pub(crate) center: Position,
    pub(crate) radius: f64,
    pub(crate) norm: f64,
}

impl SphereCropDecorator {
    /// Wrap a geometry, keeping only the mass inside the crop sphere
    ///
    /// Fails when the crop would remove more than 99% of the mass.
    pub fn new(inner: Geometry, center: Position, radius: f64, random: &mut Random) -> Result<Self> {
        positive("SphereCropDecorator", "radius", radius)?;
        let kept = sphere_mass(&inner, &center, radius, random);
        if kept < 0.01 {
            return Err(Error::RemovesTooMuchMass("SphereCrop"));
        }
        Ok(Self {
            inner: Box::new(inner),
            center,
            radius,
            norm: 1.0 / kept,
        })
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        if (*position - self.center).norm_squared() > self.radius * self.radius {
            return 0.0;
        }
        self.norm * self.inner.density(position)
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        let (center, r2) = (self.center, self.radius * self.radius);
        reject_inside(&self.inner, random, move |p| {
            (*p - center).norm_squared() > r2
        })
    }
}

/// A weighted sum of two component geometries
#[derive(Debug, Clone, PartialEq)]
pub struct CombineDecorator {
    pub(crate) first: Box<Geometry>,
    pub(crate) second: Box<Geometry>,
    pub(crate) w1: f64,
    pub(crate) w2: f64,
}

impl CombineDecorator {
    /// Combine two geometries; the weights are renormalised to sum to one
    pub fn new(first: Geometry, w1: f64, second: Geometry, w2: f64) -> Result<Self> {
        positive("CombineDecorator", "w1", w1)?;
        positive("CombineDecorator", "w2", w2)?;
        let sum = w1 + w2;
        Ok(Self {
            first: Box::new(first),
            second: Box::new(second),
            w1: w1 / sum,
            w2: w2 / sum,
        })
    }

    pub(crate) fn density(&self, position: &Position) -> f64 {
        self.w1 * self.first.density(position) + self.w2 * self.second.density(position)
    }

    pub(crate) fn generate_position(&self, random: &mut Random) -> Position {
        if random.uniform() < self.w1 {
            self.first.generate_position(random)
        } else {
            self.second.generate_position(random)
        }
    }
}

// Monte Carlo estimate of the inner mass inside a sphere
fn sphere_mass(inner: &Geometry, center: &Position, radius: f64, random: &mut Random) -> f64 {
    let mut rho = 0.0;
    for _ in 0..CAVITY_SAMPLES {
        let r = radius * random.uniform().cbrt();
        let sample = Position::from_vec(center.to_vec() + r * random.direction().to_vec());
        rho += inner.density(&sample);
    }
    rho /= CAVITY_SAMPLES as f64;
    rho * 4.0 / 3.0 * PI * radius * radius * radius
}

// draw positions from the inner geometry until the predicate rejects
fn reject_inside(
    inner: &Geometry,
    random: &mut Random,
    rejected: impl Fn(&Position) -> bool,
) -> Position {
    for _ in 0..MAX_REJECTION_TRIES {
        let candidate = inner.generate_position(random);
        if !rejected(&candidate) {
            return candidate;
        }
    }
    warn!("cavity position sampler exhausted its rejection budget");
    inner.generate_position(random)
}

// trapezoidal integral of a scalar function over [a, b]
pub(crate) fn segment_integral(f: impl Fn(f64) -> f64, a: f64, b: f64) -> f64 {
    if b <= a {
        return 0.0;
    }
    let dt = (b - a) / SEGMENT_STEPS as f64;
    let mut sum = 0.5 * (f(a) + f(b));
    for step in 1..SEGMENT_STEPS {
        sum += f(a + step as f64 * dt);
    }
    sum * dt
}
