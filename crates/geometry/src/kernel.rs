//! Smoothing kernels for clump and particle densities
//!
//! A kernel is a spherically symmetric profile `w(u)` on `0 <= u <= 1`
//! that integrates to one over the unit sphere. Besides the profile value
//! it must support drawing a random normalised radius, which is done by
//! inverting a tabulated cumulative mass distribution.

use crate::error::{Error, Result};
use dustrt_numeric::{locate_clip, Random};
use std::f64::consts::PI;

/// The smoothing kernel variants used by clumpy and particle geometries
#[derive(Debug, Clone, PartialEq)]
pub enum SmoothingKernel {
    /// The standard SPH cubic spline
    CubicSpline {
        /// Tabulated cumulative mass at 400 equidistant radii
        cumulative: Vec<f64>,
    },
    /// A uniform (top-hat) sphere
    Uniform,
}

impl SmoothingKernel {
    /// Initialise the cubic spline kernel with its tabulated mass profile
    pub fn cubic_spline() -> Self {
        const N_U: usize = 400;
        let du = 1.0 / N_U as f64;
        let cumulative = (0..=N_U)
            .map(|k| {
                let u = k as f64 * du;
                let u2 = u * u;
                let u3 = u * u2;
                if u < 0.5 {
                    u3 * (32.0 / 3.0 - 192.0 / 5.0 * u2 + 32.0 * u3)
                } else {
                    -1.0 / 15.0 - 64.0 * u3 * (-1.0 / 3.0 + 0.75 * u - 0.6 * u2 + u3 / 6.0)
                }
            })
            .collect();
        Self::CubicSpline { cumulative }
    }

    /// Initialise the uniform sphere kernel
    pub fn uniform() -> Self {
        Self::Uniform
    }

    /// The kernel profile at normalised radius `u`
    ///
    /// Zero outside `[0, 1]`; the profile integrates to one over the unit
    /// sphere.
    pub fn density(&self, u: f64) -> f64 {
        if !(0.0..=1.0).contains(&u) {
            return 0.0;
        }
        match self {
            Self::CubicSpline { .. } => {
                if u < 0.5 {
                    8.0 / PI * (1.0 - 6.0 * u * u * (1.0 - u))
                } else {
                    8.0 / PI * 2.0 * (1.0 - u).powi(3)
                }
            }
            Self::Uniform => 3.0 / (4.0 * PI),
        }
    }

    /// Draw a normalised radius from the kernel's mass distribution
    pub fn generate_radius(&self, random: &mut Random) -> f64 {
        match self {
            Self::CubicSpline { cumulative } => {
                let x_uniform = random.uniform();
                let k = locate_clip(cumulative, x_uniform);
                let p = (x_uniform - cumulative[k]) / (cumulative[k + 1] - cumulative[k]);
                (k as f64 + p) / (cumulative.len() - 1) as f64
            }
            Self::Uniform => random.uniform().cbrt(),
        }
    }

    /// Parse a kernel name as used in configuration records
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "cubic-spline" => Ok(Self::cubic_spline()),
            "uniform" => Ok(Self::uniform()),
            _ => Err(Error::InvalidConfiguration {
                component: "SmoothingKernel",
                requirement: "a tag of \"cubic-spline\" or \"uniform\"",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernels_integrate_to_unity() {
        // trapezoidal integral of 4 pi u^2 w(u) over [0, 1]
        for kernel in [SmoothingKernel::cubic_spline(), SmoothingKernel::uniform()] {
            let n = 4000;
            let mut sum = 0.0;
            for i in 0..=n {
                let u = i as f64 / n as f64;
                let weight = if i == 0 || i == n { 0.5 } else { 1.0 };
                sum += weight * 4.0 * PI * u * u * kernel.density(u) / n as f64;
            }
            assert!((sum - 1.0).abs() < 1e-4, "kernel mass {sum}");
        }
    }

    #[test]
    fn sampled_radii_stay_in_range() {
        let mut random = Random::default();
        let kernel = SmoothingKernel::cubic_spline();
        for _ in 0..1000 {
            let u = kernel.generate_radius(&mut random);
            assert!((0.0..=1.0).contains(&u));
        }
    }
}
