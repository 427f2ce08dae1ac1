//! Analytic dust mixtures with closed-form optical properties
//!
//! These mixes need no resource files: the benchmark mix follows the
//! standard one-dimensional radiative transfer benchmark opacity curve,
//! and the electron mix implements wavelength-independent Thomson
//! scattering with the analytic Mueller matrix of free electrons.

use crate::error::Result;
use crate::mixture::{DustMix, MixtureBuilder};
use crate::wavelength::WavelengthGrid;
use dustrt_numeric::Table2;
use std::f64::consts::PI;

// reference V-band extinction opacity in m^2/kg
const KAPPA_V: f64 = 2600.0;
// the Thomson cross section in m^2 and the particle masses in kg
const SIGMA_THOMSON: f64 = 6.652458732e-29;
const ELECTRON_MASS: f64 = 9.1093837015e-31;
const PROTON_MASS: f64 = 1.67262192369e-27;

/// The analytic benchmark mixture
///
/// Below the one-micron break the absorption and scattering opacities
/// are equal and constant; above it the absorption falls off as
/// `lambda^-1` and the scattering as `lambda^-4`. Scattering is
/// isotropic. The dust mass per hydrogen atom is chosen so that the
/// extinction opacity in the optical plateau is twice the reference
/// V-band value.
pub fn benchmark_1d_mix(grid: &WavelengthGrid) -> Result<DustMix> {
    let lambda_break = 1e-6;
    let n = grid.n_lambda();

    let mut kappa_abs = vec![0.0; n];
    let mut kappa_sca = vec![0.0; n];
    for ell in 0..n {
        let lambda = grid.lambda(ell);
        if lambda <= lambda_break {
            kappa_abs[ell] = 1.0;
            kappa_sca[ell] = 1.0;
        } else {
            kappa_abs[ell] = lambda_break / lambda;
            kappa_sca[ell] = (lambda_break / lambda).powi(4);
        }
    }

    // scaling the unit plateau values by this mass yields kappa_V values
    let mu = 2.0 / KAPPA_V;
    let mut builder = MixtureBuilder::new(grid);
    builder.add_population("benchmark", mu, kappa_abs, kappa_sca, vec![0.0; n])?;
    builder.build()
}

/// A medium of free electrons with Thomson scattering
///
/// The scattering cross section is the wavelength-independent Thomson
/// value, there is no absorption, and the polarization tables carry the
/// analytic Mueller matrix of electron scattering:
/// `S11 = (cos^2 + 1)/2`, `S12 = (cos^2 - 1)/2`, `S33 = cos`, `S34 = 0`.
pub fn electron_mix(grid: &WavelengthGrid) -> Result<DustMix> {
    const N_THETA: usize = 181;
    let n = grid.n_lambda();

    // an electron per hydrogen atom carries this mass fraction
    let mu = ELECTRON_MASS / (ELECTRON_MASS + PROTON_MASS);

    let mut builder = MixtureBuilder::new(grid);
    builder.add_population(
        "electrons",
        mu,
        vec![0.0; n],
        vec![SIGMA_THOMSON; n],
        vec![0.0; n],
    )?;

    let dt = PI / (N_THETA - 1) as f64;
    let thetav: Vec<f64> = (0..N_THETA).map(|t| t as f64 * dt).collect();
    let mut s11 = Table2::new(n, N_THETA);
    let mut s12 = Table2::new(n, N_THETA);
    let mut s33 = Table2::new(n, N_THETA);
    let s34 = Table2::new(n, N_THETA);
    for (t, &theta) in thetav.iter().enumerate() {
        let cos_theta = theta.cos();
        for ell in 0..n {
            s11.set(ell, t, 0.5 * (cos_theta * cos_theta + 1.0));
            s12.set(ell, t, 0.5 * (cos_theta * cos_theta - 1.0));
            s33.set(ell, t, cos_theta);
        }
    }
    builder.add_polarization(thetav, s11, s12, s33, s34)?;
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustrt_numeric::{log_grid, Direction, Random};

    fn optical_grid() -> WavelengthGrid {
        WavelengthGrid::new(log_grid(1e-7, 1e-4, 61).unwrap()).unwrap()
    }

    #[test]
    fn benchmark_mix_has_the_reference_plateau_opacity() {
        let grid = optical_grid();
        let mix = benchmark_1d_mix(&grid).unwrap();
        // in the plateau the extinction opacity equals kappa_V
        let ell = grid.nearest(5.5e-7).unwrap();
        assert!((mix.kappa_ext(ell) - KAPPA_V).abs() < 1e-9);
        assert!((mix.albedo(ell) - 0.5).abs() < 1e-12);

        // far in the infrared scattering is negligible
        let ell_ir = grid.nearest(5e-5).unwrap();
        assert!(mix.albedo(ell_ir) < 1e-3);
    }

    #[test]
    fn electron_mix_scatters_conservatively() {
        let grid = optical_grid();
        let mix = electron_mix(&grid).unwrap();
        assert!(mix.polarization());
        for ell in [0, 30, 60] {
            assert!((mix.albedo(ell) - 1.0).abs() < 1e-9);
            assert_eq!(mix.sigma_sca(ell), SIGMA_THOMSON);
        }
    }

    #[test]
    fn electron_scattering_is_symmetric_about_ninety_degrees() {
        let grid = optical_grid();
        let mix = electron_mix(&grid).unwrap();
        // the Thomson phase function has zero mean cosine
        let mut random = Random::default();
        let k_in = Direction::z_axis();
        let n = 50_000;
        let mean: f64 = (0..n)
            .map(|_| mix.sample_scattering_direction(&mut random, 0, &k_in).z())
            .sum::<f64>()
            / n as f64;
        assert!(mean.abs() < 0.01, "mean cosine {mean}");

        // and the peel-off weight peaks along the forward and backward axes
        let forward = mix.phase_function(0, &k_in, &k_in);
        let sideways = mix.phase_function(0, &k_in, &Direction::new(1.0, 0.0, 0.0).unwrap());
        assert!(forward > sideways);
    }
}
