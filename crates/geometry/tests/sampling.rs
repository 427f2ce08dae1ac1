//! Integration tests for the sampling invariants of the geometry catalog
//!
//! Every geometry must draw positions from its own density: binned
//! histograms of large sample ensembles converge to the density profile
//! up to Monte Carlo noise, and the densities integrate to unit mass.

use dustrt_geometry::{
    AxGeometry, CombineDecorator, Geometry, SepAxGeometry, SmoothingKernel, SpheGeometry,
    SpheroidalDecorator, SpiralArmDecorator,
};
use dustrt_numeric::{lin_grid, locate, Position, Random};
use rstest::rstest;
use std::f64::consts::PI;

const N_SAMPLES: usize = 60_000;

// compare a radial sample histogram against the radial mass profile
fn check_radial_histogram(geometry: &Geometry, r_out: f64, n_bins: usize, tolerance: f64) {
    let mut random = Random::default();
    let borders = lin_grid(0.0, r_out, n_bins + 1).unwrap();
    let mut counts = vec![0.0; n_bins];
    let mut inside = 0.0;
    for _ in 0..N_SAMPLES {
        let r = geometry.generate_position(&mut random).radius();
        let bin = locate(&borders, r);
        if bin >= 0 && (bin as usize) < n_bins {
            counts[bin as usize] += 1.0;
            inside += 1.0;
        }
    }

    // the expected bin masses from the density, by shell integration
    let n_sub = 64;
    let mut expected = vec![0.0; n_bins];
    let mut total = 0.0;
    for (bin, slot) in expected.iter_mut().enumerate() {
        let mut mass = 0.0;
        for sub in 0..n_sub {
            let r = borders[bin]
                + (borders[bin + 1] - borders[bin]) * (sub as f64 + 0.5) / n_sub as f64;
            let rho = geometry.density(&Position::new(r, 0.0, 0.0));
            mass += 4.0 * PI * r * r * rho;
        }
        *slot = mass * (borders[bin + 1] - borders[bin]) / n_sub as f64;
        total += *slot;
    }

    for bin in 0..n_bins {
        let observed = counts[bin] / inside;
        let predicted = expected[bin] / total;
        if predicted > 0.01 {
            let relative = (observed - predicted).abs() / predicted;
            assert!(
                relative < tolerance,
                "bin {bin}: observed {observed:.4}, predicted {predicted:.4}"
            );
        }
    }
}

#[rstest]
#[case(Geometry::Sphe(SpheGeometry::plummer(1.0).unwrap()), 6.0)]
#[case(Geometry::Sphe(SpheGeometry::einasto(1.5, 1.0).unwrap()), 6.0)]
#[case(Geometry::Sphe(SpheGeometry::shell(1.5, 0.5, 3.0).unwrap()), 3.5)]
fn spherical_histograms_converge_to_the_density(#[case] geometry: Geometry, #[case] r_out: f64) {
    check_radial_histogram(&geometry, r_out, 12, 0.1);
}

#[test]
fn spheroidal_samples_follow_the_flattened_density() {
    let geometry = Geometry::Spheroidal(
        SpheroidalDecorator::new(SpheGeometry::plummer(1.0).unwrap(), 0.5).unwrap(),
    );
    let mut random = Random::default();
    // the z extent shrinks by the flattening while x and y do not
    let mut sum_z2 = 0.0;
    let mut sum_x2 = 0.0;
    for _ in 0..N_SAMPLES {
        let position = geometry.generate_position(&mut random);
        sum_z2 += position.z() * position.z();
        sum_x2 += position.x() * position.x();
    }
    let ratio = (sum_z2 / sum_x2).sqrt();
    assert!((ratio - 0.5).abs() < 0.05, "axis ratio {ratio}");
}

#[test]
fn disk_samples_reproduce_the_scale_lengths() {
    let geometry = Geometry::SepAx(SepAxGeometry::exp_disk(2.0, 0.5).unwrap());
    let mut random = Random::default();
    let mut sum_r = 0.0;
    let mut sum_abs_z = 0.0;
    for _ in 0..N_SAMPLES {
        let position = geometry.generate_position(&mut random);
        sum_r += position.cyl_radius();
        sum_abs_z += position.height().abs();
    }
    // E[R] = 2 h_R for the R-weighted exponential, E[|z|] = h_z
    assert!((sum_r / N_SAMPLES as f64 - 4.0).abs() < 0.05);
    assert!((sum_abs_z / N_SAMPLES as f64 - 0.5).abs() < 0.02);
}

#[test]
fn torus_samples_respect_the_opening_angle() {
    let geometry = Geometry::Ax(AxGeometry::torus(1.0, 2.0, 0.6, 0.5, 5.0, false, 0.0).unwrap());
    let mut random = Random::default();
    let sin_delta = 0.6_f64.sin();
    for _ in 0..5000 {
        let position = geometry.generate_position(&mut random);
        let (r, theta, _) = position.spherical();
        assert!(r >= 0.5 && r <= 5.0);
        assert!(theta.cos().abs() <= sin_delta + 1e-12);
    }
}

#[test]
fn spiral_arms_average_out_azimuthally() {
    let inner = Geometry::SepAx(SepAxGeometry::exp_disk(2.0, 0.4).unwrap());
    let geometry = Geometry::SpiralArm(
        SpiralArmDecorator::new(inner.clone(), 2, 0.3, 2.0, 0.0, 0.8, 2).unwrap(),
    );
    // the azimuthal average of the perturbed density equals the inner
    // density at any (R, z)
    let n_phi = 720;
    for (big_r, z) in [(1.0, 0.1), (3.0, -0.2)] {
        let mut average = 0.0;
        for p in 0..n_phi {
            let phi = 2.0 * PI * p as f64 / n_phi as f64;
            average += geometry.density(&Position::from_cylindrical(big_r, phi, z));
        }
        average /= n_phi as f64;
        let reference = inner.density(&Position::from_cylindrical(big_r, 0.0, z));
        assert!(
            (average / reference - 1.0).abs() < 1e-3,
            "azimuthal average off at R={big_r}"
        );
    }
}

#[test]
fn combined_geometries_sample_both_components() {
    let a = Geometry::Sphe(SpheGeometry::plummer(0.3).unwrap());
    let b = Geometry::Sphe(SpheGeometry::shell(1.0, 4.0, 6.0).unwrap());
    let geometry = Geometry::Combine(CombineDecorator::new(a, 1.0, b, 3.0).unwrap());
    let mut random = Random::default();
    let mut outer = 0;
    let n = 20_000;
    for _ in 0..n {
        if geometry.generate_position(&mut random).radius() > 3.0 {
            outer += 1;
        }
    }
    // three quarters of the mass sits in the outer shell
    let fraction = outer as f64 / n as f64;
    assert!((fraction - 0.75).abs() < 0.02, "outer fraction {fraction}");
}

#[test]
fn clump_kernels_are_normalised() {
    // the kernel CDF sampler and the kernel profile agree on the median
    let kernel = SmoothingKernel::cubic_spline();
    let mut random = Random::default();
    let mut below = 0;
    let n = 40_000;
    // the cubic spline encloses half its mass within u ~ 0.4365
    let median = 0.4365;
    for _ in 0..n {
        if kernel.generate_radius(&mut random) < median {
            below += 1;
        }
    }
    let fraction = below as f64 / n as f64;
    assert!((fraction - 0.5).abs() < 0.01, "median fraction {fraction}");
}
