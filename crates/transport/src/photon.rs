//! The photon package state
//!
//! A photon package is a bundle of photons with a shared wavelength bin,
//! position and direction. The lifecycle is launch, propagate, scatter,
//! and optionally peel off scaled copies towards observers. Emission
//! peel-offs of anisotropic sources are biased by the source's
//! directional probability; scattering peel-offs carry the phase
//! function weight supplied by the caller.

use dustrt_geometry::Anisotropy;
use dustrt_numeric::{Direction, Position};

/// The (I, Q, U, V) representation of polarised radiation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StokesVector {
    /// Total intensity
    pub i: f64,
    /// Linear polarisation along the reference axes
    pub q: f64,
    /// Linear polarisation along the diagonals
    pub u: f64,
    /// Circular polarisation
    pub v: f64,
}

impl StokesVector {
    /// An unpolarised unit vector
    pub fn unpolarized() -> Self {
        Self {
            i: 1.0,
            q: 0.0,
            u: 0.0,
            v: 0.0,
        }
    }

    /// Apply the four independent Mueller coefficients
    pub fn apply_mueller(&mut self, s11: f64, s12: f64, s33: f64, s34: f64) {
        let (i, q, u, v) = (self.i, self.q, self.u, self.v);
        self.i = s11 * i + s12 * q;
        self.q = s12 * i + s11 * q;
        self.u = s33 * u - s34 * v;
        self.v = s34 * u + s33 * v;
    }

    /// The degree of linear polarisation
    pub fn linear_degree(&self) -> f64 {
        if self.i == 0.0 {
            return 0.0;
        }
        (self.q * self.q + self.u * self.u).sqrt() / self.i
    }
}

/// A photon bundle traced through the dust medium
#[derive(Debug, Clone, PartialEq)]
pub struct PhotonPackage {
    luminosity: f64,
    ell: usize,
    position: Position,
    direction: Direction,
    previous_direction: Direction,
    n_scatt: u32,
    origin: Option<usize>,
    anisotropy: Option<Anisotropy>,
    stokes: Option<StokesVector>,
}

impl PhotonPackage {
    /// Launch a fresh package with no interaction history
    pub fn launch(luminosity: f64, ell: usize, position: Position, direction: Direction) -> Self {
        Self {
            luminosity,
            ell,
            position,
            direction,
            previous_direction: direction,
            n_scatt: 0,
            origin: None,
            anisotropy: None,
            stokes: None,
        }
    }

    /// Launch an emission peel-off copy towards `direction`
    ///
    /// The luminosity is biased by the directional emission probability
    /// when the source package carries an anisotropic pattern.
    pub fn launch_emission_peel_off(source: &PhotonPackage, direction: Direction) -> Self {
        let mut luminosity = source.luminosity;
        if let Some(anisotropy) = &source.anisotropy {
            luminosity *= anisotropy.probability(&source.position, &direction);
        }
        Self {
            luminosity,
            ell: source.ell,
            position: source.position,
            direction,
            previous_direction: direction,
            n_scatt: 0,
            origin: source.origin,
            anisotropy: None,
            stokes: None,
        }
    }

    /// Launch a scattering peel-off copy with phase-function weight `w`
    pub fn launch_scattering_peel_off(
        source: &PhotonPackage,
        direction: Direction,
        weight: f64,
    ) -> Self {
        Self {
            luminosity: source.luminosity * weight,
            ell: source.ell,
            position: source.position,
            direction,
            previous_direction: source.direction,
            n_scatt: source.n_scatt + 1,
            origin: source.origin,
            anisotropy: None,
            stokes: source.stokes,
        }
    }

    /// Tag the package with the emitting component index
    pub fn set_origin(&mut self, origin: usize) {
        self.origin = Some(origin);
    }

    /// Attach the anisotropic emission pattern of the source
    pub fn set_anisotropy(&mut self, anisotropy: Anisotropy) {
        self.anisotropy = Some(anisotropy);
    }

    /// Enable polarisation tracking with an unpolarised initial state
    pub fn set_unpolarized(&mut self) {
        self.stokes = Some(StokesVector::unpolarized());
    }

    /// Move the package a distance `s` along its direction
    pub fn propagate(&mut self, s: f64) {
        self.position = self.position.shifted(&self.direction, s);
    }

    /// Scatter into a new direction
    ///
    /// Increments the scattering count, caches the previous direction
    /// for peel-off, and drops the emission anisotropy, which only
    /// applies to the first flight.
    pub fn scatter(&mut self, direction: Direction) {
        self.n_scatt += 1;
        self.previous_direction = self.direction;
        self.direction = direction;
        self.anisotropy = None;
    }

    /// Overwrite the luminosity
    pub fn set_luminosity(&mut self, luminosity: f64) {
        self.luminosity = luminosity;
    }

    /// The luminosity carried by the package
    pub fn luminosity(&self) -> f64 {
        self.luminosity
    }

    /// The wavelength-grid index
    pub fn ell(&self) -> usize {
        self.ell
    }

    /// The current position
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The current propagation direction
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// The direction before the most recent scattering event
    pub fn previous_direction(&self) -> &Direction {
        &self.previous_direction
    }

    /// The number of scattering events so far
    pub fn n_scatt(&self) -> u32 {
        self.n_scatt
    }

    /// The emitting component tag, if any
    pub fn origin(&self) -> Option<usize> {
        self.origin
    }

    /// The emission anisotropy, if any
    pub fn anisotropy(&self) -> Option<&Anisotropy> {
        self.anisotropy.as_ref()
    }

    /// The Stokes vector, when polarisation is tracked
    pub fn stokes(&self) -> Option<&StokesVector> {
        self.stokes.as_ref()
    }

    /// Mutable access to the Stokes vector
    pub fn stokes_mut(&mut self) -> Option<&mut StokesVector> {
        self.stokes.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scattering_updates_the_history() {
        let mut pp = PhotonPackage::launch(
            1.0,
            3,
            Position::origin(),
            Direction::z_axis(),
        );
        pp.propagate(2.0);
        assert_eq!(pp.position().cartesian(), (0.0, 0.0, 2.0));

        let new_direction = Direction::new(1.0, 0.0, 0.0).unwrap();
        pp.scatter(new_direction);
        assert_eq!(pp.n_scatt(), 1);
        assert_eq!(pp.previous_direction(), &Direction::z_axis());
        assert_eq!(pp.direction(), &new_direction);
    }

    #[test]
    fn emission_peel_off_biases_anisotropic_sources() {
        let mut pp = PhotonPackage::launch(
            2.0,
            0,
            Position::origin(),
            Direction::z_axis(),
        );
        pp.set_anisotropy(Anisotropy::Netzer);

        // straight up the Netzer pattern gives (6/7)(2 + 1) = 18/7
        let peel = PhotonPackage::launch_emission_peel_off(&pp, Direction::z_axis());
        assert!((peel.luminosity() - 2.0 * 18.0 / 7.0).abs() < 1e-12);
        assert!(peel.anisotropy().is_none());
    }

    #[test]
    fn scattering_peel_off_keeps_the_previous_direction() {
        let pp = PhotonPackage::launch(1.0, 0, Position::origin(), Direction::z_axis());
        let observer = Direction::new(0.0, 1.0, 0.0).unwrap();
        let peel = PhotonPackage::launch_scattering_peel_off(&pp, observer, 0.5);
        assert_eq!(peel.luminosity(), 0.5);
        assert_eq!(peel.n_scatt(), 1);
        assert_eq!(peel.previous_direction(), pp.direction());
    }
}
