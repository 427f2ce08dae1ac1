//! Peel-off observers accumulating synthetic images and SEDs
//!
//! An observer sits at infinity along a viewing direction and receives
//! the peel-off copies emitted at every launch and scattering event.
//! Contributions are binned into a pixel frame per wavelength by
//! parallel projection onto the observer plane, and into an integrated
//! SED. Accumulation is a plain commutative sum, so per-worker observer
//! copies can be merged in any fixed order.

use crate::error::{Error, Result};
use crate::photon::PhotonPackage;
use dustrt_numeric::{Direction, Vec3};

/// A parallel-projection instrument with a square field of view
#[derive(Debug, Clone, PartialEq)]
pub struct Observer {
    name: String,
    direction: Direction,
    axis_u: Vec3,
    axis_v: Vec3,
    field_of_view: f64,
    n_x: usize,
    n_y: usize,
    n_lambda: usize,
    frames: Vec<f64>,
    sed: Vec<f64>,
}

impl Observer {
    /// Initialise an observer looking along `direction`
    ///
    /// The field of view is the full width of the square image in model
    /// units, centred on the coordinate origin.
    pub fn new(
        name: impl Into<String>,
        direction: Direction,
        field_of_view: f64,
        n_x: usize,
        n_y: usize,
        n_lambda: usize,
    ) -> Result<Self> {
        if field_of_view <= 0.0 {
            return Err(Error::NonPositiveParameter {
                component: "Observer",
                parameter: "field_of_view",
                value: field_of_view,
            });
        }
        if n_x == 0 || n_y == 0 || n_lambda == 0 {
            return Err(Error::InvalidConfiguration {
                component: "Observer",
                requirement: "nonzero pixel and wavelength counts",
            });
        }

        // an orthonormal image basis perpendicular to the line of sight
        let k = direction.to_vec();
        let helper = if k.x.abs() < 0.9 {
            Vec3::new(1.0, 0.0, 0.0)
        } else {
            Vec3::new(0.0, 1.0, 0.0)
        };
        let axis_u = k.cross(&helper).normalize();
        let axis_v = k.cross(&axis_u);

        Ok(Self {
            name: name.into(),
            direction,
            axis_u,
            axis_v,
            field_of_view,
            n_x,
            n_y,
            n_lambda,
            frames: vec![0.0; n_lambda * n_x * n_y],
            sed: vec![0.0; n_lambda],
        })
    }

    /// The observer's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The viewing direction (from the system towards the observer)
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// The pixel dimensions `(n_x, n_y)`
    pub fn pixels(&self) -> (usize, usize) {
        (self.n_x, self.n_y)
    }

    /// Record a peel-off package directed at this observer
    ///
    /// The luminosity lands in the pixel the emitting position projects
    /// onto; contributions outside the field of view only count towards
    /// the SED.
    pub fn record(&mut self, pp: &PhotonPackage) {
        let luminosity = pp.luminosity();
        if !(luminosity > 0.0) || !luminosity.is_finite() {
            return;
        }
        let ell = pp.ell();
        self.sed[ell] += luminosity;

        let r = pp.position().to_vec();
        let half = 0.5 * self.field_of_view;
        let pu = r.dot(&self.axis_u);
        let pv = r.dot(&self.axis_v);
        if pu.abs() >= half || pv.abs() >= half {
            return;
        }
        let ix = ((pu + half) / self.field_of_view * self.n_x as f64) as usize;
        let iy = ((pv + half) / self.field_of_view * self.n_y as f64) as usize;
        let ix = ix.min(self.n_x - 1);
        let iy = iy.min(self.n_y - 1);
        self.frames[(ell * self.n_y + iy) * self.n_x + ix] += luminosity;
    }

    /// The image frame at wavelength index `ell`, row-major in `(y, x)`
    pub fn frame(&self, ell: usize) -> &[f64] {
        &self.frames[ell * self.n_x * self.n_y..(ell + 1) * self.n_x * self.n_y]
    }

    /// The integrated SED over all recorded peel-offs
    pub fn sed(&self) -> &[f64] {
        &self.sed
    }

    /// A zeroed copy for a worker's shadow accumulation
    pub fn shadow(&self) -> Observer {
        let mut copy = self.clone();
        copy.frames.iter_mut().for_each(|value| *value = 0.0);
        copy.sed.iter_mut().for_each(|value| *value = 0.0);
        copy
    }

    /// Merge a worker's shadow accumulation into this observer
    pub fn merge(&mut self, shadow: &Observer) {
        for (total, delta) in self.frames.iter_mut().zip(&shadow.frames) {
            *total += delta;
        }
        for (total, delta) in self.sed.iter_mut().zip(&shadow.sed) {
            *total += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustrt_numeric::Position;

    #[test]
    fn contributions_land_in_the_projected_pixel() {
        let mut observer = Observer::new(
            "face-on",
            Direction::z_axis(),
            4.0,
            4,
            4,
            1,
        )
        .unwrap();

        let pp = PhotonPackage::launch(2.0, 0, Position::origin(), Direction::z_axis());
        observer.record(&pp);
        assert_eq!(observer.sed()[0], 2.0);
        // the origin projects onto the central region of the frame
        let total: f64 = observer.frame(0).iter().sum();
        assert_eq!(total, 2.0);
    }

    #[test]
    fn out_of_field_contributions_only_count_for_the_sed() {
        let mut observer =
            Observer::new("narrow", Direction::z_axis(), 0.1, 2, 2, 1).unwrap();
        let pp = PhotonPackage::launch(1.0, 0, Position::new(5.0, 0.0, 0.0), Direction::z_axis());
        observer.record(&pp);
        assert_eq!(observer.sed()[0], 1.0);
        assert_eq!(observer.frame(0).iter().sum::<f64>(), 0.0);
    }

    #[test]
    fn shadow_merge_is_additive() {
        let mut observer = Observer::new("obs", Direction::z_axis(), 2.0, 2, 2, 2).unwrap();
        let mut shadow = observer.shadow();
        let pp = PhotonPackage::launch(1.5, 1, Position::origin(), Direction::z_axis());
        shadow.record(&pp);
        observer.merge(&shadow);
        assert_eq!(observer.sed()[1], 1.5);
    }
}
