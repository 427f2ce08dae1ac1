//! The one-dimensional spherical shell grid

use crate::cartesian::check_mesh;
use crate::error::{Error, Result};
use crate::path::GridPath;
use dustrt_numeric::{locate_clip, locate_fail, Box3, Direction, Position, Random};
use std::f64::consts::PI;

/// A spherically symmetric grid of concentric shells
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere1DGrid {
    rv: Vec<f64>,
    nr: usize,
}

impl Sphere1DGrid {
    /// Initialise from the radial borders, starting at zero or above
    pub fn new(rv: Vec<f64>) -> Result<Self> {
        check_mesh("Sphere1DGrid", "r", &rv)?;
        if rv[0] < 0.0 {
            return Err(Error::BordersOutOfRange {
                component: "Sphere1DGrid",
                axis: "r",
                requirement: "nonnegative radii",
            });
        }
        let nr = rv.len() - 1;
        Ok(Self { rv, nr })
    }

    /// The number of shells
    pub fn n_cells(&self) -> usize {
        self.nr
    }

    /// The volume of shell `m`
    pub fn volume(&self, m: usize) -> f64 {
        if m >= self.nr {
            return 0.0;
        }
        let (r_low, r_high) = (self.rv[m], self.rv[m + 1]);
        4.0 * PI / 3.0 * (r_high - r_low) * (r_high * r_high + r_high * r_low + r_low * r_low)
    }

    /// The shell containing a position, or `None` outside the grid
    pub fn which_cell(&self, position: &Position) -> Option<usize> {
        locate_fail(&self.rv, position.radius())
    }

    /// A representative central position in shell `m`
    pub fn central_position(&self, m: usize) -> Result<Position> {
        self.check_cell(m)?;
        Ok(Position::new(
            0.5 * (self.rv[m] + self.rv[m + 1]),
            0.0,
            0.0,
        ))
    }

    /// A random position inside shell `m`
    pub fn random_position(&self, m: usize, random: &mut Random) -> Result<Position> {
        self.check_cell(m)?;
        let direction = random.direction();
        let r = self.rv[m] + (self.rv[m + 1] - self.rv[m]) * random.uniform();
        Ok(Position::from_radius_direction(r, &direction))
    }

    /// The bounding box of the whole grid
    pub fn bounding_box(&self) -> Box3 {
        Box3::cube(self.rv[self.nr])
    }

    /// Trace a ray through the shells
    ///
    /// The path is a pair of monotonic passes: inward until the ray
    /// reaches its closest approach to the centre, then outward to the
    /// exit. The closest-approach shell is split at the turning point,
    /// so a diametral ray records two segments for every shell crossed.
    pub fn path(&self, position: &Position, direction: &Direction) -> GridPath {
        let mut path = GridPath::new(*position, *direction);

        let r = position.radius();
        let mut q = direction.dot_position(position);
        let p2 = (r - q) * (r + q);
        let p = p2.max(0.0).sqrt();
        let rmax = self.rv[self.nr];

        // move an exterior starting point onto the boundary sphere
        let mut r = r;
        if r > rmax {
            if q > 0.0 || p > rmax {
                return path;
            }
            let qmax = ((rmax - p) * (rmax + p)).sqrt();
            path.add_segment(None, -qmax - q);
            q = -qmax;
            r = rmax - 1e-8 * (self.rv[self.nr] - self.rv[self.nr - 1]);
        }

        let mut i = locate_clip(&self.rv, r);

        // inward to the closest-approach shell, then to the turning point
        if q < 0.0 {
            let imin = locate_clip(&self.rv, p);
            while i > imin {
                let rn = self.rv[i];
                let qn = -((rn - p) * (rn + p)).max(0.0).sqrt();
                path.add_segment(Some(i), qn - q);
                q = qn;
                i -= 1;
            }
            path.add_segment(Some(i), -q);
            q = 0.0;
        }

        // outward to the exit
        loop {
            let rn = self.rv[i + 1];
            let qn = ((rn - p) * (rn + p)).max(0.0).sqrt();
            path.add_segment(Some(i), qn - q);
            q = qn;
            i += 1;
            if i >= self.nr {
                return path;
            }
        }
    }

    fn check_cell(&self, m: usize) -> Result<()> {
        if m >= self.nr {
            return Err(Error::CellOutOfRange {
                index: m,
                count: self.nr,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shells() -> Sphere1DGrid {
        Sphere1DGrid::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap()
    }

    #[test]
    fn volumes_fill_the_sphere() {
        let grid = shells();
        let total: f64 = (0..grid.n_cells()).map(|m| grid.volume(m)).sum();
        let expected = 4.0 / 3.0 * PI * 27.0;
        assert!((total - expected).abs() < 1e-10);
    }

    #[test]
    fn diametral_ray_splits_at_the_turning_point() {
        // the reference traversal: from (-5, 0, 0) along +x the entry
        // gap is 2 and the shells read 2,1,0,0,1,2 with unit lengths
        let grid = shells();
        let path = grid.path(
            &Position::new(-5.0, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let segments = path.segments();
        assert_eq!(segments[0].cell, None);
        assert!((segments[0].ds - 2.0).abs() < 1e-7);
        let cells: Vec<_> = segments[1..].iter().map(|s| s.cell.unwrap()).collect();
        assert_eq!(cells, vec![2, 1, 0, 0, 1, 2]);
        for segment in &segments[1..] {
            assert!((segment.ds - 1.0).abs() < 1e-6);
        }
        assert!((path.tagged_length() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn offset_chords_skip_the_inner_shells() {
        let grid = shells();
        // impact parameter 1.5 never reaches shells 0 and 1's inner part
        let path = grid.path(
            &Position::new(-5.0, 1.5, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(!path.is_empty());
        let cells: Vec<_> = path
            .segments()
            .iter()
            .filter_map(|s| s.cell)
            .collect();
        assert!(!cells.contains(&0));
        // total chord matches 2 sqrt(rmax^2 - p^2)
        let expected = 2.0 * (9.0_f64 - 2.25).sqrt();
        assert!((path.tagged_length() - expected).abs() < 1e-6);
    }

    #[test]
    fn interior_starts_trace_outward_only_when_receding() {
        let grid = shells();
        let path = grid.path(
            &Position::new(1.5, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let cells: Vec<_> = path.segments().iter().filter_map(|s| s.cell).collect();
        assert_eq!(cells, vec![1, 2]);
        assert!((path.total_length() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn rays_missing_the_sphere_are_empty() {
        let grid = shells();
        let path = grid.path(
            &Position::new(-5.0, 3.5, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
        // receding exterior points as well
        let path = grid.path(
            &Position::new(5.0, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
    }
}
