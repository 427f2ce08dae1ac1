//! The axisymmetric two-dimensional spherical grid

use crate::cartesian::check_mesh;
use crate::error::{Error, Result};
use crate::path::GridPath;
use dustrt_numeric::{locate_clip, locate_fail, Box3, Direction, Position, Random, Vec3};
use log::warn;
use std::f64::consts::PI;

/// A 2-D spherical grid of wedge cells
///
/// Cells are bounded by the radial borders `{r_i}` and the polar-angle
/// borders `{theta_k}`; the flat cell number is `m = k + Ntheta i`. The
/// traversal requires a border on the equatorial plane, so a
/// `theta = pi/2` border is inserted when the user mesh lacks one.
#[derive(Debug, Clone, PartialEq)]
pub struct Sphere2DGrid {
    rv: Vec<f64>,
    thetav: Vec<f64>,
    cv: Vec<f64>,
    nr: usize,
    ntheta: usize,
}

impl Sphere2DGrid {
    /// Initialise from radial and polar border meshes (angles in radians)
    pub fn new(rv: Vec<f64>, mut thetav: Vec<f64>) -> Result<Self> {
        check_mesh("Sphere2DGrid", "r", &rv)?;
        check_mesh("Sphere2DGrid", "theta", &thetav)?;
        if rv[0] < 0.0 {
            return Err(Error::BordersOutOfRange {
                component: "Sphere2DGrid",
                axis: "r",
                requirement: "nonnegative radii",
            });
        }
        if thetav[0] < 0.0 || *thetav.last().expect("checked length") > PI {
            return Err(Error::BordersOutOfRange {
                component: "Sphere2DGrid",
                axis: "theta",
                requirement: "the interval [0, pi]",
            });
        }

        // the path routine assumes an explicit equatorial border
        let half = PI / 2.0;
        if !thetav.iter().any(|t| (t - half).abs() < 1e-11 * PI) {
            thetav.push(half);
            thetav.sort_by(f64::total_cmp);
        }

        let nr = rv.len() - 1;
        let ntheta = thetav.len() - 1;
        let cv = thetav.iter().map(|t| t.cos()).collect();
        Ok(Self {
            rv,
            thetav,
            cv,
            nr,
            ntheta,
        })
    }

    /// The number of cells
    pub fn n_cells(&self) -> usize {
        self.nr * self.ntheta
    }

    /// The flat index for mesh indices `(i, k)`
    pub fn index(&self, i: usize, k: usize) -> usize {
        k + self.ntheta * i
    }

    /// The mesh indices for a flat index
    pub fn invert_index(&self, m: usize) -> (usize, usize) {
        (m / self.ntheta, m % self.ntheta)
    }

    /// The volume of cell `m`
    pub fn volume(&self, m: usize) -> f64 {
        if m >= self.n_cells() {
            return 0.0;
        }
        let (i, k) = self.invert_index(m);
        2.0 / 3.0
            * PI
            * (self.rv[i + 1].powi(3) - self.rv[i].powi(3))
            * (self.cv[k] - self.cv[k + 1])
    }

    /// The cell containing a position, or `None` outside the grid
    pub fn which_cell(&self, position: &Position) -> Option<usize> {
        let (r, theta, _) = position.spherical();
        let i = locate_fail(&self.rv, r)?;
        let k = locate_clip(&self.thetav, theta);
        Some(self.index(i, k))
    }

    /// The centre of cell `m`, at azimuth zero
    pub fn central_position(&self, m: usize) -> Result<Position> {
        self.check_cell(m)?;
        let (i, k) = self.invert_index(m);
        Ok(Position::from_spherical(
            0.5 * (self.rv[i] + self.rv[i + 1]),
            0.5 * (self.thetav[k] + self.thetav[k + 1]),
            0.0,
        ))
    }

    /// A random position inside the wedge of cell `m`
    pub fn random_position(&self, m: usize, random: &mut Random) -> Result<Position> {
        self.check_cell(m)?;
        let (i, k) = self.invert_index(m);
        let r2_low = self.rv[i] * self.rv[i];
        let r2_high = self.rv[i + 1] * self.rv[i + 1];
        let r = (r2_low + (r2_high - r2_low) * random.uniform()).sqrt();
        let theta =
            self.thetav[k] + (self.thetav[k + 1] - self.thetav[k]) * random.uniform();
        let phi = 2.0 * PI * random.uniform();
        Ok(Position::from_spherical(r, theta, phi))
    }

    /// The bounding box of the whole grid
    pub fn bounding_box(&self) -> Box3 {
        Box3::cube(self.rv[self.nr])
    }

    /// Trace a ray through the grid
    ///
    /// Each step intersects the ray with the at most four cell borders
    /// (inner and outer sphere, upper and lower cone, with the equatorial
    /// plane as the degenerate cone) and advances through the closest
    /// one. A step that finds no exit nudges the position forward and
    /// relocates the cell, so the routine cannot loop forever.
    pub fn path(&self, position: &Position, direction: &Direction) -> GridPath {
        let rmax = self.rv[self.nr];
        let eps = 1e-11 * rmax;

        let mut path = GridPath::new(*position, *direction);
        let mut r_vec = position.to_vec();
        let k_vec = direction.to_vec();

        // move an exterior starting point onto the boundary sphere
        let r2 = r_vec.norm_squared();
        if r2 > rmax * rmax {
            let ds = first_intersection_sphere(&r_vec, &k_vec, rmax);
            if ds == 0.0 {
                return path;
            }
            path.add_segment(None, ds);
            r_vec += k_vec * (ds + eps);
        } else if r2 == 0.0 {
            // give the origin a meaningful cell number
            r_vec += k_vec * eps;
        }

        let (mut i, mut k) = match self.locate(&r_vec) {
            Some(indices) => indices,
            None => {
                path.clear();
                return path;
            }
        };

        loop {
            let mut ds = f64::MAX;
            let mut inext = i;
            let mut knext = k;

            // inner radial border (absent for the innermost shell)
            if i > 0 {
                let s = first_intersection_sphere(&r_vec, &k_vec, self.rv[i]);
                if s > 0.0 && s < ds {
                    ds = s;
                    inext = i - 1;
                    knext = k;
                }
            }

            // outer radial border
            {
                let s = first_intersection_sphere(&r_vec, &k_vec, self.rv[i + 1]);
                if s > 0.0 && s < ds {
                    ds = s;
                    inext = i + 1;
                    knext = k;
                }
            }

            // upper angular border (absent for the uppermost cell)
            if k > 0 {
                let s = first_intersection_cone(&r_vec, &k_vec, self.cv[k]);
                if s > 0.0 && s < ds {
                    ds = s;
                    inext = i;
                    knext = k - 1;
                }
            }

            // lower angular border (absent for the lowest cell)
            if k < self.ntheta - 1 {
                let s = first_intersection_cone(&r_vec, &k_vec, self.cv[k + 1]);
                if s > 0.0 && s < ds {
                    ds = s;
                    inext = i;
                    knext = k + 1;
                }
            }

            if inext != i || knext != k {
                path.add_segment(Some(self.index(i, k)), ds);
                r_vec += k_vec * (ds + eps);
                if inext >= self.nr {
                    return path;
                }
                i = inext;
                k = knext;
                // rounding may carry the position over the boundary sphere
                if r_vec.norm_squared() >= rmax * rmax {
                    return path;
                }
            } else {
                warn!("no exit point found from dust grid cell");
                r_vec += k_vec * eps;
                match self.locate(&r_vec) {
                    Some((inew, knew)) => {
                        i = inew;
                        k = knew;
                    }
                    None => return path,
                }
            }
        }
    }

    fn locate(&self, r_vec: &Vec3) -> Option<(usize, usize)> {
        let position = Position::from_vec(*r_vec);
        let (r, theta, _) = position.spherical();
        let i = locate_fail(&self.rv, r)?;
        let k = locate_clip(&self.thetav, theta);
        Some((i, k))
    }

    fn check_cell(&self, m: usize) -> Result<()> {
        if m >= self.n_cells() {
            return Err(Error::CellOutOfRange {
                index: m,
                count: self.n_cells(),
            });
        }
        Ok(())
    }
}

// the smallest positive solution of x^2 + 2 b x + c = 0, or 0 if none
fn smallest_positive_root2(b: f64, c: f64) -> f64 {
    if b * b > c {
        if b > 0.0 {
            if c < 0.0 {
                let x1 = -b - (b * b - c).sqrt();
                return c / x1;
            }
        } else {
            let x2 = -b + (b * b - c).sqrt();
            if c > 0.0 {
                let x1 = c / x2;
                if x1 < x2 {
                    return x1;
                }
            }
            return x2;
        }
    }
    0.0
}

// the smallest positive solution of a x^2 + 2 b x + c = 0, or 0 if none
fn smallest_positive_root(a: f64, b: f64, c: f64) -> f64 {
    if a.abs() > 1e-9 {
        return smallest_positive_root2(b / a, c / a);
    }
    let x = -0.5 * c / b;
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

// distance to the first intersection of the ray with a sphere, or 0
fn first_intersection_sphere(r: &Vec3, k: &Vec3, radius: f64) -> f64 {
    smallest_positive_root2(r.dot(k), r.norm_squared() - radius * radius)
}

// distance to the first intersection of the ray with a cone of given
// cos(theta); the degenerate zero-cosine cone is the equatorial plane
fn first_intersection_cone(r: &Vec3, k: &Vec3, c: f64) -> f64 {
    if c != 0.0 {
        smallest_positive_root(
            c * c - k.z * k.z,
            c * c * r.dot(k) - r.z * k.z,
            c * c * r.norm_squared() - r.z * r.z,
        )
    } else {
        -r.z / k.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_grid() -> Sphere2DGrid {
        // two radial shells, polar borders at 0, pi/3, pi (the
        // constructor inserts the equatorial border)
        Sphere2DGrid::new(vec![0.0, 1.0, 2.0], vec![0.0, PI / 3.0, PI]).unwrap()
    }

    #[test]
    fn the_equatorial_border_is_inserted() {
        let grid = simple_grid();
        assert_eq!(grid.ntheta, 3);
        assert!(grid.thetav.iter().any(|t| (t - PI / 2.0).abs() < 1e-12));
    }

    #[test]
    fn volumes_fill_the_sphere() {
        let grid = simple_grid();
        let total: f64 = (0..grid.n_cells()).map(|m| grid.volume(m)).sum();
        let expected = 4.0 / 3.0 * PI * 8.0;
        assert!((total - expected).abs() < 1e-10);
    }

    #[test]
    fn equatorial_diametral_ray_stays_in_the_belt() {
        // straight through the origin along x: both halves lie in the
        // same equatorial-belt cells, so the middle shell is one segment
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(-5.0, 0.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let segments = path.segments();
        assert_eq!(segments[0].cell, None);
        assert!((segments[0].ds - 3.0).abs() < 1e-6);
        assert_eq!(segments[1..].len(), 3);
        assert!((path.tagged_length() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn tangent_rays_return_empty_paths() {
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(-5.0, 2.0 + 1e-9, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn polar_ray_crosses_two_cells_per_shell() {
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(0.0, 0.0, -5.0),
            &Direction::new(0.0, 0.0, 1.0).unwrap(),
        );
        let tagged: Vec<_> = path
            .segments()
            .iter()
            .filter(|s| s.cell.is_some())
            .collect();
        assert_eq!(tagged.len(), 4);
        assert!((path.tagged_length() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn chord_length_matches_geometry() {
        let grid = simple_grid();
        // an interior chord at impact parameter 0.5
        let path = grid.path(
            &Position::new(-5.0, 0.5, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let expected = 2.0 * (4.0_f64 - 0.25).sqrt();
        assert!((path.tagged_length() - expected).abs() < 1e-5);
    }
}
