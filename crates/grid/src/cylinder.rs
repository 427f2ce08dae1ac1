//! The axisymmetric two-dimensional cylindrical grid

use crate::cartesian::check_mesh;
use crate::error::{Error, Result};
use crate::path::GridPath;
use dustrt_numeric::{locate_clip, locate_fail, Box3, Direction, Position, Random};
use std::f64::consts::PI;

/// A 2-D cylindrical grid of toroidal annular cells
///
/// Cells are bounded by the radial borders `{R_i}` (starting at zero or
/// above) and the vertical borders `{z_k}`; the flat cell number is
/// `m = k + Nz i`.
#[derive(Debug, Clone, PartialEq)]
pub struct CylinderGrid {
    rv: Vec<f64>,
    zv: Vec<f64>,
    nr: usize,
    nz: usize,
}

impl CylinderGrid {
    /// Initialise from the radial and vertical border meshes
    pub fn new(rv: Vec<f64>, zv: Vec<f64>) -> Result<Self> {
        check_mesh("CylinderGrid", "R", &rv)?;
        check_mesh("CylinderGrid", "z", &zv)?;
        if rv[0] < 0.0 {
            return Err(Error::BordersOutOfRange {
                component: "CylinderGrid",
                axis: "R",
                requirement: "nonnegative radii",
            });
        }
        let (nr, nz) = (rv.len() - 1, zv.len() - 1);
        Ok(Self { rv, zv, nr, nz })
    }

    /// The number of cells
    pub fn n_cells(&self) -> usize {
        self.nr * self.nz
    }

    /// The flat index for mesh indices `(i, k)`
    pub fn index(&self, i: usize, k: usize) -> usize {
        k + self.nz * i
    }

    /// The mesh indices for a flat index
    pub fn invert_index(&self, m: usize) -> (usize, usize) {
        (m / self.nz, m % self.nz)
    }

    /// The volume of cell `m`
    pub fn volume(&self, m: usize) -> f64 {
        if m >= self.n_cells() {
            return 0.0;
        }
        let (i, k) = self.invert_index(m);
        PI * (self.zv[k + 1] - self.zv[k])
            * (self.rv[i + 1] - self.rv[i])
            * (self.rv[i + 1] + self.rv[i])
    }

    /// The cell containing a position, or `None` outside the grid
    pub fn which_cell(&self, position: &Position) -> Option<usize> {
        let i = locate_fail(&self.rv, position.cyl_radius())?;
        let k = locate_fail(&self.zv, position.height())?;
        Some(self.index(i, k))
    }

    /// The centre of cell `m`, at azimuth zero
    pub fn central_position(&self, m: usize) -> Result<Position> {
        self.check_cell(m)?;
        let (i, k) = self.invert_index(m);
        Ok(Position::from_cylindrical(
            0.5 * (self.rv[i] + self.rv[i + 1]),
            0.0,
            0.5 * (self.zv[k] + self.zv[k + 1]),
        ))
    }

    /// A random position inside the torus of cell `m`
    pub fn random_position(&self, m: usize, random: &mut Random) -> Result<Position> {
        self.check_cell(m)?;
        let (i, k) = self.invert_index(m);
        let radius = self.rv[i] + (self.rv[i + 1] - self.rv[i]) * random.uniform();
        let phi = 2.0 * PI * random.uniform();
        let z = self.zv[k] + (self.zv[k + 1] - self.zv[k]) * random.uniform();
        Ok(Position::from_cylindrical(radius, phi, z))
    }

    /// The bounding box of the whole grid
    pub fn bounding_box(&self) -> Box3 {
        let rmax = self.rv[self.nr];
        Box3::new(
            -rmax,
            -rmax,
            self.zv[0],
            rmax,
            rmax,
            self.zv[self.nz],
        )
    }

    /// Trace a ray through the grid
    ///
    /// The traversal works in the `(p, q, z)` parametrisation, where `q`
    /// is the distance along the projection of the direction onto the
    /// equatorial plane and `p` is the impact parameter with respect to
    /// the z-axis. The radial index decreases until the ray reaches its
    /// closest approach to the axis and increases afterwards.
    pub fn path(&self, position: &Position, direction: &Direction) -> GridPath {
        let mut path = GridPath::new(*position, *direction);
        let (kx, ky, kz) = direction.cartesian();
        // avoid moving exactly parallel to the equatorial plane or axis
        let kz = if kz == 0.0 { 1e-20 } else { kz };
        let kq = {
            let kq = kx.hypot(ky);
            if kq == 0.0 {
                1e-20
            } else {
                kq
            }
        };

        let (x, y, mut z) = position.cartesian();
        let mut big_r = position.cyl_radius();
        let mut q = (x * kx + y * ky) / kq;
        // p >= 0 can fail by rounding when the point sits on the axis
        let p = (big_r - q) * (big_r + q);
        let p = p.max(0.0).sqrt();

        let rmax = self.rv[self.nr];
        let (zmin, zmax) = (self.zv[0], self.zv[self.nz]);

        // move an exterior starting point onto the boundary cylinder
        if big_r >= rmax {
            if q > 0.0 || p > rmax {
                return path;
            }
            big_r = rmax - 1e-8 * (self.rv[self.nr] - self.rv[self.nr - 1]);
            let qmax = ((rmax - p) * (rmax + p)).sqrt();
            let ds = (-qmax - q) / kq;
            path.add_segment(None, ds);
            q = -qmax;
            z += kz * ds;
        }
        if z < zmin {
            if kz <= 0.0 {
                path.clear();
                return path;
            }
            let ds = (zmin - z) / kz;
            path.add_segment(None, ds);
            q += kq * ds;
            big_r = p.hypot(q);
            z = zmin + 1e-8 * (self.zv[1] - self.zv[0]);
        } else if z > zmax {
            if kz >= 0.0 {
                path.clear();
                return path;
            }
            let ds = (zmax - z) / kz;
            path.add_segment(None, ds);
            q += kq * ds;
            big_r = p.hypot(q);
            z = zmax - 1e-8 * (self.zv[self.nz] - self.zv[self.nz - 1]);
        }
        if !big_r.is_finite() || !z.is_finite() || big_r >= rmax || z <= zmin || z >= zmax {
            path.clear();
            return path;
        }

        let mut i = locate_clip(&self.rv, big_r);
        let mut k = locate_clip(&self.zv, z);

        // the two movement scenarios share the inward/outward structure
        let upward = kz >= 0.0;

        // inward part, while the ray still approaches the axis
        if q < 0.0 {
            let imin = locate_clip(&self.rv, p);
            while i > imin {
                let rn = self.rv[i];
                let qn = -((rn - p) * (rn + p)).max(0.0).sqrt();
                let zn = if upward { self.zv[k + 1] } else { self.zv[k] };
                let dsq = (qn - q) / kq;
                let dsz = (zn - z) / kz;
                if dsq < dsz {
                    path.add_segment(Some(self.index(i, k)), dsq);
                    i -= 1;
                    q = qn;
                    z += kz * dsq;
                } else {
                    path.add_segment(Some(self.index(i, k)), dsz);
                    if upward {
                        k += 1;
                        if k >= self.nz {
                            return path;
                        }
                    } else {
                        if k == 0 {
                            return path;
                        }
                        k -= 1;
                    }
                    q += kq * dsz;
                    z = zn;
                }
            }
        }

        // outward part, radial index monotonically increasing
        loop {
            let rn = self.rv[i + 1];
            let qn = ((rn - p) * (rn + p)).max(0.0).sqrt();
            let zn = if upward { self.zv[k + 1] } else { self.zv[k] };
            let dsq = (qn - q) / kq;
            let dsz = (zn - z) / kz;
            if dsq < dsz {
                path.add_segment(Some(self.index(i, k)), dsq);
                i += 1;
                if i >= self.nr {
                    return path;
                }
                q = qn;
                z += kz * dsq;
            } else {
                path.add_segment(Some(self.index(i, k)), dsz);
                if upward {
                    k += 1;
                    if k >= self.nz {
                        return path;
                    }
                } else {
                    if k == 0 {
                        return path;
                    }
                    k -= 1;
                }
                q += kq * dsz;
                z = zn;
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_grid() -> CylinderGrid {
        CylinderGrid::new(vec![0.0, 1.0, 2.0], vec![-1.0, 0.0, 1.0]).unwrap()
    }

    #[test]
    fn volumes_fill_the_cylinder() {
        let grid = simple_grid();
        let total: f64 = (0..grid.n_cells()).map(|m| grid.volume(m)).sum();
        let expected = PI * 4.0 * 2.0;
        assert!((total - expected).abs() < 1e-12);
    }

    #[test]
    fn diametral_ray_crosses_all_radial_cells() {
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(-5.0, 0.0, 0.5),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let segments = path.segments();
        // entry gap of 3, then the ray crosses 1,0,0,1 radially at z-bin 1
        assert_eq!(segments[0].cell, None);
        assert!((segments[0].ds - 3.0).abs() < 1e-6);
        let cells: Vec<_> = segments[1..].iter().map(|s| s.cell.unwrap()).collect();
        assert_eq!(cells, vec![grid.index(1, 1), grid.index(0, 1), grid.index(1, 1)]);
        assert!((path.tagged_length() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn vertical_ray_stays_in_one_radial_bin() {
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(0.5, 0.0, -5.0),
            &Direction::new(0.0, 0.0, 1.0).unwrap(),
        );
        let segments = path.segments();
        assert_eq!(segments[0].cell, None);
        assert!((segments[0].ds - 4.0).abs() < 1e-6);
        let cells: Vec<_> = segments[1..].iter().map(|s| s.cell.unwrap()).collect();
        assert_eq!(cells, vec![grid.index(0, 0), grid.index(0, 1)]);
        assert!((path.tagged_length() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn tangent_rays_miss_the_grid() {
        let grid = simple_grid();
        let path = grid.path(
            &Position::new(-5.0, 2.5, 0.5),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn chord_length_is_conserved() {
        let grid = simple_grid();
        let direction = Direction::new(1.0, 0.3, 0.2).unwrap();
        let start = Position::new(-0.7, 0.1, -0.4);
        let path = grid.path(&start, &direction);
        assert!(!path.is_empty());
        // the exit point lies on the boundary cylinder or a z border
        let end = path.position_at(path.total_length());
        let on_rim = (end.cyl_radius() - 2.0).abs() < 1e-6;
        let on_cap = (end.height() - 1.0).abs() < 1e-6 || (end.height() + 1.0).abs() < 1e-6;
        assert!(on_rim || on_cap);
    }
}
