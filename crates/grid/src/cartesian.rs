//! The three-dimensional axis-aligned Cartesian grid

use crate::error::{Error, Result};
use crate::path::GridPath;
use dustrt_numeric::{locate_clip, locate_fail, Box3, Direction, Position, Random};

/// A Cartesian grid built from three independent one-dimensional meshes
///
/// The flat cell number is `m = k + Nz j + Nz Ny i` for mesh indices
/// `(i, j, k)` along x, y and z.
#[derive(Debug, Clone, PartialEq)]
pub struct CartesianGrid {
    xv: Vec<f64>,
    yv: Vec<f64>,
    zv: Vec<f64>,
    nx: usize,
    ny: usize,
    nz: usize,
}

impl CartesianGrid {
    /// Initialise from the border meshes along the three axes
    pub fn new(xv: Vec<f64>, yv: Vec<f64>, zv: Vec<f64>) -> Result<Self> {
        check_mesh("CartesianGrid", "x", &xv)?;
        check_mesh("CartesianGrid", "y", &yv)?;
        check_mesh("CartesianGrid", "z", &zv)?;
        let (nx, ny, nz) = (xv.len() - 1, yv.len() - 1, zv.len() - 1);
        Ok(Self {
            xv,
            yv,
            zv,
            nx,
            ny,
            nz,
        })
    }

    /// The number of cells
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// The flat index for mesh indices `(i, j, k)`
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        k + self.nz * j + self.nz * self.ny * i
    }

    /// The mesh indices for a flat index
    pub fn invert_index(&self, m: usize) -> (usize, usize, usize) {
        let i = m / (self.nz * self.ny);
        let j = (m / self.nz) % self.ny;
        let k = m % self.nz;
        (i, j, k)
    }

    /// The extent of cell `m`
    pub fn cell_box(&self, m: usize) -> Result<Box3> {
        if m >= self.n_cells() {
            return Err(Error::CellOutOfRange {
                index: m,
                count: self.n_cells(),
            });
        }
        let (i, j, k) = self.invert_index(m);
        Ok(Box3::new(
            self.xv[i],
            self.yv[j],
            self.zv[k],
            self.xv[i + 1],
            self.yv[j + 1],
            self.zv[k + 1],
        ))
    }

    /// The volume of cell `m`
    pub fn volume(&self, m: usize) -> f64 {
        self.cell_box(m).map(|b| b.volume()).unwrap_or(0.0)
    }

    /// The cell containing a position, or `None` outside the grid
    pub fn which_cell(&self, position: &Position) -> Option<usize> {
        let i = locate_fail(&self.xv, position.x())?;
        let j = locate_fail(&self.yv, position.y())?;
        let k = locate_fail(&self.zv, position.z())?;
        Some(self.index(i, j, k))
    }

    /// The centre of cell `m`
    pub fn central_position(&self, m: usize) -> Result<Position> {
        Ok(self.cell_box(m)?.center())
    }

    /// A uniformly distributed position inside cell `m`
    pub fn random_position(&self, m: usize, random: &mut Random) -> Result<Position> {
        Ok(random.position(&self.cell_box(m)?))
    }

    /// The bounding box of the whole grid
    pub fn bounding_box(&self) -> Box3 {
        Box3::new(
            self.xv[0],
            self.yv[0],
            self.zv[0],
            self.xv[self.nx],
            self.yv[self.ny],
            self.zv[self.nz],
        )
    }

    /// Trace a ray through the grid
    ///
    /// An exterior starting point contributes an untagged entry segment;
    /// a ray that misses the bounding box yields an empty path. Inside
    /// the grid, the next wall along each axis is considered and the
    /// closest one wins, with ties broken in x, y, z order so the total
    /// path length stays continuous across mesh corners.
    pub fn path(&self, position: &Position, direction: &Direction) -> GridPath {
        let mut path = GridPath::new(*position, *direction);
        let (kx, ky, kz) = direction.cartesian();
        let (mut x, mut y, mut z) = position.cartesian();

        let (xmin, xmax) = (self.xv[0], self.xv[self.nx]);
        let (ymin, ymax) = (self.yv[0], self.yv[self.ny]);
        let (zmin, zmax) = (self.zv[0], self.zv[self.nz]);

        // move an exterior starting point onto the bounding box, with a
        // small inward nudge relative to the boundary bin width
        if x < xmin {
            if kx <= 0.0 {
                return path;
            }
            let ds = (xmin - x) / kx;
            path.add_segment(None, ds);
            x = xmin + 1e-8 * (self.xv[1] - self.xv[0]);
            y += ky * ds;
            z += kz * ds;
        } else if x > xmax {
            if kx >= 0.0 {
                return path;
            }
            let ds = (xmax - x) / kx;
            path.add_segment(None, ds);
            x = xmax - 1e-8 * (self.xv[self.nx] - self.xv[self.nx - 1]);
            y += ky * ds;
            z += kz * ds;
        }
        if y < ymin {
            if ky <= 0.0 {
                path.clear();
                return path;
            }
            let ds = (ymin - y) / ky;
            path.add_segment(None, ds);
            x += kx * ds;
            y = ymin + 1e-8 * (self.yv[1] - self.yv[0]);
            z += kz * ds;
        } else if y > ymax {
            if ky >= 0.0 {
                path.clear();
                return path;
            }
            let ds = (ymax - y) / ky;
            path.add_segment(None, ds);
            x += kx * ds;
            y = ymax - 1e-8 * (self.yv[self.ny] - self.yv[self.ny - 1]);
            z += kz * ds;
        }
        if z < zmin {
            if kz <= 0.0 {
                path.clear();
                return path;
            }
            let ds = (zmin - z) / kz;
            path.add_segment(None, ds);
            x += kx * ds;
            y += ky * ds;
            z = zmin + 1e-8 * (self.zv[1] - self.zv[0]);
        } else if z > zmax {
            if kz >= 0.0 {
                path.clear();
                return path;
            }
            let ds = (zmax - z) / kz;
            path.add_segment(None, ds);
            x += kx * ds;
            y += ky * ds;
            z = zmax - 1e-8 * (self.zv[self.nz] - self.zv[self.nz - 1]);
        }

        if x < xmin || x > xmax || y < ymin || y > ymax || z < zmin || z > zmax {
            path.clear();
            return path;
        }

        let mut i = locate_clip(&self.xv, x);
        let mut j = locate_clip(&self.yv, y);
        let mut k = locate_clip(&self.zv, z);

        loop {
            let m = self.index(i, j, k);
            let x_wall = if kx < 0.0 { self.xv[i] } else { self.xv[i + 1] };
            let y_wall = if ky < 0.0 { self.yv[j] } else { self.yv[j + 1] };
            let z_wall = if kz < 0.0 { self.zv[k] } else { self.zv[k + 1] };
            let dsx = if kx.abs() > 1e-15 {
                (x_wall - x) / kx
            } else {
                f64::MAX
            };
            let dsy = if ky.abs() > 1e-15 {
                (y_wall - y) / ky
            } else {
                f64::MAX
            };
            let dsz = if kz.abs() > 1e-15 {
                (z_wall - z) / kz
            } else {
                f64::MAX
            };

            if dsx <= dsy && dsx <= dsz {
                path.add_segment(Some(m), dsx);
                if kx < 0.0 {
                    if i == 0 {
                        return path;
                    }
                    i -= 1;
                } else {
                    i += 1;
                    if i >= self.nx {
                        return path;
                    }
                }
                x = x_wall;
                y += ky * dsx;
                z += kz * dsx;
            } else if dsy < dsx && dsy <= dsz {
                path.add_segment(Some(m), dsy);
                if ky < 0.0 {
                    if j == 0 {
                        return path;
                    }
                    j -= 1;
                } else {
                    j += 1;
                    if j >= self.ny {
                        return path;
                    }
                }
                x += kx * dsy;
                y = y_wall;
                z += kz * dsy;
            } else {
                path.add_segment(Some(m), dsz);
                if kz < 0.0 {
                    if k == 0 {
                        return path;
                    }
                    k -= 1;
                } else {
                    k += 1;
                    if k >= self.nz {
                        return path;
                    }
                }
                x += kx * dsz;
                y += ky * dsz;
                z = z_wall;
            }
        }
    }
}

pub(crate) fn check_mesh(
    component: &'static str,
    axis: &'static str,
    borders: &[f64],
) -> Result<()> {
    if borders.len() < 2 {
        return Err(Error::TooFewBorders {
            component,
            axis,
            minimum: 2,
            found: borders.len(),
        });
    }
    if borders.windows(2).any(|w| w[1] <= w[0]) {
        return Err(Error::UnsortedBorders { component, axis });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> CartesianGrid {
        CartesianGrid::new(
            vec![-1.0, 0.0, 1.0],
            vec![-1.0, 0.0, 1.0],
            vec![-1.0, 0.0, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn volumes_fill_the_bounding_box() {
        let grid = unit_grid();
        let total: f64 = (0..grid.n_cells()).map(|m| grid.volume(m)).sum();
        assert!((total - grid.bounding_box().volume()).abs() < 1e-12);
    }

    #[test]
    fn cell_lookup_round_trips() {
        let grid = unit_grid();
        for m in 0..grid.n_cells() {
            let center = grid.central_position(m).unwrap();
            assert_eq!(grid.which_cell(&center), Some(m));
        }
        assert_eq!(grid.which_cell(&Position::new(2.0, 0.0, 0.0)), None);
    }

    #[test]
    fn exterior_ray_enters_with_an_untagged_gap() {
        // the reference traversal: start outside at (-2, 0.5, 0.5)
        // heading +x crosses cells (0,1,1) and (1,1,1)
        let grid = unit_grid();
        let path = grid.path(
            &Position::new(-2.0, 0.5, 0.5),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        let segments = path.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].cell, None);
        assert!((segments[0].ds - 1.0).abs() < 1e-9);
        assert_eq!(segments[1].cell, Some(grid.index(0, 1, 1)));
        assert_eq!(segments[2].cell, Some(grid.index(1, 1, 1)));
        assert!((path.tagged_length() - 2.0).abs() < 1e-7);
    }

    #[test]
    fn missing_rays_return_empty_paths() {
        let grid = unit_grid();
        // pointing away from the box
        let path = grid.path(
            &Position::new(-2.0, 0.0, 0.0),
            &Direction::new(-1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
        // passing beside the box
        let path = grid.path(
            &Position::new(-2.0, 5.0, 0.0),
            &Direction::new(1.0, 0.0, 0.0).unwrap(),
        );
        assert!(path.is_empty());
    }

    #[test]
    fn path_length_matches_the_chord() {
        let grid = unit_grid();
        let direction = Direction::new(1.0, 1.0, 1.0).unwrap();
        let path = grid.path(&Position::new(-0.9, -0.9, -0.9), &direction);
        // the chord from the interior point to the +corner exit
        let expected = (3.0_f64).sqrt() * 1.9;
        assert!((path.total_length() - expected).abs() < 1e-7);
    }

    #[test]
    fn wall_started_rays_match_interior_starts() {
        let grid = unit_grid();
        let direction = Direction::new(1.0, 0.0, 0.0).unwrap();
        let on_wall = grid.path(&Position::new(0.0, 0.5, 0.5), &direction);
        let inside = grid.path(&Position::new(1e-9, 0.5, 0.5), &direction);
        assert!((on_wall.total_length() - inside.total_length()).abs() < 1e-6);
    }
}
