//! The polymorphic dust grid

use crate::cartesian::CartesianGrid;
use crate::cylinder::CylinderGrid;
use crate::error::Result;
use crate::path::GridPath;
use crate::sphere1d::Sphere1DGrid;
use crate::sphere2d::Sphere2DGrid;
use crate::twophase::TwoPhaseGrid;
use dustrt_numeric::{Box3, Direction, Position, Random};

/// A spatial grid partitioning a bounded region into numbered cells
///
/// All concrete grids share the same contract: a bijection between flat
/// cell numbers and mesh indices, cell volumes, position-to-cell lookup,
/// representative and random in-cell positions, and the ray traversal
/// producing an ordered [`GridPath`].
#[derive(Debug, Clone, PartialEq)]
pub enum DustGrid {
    /// A 3-D axis-aligned Cartesian grid
    Cartesian(CartesianGrid),
    /// A 2-D cylindrical grid
    Cylinder2D(CylinderGrid),
    /// A 2-D spherical grid
    Sphere2D(Sphere2DGrid),
    /// A 1-D spherical shell grid
    Sphere1D(Sphere1DGrid),
    /// A Cartesian grid with per-cell two-phase weights
    TwoPhase(TwoPhaseGrid),
}

impl DustGrid {
    /// The symmetry dimension the grid can represent
    pub fn dimension(&self) -> u8 {
        match self {
            Self::Cartesian(_) | Self::TwoPhase(_) => 3,
            Self::Cylinder2D(_) | Self::Sphere2D(_) => 2,
            Self::Sphere1D(_) => 1,
        }
    }

    /// The number of cells
    pub fn n_cells(&self) -> usize {
        match self {
            Self::Cartesian(g) => g.n_cells(),
            Self::Cylinder2D(g) => g.n_cells(),
            Self::Sphere2D(g) => g.n_cells(),
            Self::Sphere1D(g) => g.n_cells(),
            Self::TwoPhase(g) => g.inner().n_cells(),
        }
    }

    /// The volume of cell `m`; zero for out-of-range indices
    pub fn volume(&self, m: usize) -> f64 {
        match self {
            Self::Cartesian(g) => g.volume(m),
            Self::Cylinder2D(g) => g.volume(m),
            Self::Sphere2D(g) => g.volume(m),
            Self::Sphere1D(g) => g.volume(m),
            Self::TwoPhase(g) => g.inner().volume(m),
        }
    }

    /// The cell containing a position, or `None` outside the grid
    pub fn which_cell(&self, position: &Position) -> Option<usize> {
        match self {
            Self::Cartesian(g) => g.which_cell(position),
            Self::Cylinder2D(g) => g.which_cell(position),
            Self::Sphere2D(g) => g.which_cell(position),
            Self::Sphere1D(g) => g.which_cell(position),
            Self::TwoPhase(g) => g.inner().which_cell(position),
        }
    }

    /// A representative central position in cell `m`
    pub fn central_position(&self, m: usize) -> Result<Position> {
        match self {
            Self::Cartesian(g) => g.central_position(m),
            Self::Cylinder2D(g) => g.central_position(m),
            Self::Sphere2D(g) => g.central_position(m),
            Self::Sphere1D(g) => g.central_position(m),
            Self::TwoPhase(g) => g.inner().central_position(m),
        }
    }

    /// A random position inside cell `m`
    pub fn random_position(&self, m: usize, random: &mut Random) -> Result<Position> {
        match self {
            Self::Cartesian(g) => g.random_position(m, random),
            Self::Cylinder2D(g) => g.random_position(m, random),
            Self::Sphere2D(g) => g.random_position(m, random),
            Self::Sphere1D(g) => g.random_position(m, random),
            Self::TwoPhase(g) => g.inner().random_position(m, random),
        }
    }

    /// The density-contrast weight of cell `m`; one unless two-phase
    pub fn weight(&self, m: usize) -> f64 {
        match self {
            Self::TwoPhase(g) => g.weight(m),
            _ => 1.0,
        }
    }

    /// The bounding box of the gridded region
    pub fn bounding_box(&self) -> Box3 {
        match self {
            Self::Cartesian(g) => g.bounding_box(),
            Self::Cylinder2D(g) => g.bounding_box(),
            Self::Sphere2D(g) => g.bounding_box(),
            Self::Sphere1D(g) => g.bounding_box(),
            Self::TwoPhase(g) => g.inner().bounding_box(),
        }
    }

    /// Trace a ray through the grid
    pub fn path(&self, position: &Position, direction: &Direction) -> GridPath {
        match self {
            Self::Cartesian(g) => g.path(position, direction),
            Self::Cylinder2D(g) => g.path(position, direction),
            Self::Sphere2D(g) => g.path(position, direction),
            Self::Sphere1D(g) => g.path(position, direction),
            Self::TwoPhase(g) => g.inner().path(position, direction),
        }
    }
}

impl std::fmt::Display for DustGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        use dustrt_utils::ValueExt;

        let kind = match self {
            Self::Cartesian(_) => "Cartesian",
            Self::Cylinder2D(_) => "Cylinder2D",
            Self::Sphere2D(_) => "Sphere2D",
            Self::Sphere1D(_) => "Sphere1D",
            Self::TwoPhase(_) => "TwoPhase",
        };
        let bounds = self.bounding_box();
        write!(
            f,
            " > DustGrid [{kind}] {} cells, x: {} - {} m",
            self.n_cells(),
            bounds.xmin().sci(2, 2),
            bounds.xmax().sci(2, 2)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_default_to_unity() {
        let grid = DustGrid::Sphere1D(Sphere1DGrid::new(vec![0.0, 1.0]).unwrap());
        assert_eq!(grid.weight(0), 1.0);
        assert_eq!(grid.dimension(), 1);
    }

    #[test]
    fn volume_sums_match_across_grid_kinds() {
        let cartesian = DustGrid::Cartesian(
            CartesianGrid::new(
                vec![-1.0, 0.5, 1.0],
                vec![-1.0, 1.0],
                vec![-2.0, 0.0, 2.0],
            )
            .unwrap(),
        );
        let total: f64 = (0..cartesian.n_cells()).map(|m| cartesian.volume(m)).sum();
        assert!((total - cartesian.bounding_box().volume()).abs() < 1e-12);
    }
}
