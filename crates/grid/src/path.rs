//! The segment list produced by tracing a ray through a grid

use dustrt_numeric::{Direction, Position};

/// One traversal segment: the cell crossed and the length inside it
///
/// A `cell` of `None` tags the gap between the starting position and the
/// grid's entry point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// The crossed cell, or `None` outside any cell
    pub cell: Option<usize>,
    /// The path length within the cell
    pub ds: f64,
}

/// A ray traced through a grid as an ordered list of segments
///
/// The builder is append-only: traversal routines push `(cell, ds)`
/// pairs in the order the ray crosses them.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPath {
    position: Position,
    direction: Direction,
    segments: Vec<Segment>,
}

impl GridPath {
    /// Start an empty path at a position along a direction
    pub fn new(position: Position, direction: Direction) -> Self {
        Self {
            position,
            direction,
            segments: Vec::new(),
        }
    }

    /// The starting position of the ray
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// The direction of the ray
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// Drop all recorded segments
    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Append a segment; non-positive lengths are ignored
    pub fn add_segment(&mut self, cell: Option<usize>, ds: f64) {
        if ds > 0.0 {
            self.segments.push(Segment { cell, ds });
        }
    }

    /// The recorded segments, in traversal order
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the ray never enters the grid
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The total length of all segments, including any entry gap
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.ds).sum()
    }

    /// The total length inside cells (the entry gap excluded)
    pub fn tagged_length(&self) -> f64 {
        self.segments
            .iter()
            .filter(|s| s.cell.is_some())
            .map(|s| s.ds)
            .sum()
    }

    /// The point a distance `s` from the start along the direction
    pub fn position_at(&self, s: f64) -> Position {
        self.position.shifted(&self.direction, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_split_by_tag() {
        let mut path = GridPath::new(Position::origin(), Direction::z_axis());
        path.add_segment(None, 2.0);
        path.add_segment(Some(0), 1.0);
        path.add_segment(Some(1), 0.5);
        // zero and negative lengths are dropped
        path.add_segment(Some(2), 0.0);
        path.add_segment(Some(2), -1.0);

        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.total_length(), 3.5);
        assert_eq!(path.tagged_length(), 1.5);
    }

    #[test]
    fn position_interpolation_follows_the_ray() {
        let path = GridPath::new(
            Position::new(0.0, 0.0, -1.0),
            Direction::z_axis(),
        );
        let p = path.position_at(2.5);
        assert_eq!(p.cartesian(), (0.0, 0.0, 1.5));
    }
}
