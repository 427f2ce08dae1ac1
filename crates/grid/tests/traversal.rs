//! Integration tests for the reference traversal scenarios

use dustrt_grid::{CartesianGrid, CylinderGrid, DustGrid, Sphere1DGrid, Sphere2DGrid};
use dustrt_numeric::{Direction, Position};
use rstest::rstest;
use std::f64::consts::PI;

fn unit_cartesian() -> DustGrid {
    DustGrid::Cartesian(
        CartesianGrid::new(
            vec![-1.0, 0.0, 1.0],
            vec![-1.0, 0.0, 1.0],
            vec![-1.0, 0.0, 1.0],
        )
        .unwrap(),
    )
}

#[test]
fn cartesian_reference_path() {
    // start (-2, 0.5, 0.5), direction +x: one pre-entry segment of
    // length 1, then two unit segments in cells (0,1,1) and (1,1,1)
    let grid = unit_cartesian();
    let path = grid.path(
        &Position::new(-2.0, 0.5, 0.5),
        &Direction::new(1.0, 0.0, 0.0).unwrap(),
    );

    let segments = path.segments();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].cell, None);
    assert!((segments[0].ds - 1.0).abs() < 1e-9);
    // m = k + Nz j + Nz Ny i with Nz = Ny = 2
    assert_eq!(segments[1].cell, Some(1 + 2 * 1));
    assert_eq!(segments[2].cell, Some(1 + 2 * 1 + 4));
    for segment in &segments[1..] {
        assert!((segment.ds - 1.0).abs() < 1e-7);
    }
    assert!((path.tagged_length() - 2.0).abs() < 1e-7);
}

#[test]
fn spherical_shell_reference_path() {
    // borders [0,1,2,3], start (-5,0,0), direction +x: a pre-entry
    // segment of length 2, then six unit segments over shells 2,1,0,0,1,2
    let grid = DustGrid::Sphere1D(Sphere1DGrid::new(vec![0.0, 1.0, 2.0, 3.0]).unwrap());
    let path = grid.path(
        &Position::new(-5.0, 0.0, 0.0),
        &Direction::new(1.0, 0.0, 0.0).unwrap(),
    );

    let segments = path.segments();
    assert_eq!(segments[0].cell, None);
    assert!((segments[0].ds - 2.0).abs() < 1e-7);
    let cells: Vec<usize> = segments[1..].iter().map(|s| s.cell.unwrap()).collect();
    assert_eq!(cells, vec![2, 1, 0, 0, 1, 2]);
    for segment in &segments[1..] {
        assert!((segment.ds - 1.0).abs() < 1e-6);
    }
}

fn grids() -> Vec<DustGrid> {
    vec![
        unit_cartesian(),
        DustGrid::Cylinder2D(
            CylinderGrid::new(vec![0.0, 0.4, 1.0], vec![-1.0, 0.0, 1.0]).unwrap(),
        ),
        DustGrid::Sphere2D(
            Sphere2DGrid::new(vec![0.0, 0.5, 1.0], vec![0.0, PI / 4.0, PI]).unwrap(),
        ),
        DustGrid::Sphere1D(Sphere1DGrid::new(vec![0.0, 0.3, 0.7, 1.0]).unwrap()),
    ]
}

#[rstest]
#[case(Position::new(-3.0, 0.1, 0.2), Direction::new(1.0, 0.05, -0.1).unwrap())]
#[case(Position::new(2.5, -2.0, 0.4), Direction::new(-0.8, 0.7, -0.1).unwrap())]
#[case(Position::new(0.1, 0.05, -3.0), Direction::new(0.02, -0.03, 1.0).unwrap())]
fn segments_agree_with_cell_lookup(#[case] start: Position, #[case] direction: Direction) {
    // for every grid and every entering ray, the midpoint of each
    // recorded segment must map back to the segment's cell
    for grid in grids() {
        let path = grid.path(&start, &direction);
        if path.is_empty() {
            continue;
        }
        let mut s = 0.0;
        for segment in path.segments() {
            let midpoint = path.position_at(s + 0.5 * segment.ds);
            if let Some(cell) = segment.cell {
                assert_eq!(
                    grid.which_cell(&midpoint),
                    Some(cell),
                    "segment midpoint in the wrong cell for dimension {}",
                    grid.dimension()
                );
            } else {
                assert_eq!(grid.which_cell(&midpoint), None);
            }
            s += segment.ds;
        }
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[case(3)]
fn cell_volumes_sum_to_the_domain(#[case] index: usize) {
    let all = grids();
    let grid = &all[index];
    let total: f64 = (0..grid.n_cells()).map(|m| grid.volume(m)).sum();
    let expected = match grid {
        DustGrid::Cartesian(_) | DustGrid::TwoPhase(_) => grid.bounding_box().volume(),
        DustGrid::Cylinder2D(_) => PI * 1.0 * 2.0,
        DustGrid::Sphere2D(_) | DustGrid::Sphere1D(_) => 4.0 / 3.0 * PI,
    };
    assert!((total - expected).abs() < 1e-10 * expected);
}

#[test]
fn wall_started_rays_behave_like_nudged_interior_starts() {
    for grid in grids() {
        let direction = Direction::new(0.3, 0.2, 1.0).unwrap();
        let on_wall = grid.path(&Position::new(0.0, 0.0, 0.0), &direction);
        let nudged = grid.path(
            &Position::new(3e-9 * 0.3, 2e-9 * 0.2, 1e-8),
            &direction,
        );
        assert!(
            (on_wall.total_length() - nudged.total_length()).abs() < 1e-6,
            "wall start diverges for dimension {}",
            grid.dimension()
        );
    }
}
