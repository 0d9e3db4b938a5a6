// Flattens the quadrant-symmetric structure onto a square grid: each grid
// row is an affine morph of the equator-orthogonal composite axis, pinned to
// three reference points that sweep from one pole arc to the other.

use log::warn;

use crate::config::EquatorChoice;
use crate::errors::{Result, WingMorphError};
use crate::geometry::{self, Point};
use crate::grid::Grid;
use crate::snake::SplineSnakeModel;
use crate::spline::PlanarCubicSpline;
use crate::structure::BoundaryCurve;

/// Determinant threshold below which the morph reference triple is treated
/// as collinear (smallest normal f32 neighborhood)
const COLLINEARITY_EPS: f64 = 1.192_092_8e-7;

/// Which designated boundary curve runs along the grid equator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquatorMode {
    /// The first designated boundary is the equator
    BoundaryA,
    /// The second designated boundary is the equator
    BoundaryB,
}

impl From<EquatorChoice> for EquatorMode {
    fn from(choice: EquatorChoice) -> EquatorMode {
        match choice {
            EquatorChoice::A => EquatorMode::BoundaryA,
            EquatorChoice::B => EquatorMode::BoundaryB,
        }
    }
}

/// Arc-length parameterized trace of one spoke axis, ordered center to rim,
/// obtained by sampling the natural cubic spline through its anchor chain
fn axis_trace(snake: &SplineSnakeModel, spoke: usize, n_points: usize) -> Vec<Point> {
    let m0 = snake.control_points_per_segment();

    let mut anchors = Vec::with_capacity(m0 + 1);
    anchors.push(snake.anchor_on_contour(spoke));
    anchors.extend_from_slice(snake.spoke_nodes(spoke));
    anchors.push(snake.pouch_center());

    let spline = PlanarCubicSpline::through(&anchors);
    let trace: Vec<Point> = (0..n_points)
        .map(|i| {
            let t = m0 as f64 * (1.0 - i as f64 / (n_points - 1) as f64);
            spline.point_at(t)
        })
        .collect();
    geometry::arc_length_resample(&trace, n_points)
}

/// Index of the axis whose rim endpoint is strictly nearest to the reference
/// point of a designated boundary
fn assign_role(reference: &Point, endpoints: &[Point; 4], boundary: &str) -> Result<usize> {
    let distances: Vec<f64> = endpoints
        .iter()
        .map(|e| geometry::distance(reference, e))
        .collect();

    for (i, &d) in distances.iter().enumerate() {
        let strictly_nearest = distances
            .iter()
            .enumerate()
            .all(|(j, &other)| j == i || d < other);
        if strictly_nearest {
            return Ok(i);
        }
    }
    Err(WingMorphError::AmbiguousRoleAssignment(format!(
        "reference point of boundary '{}' is equidistant from several axis endpoints",
        boundary
    )))
}

/// Exterior arc running from the anchor of spoke `from` to the anchor of
/// spoke `to`. Arc k of the snake connects anchors k and k+1; non-adjacent
/// spokes share no arc.
fn resolve_arch(arcs: &[Vec<Point>; 4], from: usize, to: usize) -> Result<Vec<Point>> {
    if to == (from + 1) % 4 {
        Ok(arcs[from].clone())
    } else if from == (to + 1) % 4 {
        Ok(geometry::reverse(&arcs[to]))
    } else {
        Err(WingMorphError::UnresolvedArc(format!(
            "no exterior arc connects spokes {} and {}",
            from, to
        )))
    }
}

/// Affine morph of the composite axis (top joined to bottom through the
/// shared center) such that the transformed curve interpolates `p`, `q` and
/// `r`: rim of the top axis, center, rim of the bottom axis.
///
/// A collinear reference triple leaves the transform underdetermined; the
/// rim reference is then perturbed by one pixel and the transform is
/// recomputed in full.
fn morph_axis(top: &[Point], bottom: &[Point], p: &Point, q: &Point, r: &Point) -> Vec<Point> {
    let n = top.len();
    let mut p0 = top[n - 1];
    let q0 = top[0];
    let r0 = bottom[n - 1];

    let mut d_pq0 = p0 - q0;
    let mut d_pr0 = p0 - r0;
    let mut det = d_pr0.y * d_pq0.x - d_pr0.x * d_pq0.y;
    if det.abs() < COLLINEARITY_EPS {
        warn!(
            "morph references ({:.3}, {:.3}), ({:.3}, {:.3}), ({:.3}, {:.3}) are collinear, reshaping",
            p0.x, p0.y, q0.x, q0.y, r0.x, r0.y
        );
        p0.x -= 1.0;
        d_pq0 = p0 - q0;
        d_pr0 = p0 - r0;
        det = d_pr0.y * d_pq0.x - d_pr0.x * d_pq0.y;
    }

    let d_pq = p - q;
    let d_pr = p - r;

    let a11 = (d_pr0.y * d_pq.x - d_pq0.y * d_pr.x) / det;
    let a12 = (-d_pr0.x * d_pq.x + d_pq0.x * d_pr.x) / det;
    let a21 = (d_pr0.y * d_pq.y - d_pq0.y * d_pr.y) / det;
    let a22 = (-d_pr0.x * d_pq.y + d_pq0.x * d_pr.y) / det;

    let b1 = (p.x + q.x - (a11 * (p0.x + q0.x) + a12 * (p0.y + q0.y))) / 2.0;
    let b2 = (p.y + q.y - (a21 * (p0.x + q0.x) + a22 * (p0.y + q0.y))) / 2.0;

    let map = |pt: &Point| Point::new(a11 * pt.x + a12 * pt.y + b1, a21 * pt.x + a22 * pt.y + b2);

    let mut morphed = Vec::with_capacity(2 * n - 1);
    for pt in top.iter().rev() {
        morphed.push(map(pt));
    }
    for pt in bottom.iter().skip(1) {
        morphed.push(map(pt));
    }
    morphed
}

/// Generates the flat spherical projection grid of a snake structure.
///
/// `boundary_a` and `boundary_b` are the two designated composite
/// boundaries; their first points pin the role of each snake spoke. The
/// resulting grid is square with side `2 * n_points - 1`; the central row is
/// the equator boundary named by `equator`.
pub fn generate_grid(
    snake: &SplineSnakeModel,
    boundary_a: &BoundaryCurve,
    boundary_b: &BoundaryCurve,
    equator: EquatorMode,
    n_points: usize,
) -> Result<Grid> {
    if n_points < 2 {
        return Err(WingMorphError::Parameter(
            "grid requires at least 2 points per half axis".to_string(),
        ));
    }
    let ref_a = boundary_a.first_point().ok_or_else(|| {
        WingMorphError::StructureIncomplete(format!("boundary '{}' is empty", boundary_a.name))
    })?;
    let ref_b = boundary_b.first_point().ok_or_else(|| {
        WingMorphError::StructureIncomplete(format!("boundary '{}' is empty", boundary_b.name))
    })?;

    let n = n_points;
    let axes: [Vec<Point>; 4] = [
        axis_trace(snake, 0, n),
        axis_trace(snake, 1, n),
        axis_trace(snake, 2, n),
        axis_trace(snake, 3, n),
    ];
    let endpoints = [
        axes[0][n - 1],
        axes[1][n - 1],
        axes[2][n - 1],
        axes[3][n - 1],
    ];

    // the spoke nearest each reference point and its opposite
    let a0 = assign_role(&ref_a, &endpoints, &boundary_a.name)?;
    let a1 = (a0 + 2) % 4;
    let b0 = assign_role(&ref_b, &endpoints, &boundary_b.name)?;
    let b1 = (b0 + 2) % 4;

    let arcs: [Vec<Point>; 4] = [
        geometry::arc_length_resample(&snake.exterior_arc(0), n),
        geometry::arc_length_resample(&snake.exterior_arc(1), n),
        geometry::arc_length_resample(&snake.exterior_arc(2), n),
        geometry::arc_length_resample(&snake.exterior_arc(3), n),
    ];

    // quadrant arcs between consecutive roles, pole to pole around the rim
    let arch_ab = resolve_arch(&arcs, a0, b0)?;
    let arch_ba = resolve_arch(&arcs, b0, a1)?;
    let arch_a1b1 = resolve_arch(&arcs, a1, b1)?;
    let arch_b1a = resolve_arch(&arcs, b1, a0)?;

    let side = 2 * n - 1;
    let mut grid = Grid::new(side);
    match equator {
        EquatorMode::BoundaryB => {
            // boundary B runs along the central row; rows sweep from the
            // pole at spoke a0 to the pole at spoke a1
            let (base_top, base_bottom) = (&axes[b0], &axes[b1]);
            for i in 0..n {
                let row = morph_axis(
                    base_top,
                    base_bottom,
                    &arch_ab[i],
                    &axes[a0][n - 1 - i],
                    &arch_b1a[n - 1 - i],
                );
                grid.set_row(i, &row);
            }
            for i in n..side {
                let row = morph_axis(
                    base_top,
                    base_bottom,
                    &arch_ba[i - n],
                    &axes[a1][i - n],
                    &arch_a1b1[side - i],
                );
                grid.set_row(i, &row);
            }
        }
        EquatorMode::BoundaryA => {
            let (base_top, base_bottom) = (&axes[a1], &axes[a0]);
            for i in 0..n {
                let row = morph_axis(
                    base_top,
                    base_bottom,
                    &arch_ba[i],
                    &axes[b0][n - 1 - i],
                    &arch_ab[n - 1 - i],
                );
                grid.set_row(i, &row);
            }
            for i in n..side {
                let row = morph_axis(
                    base_top,
                    base_bottom,
                    &arch_a1b1[i - n],
                    &axes[b1][i - n],
                    &arch_b1a[side - i],
                );
                grid.set_row(i, &row);
            }
        }
    }
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snake::SplineSnakeModel;
    use crate::structure::StructureGeometry;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::PI;

    fn circle_snake() -> SplineSnakeModel {
        // the pouch center sits off the circle center so that no rim/center
        // reference triple is collinear
        let pouch = [55.0, 47.0];
        let radius = 40.0;
        let outer: Vec<[f64; 2]> = (0..64)
            .map(|i| {
                let a = 2.0 * PI * i as f64 / 64.0;
                [50.0 + radius * a.cos(), 50.0 + radius * a.sin()]
            })
            .collect();
        let spoke = |rim: [f64; 2]| -> Vec<[f64; 2]> {
            (0..=4)
                .map(|i| {
                    let t = i as f64 / 4.0;
                    [
                        pouch[0] + t * (rim[0] - pouch[0]),
                        pouch[1] + t * (rim[1] - pouch[1]),
                    ]
                })
                .collect()
        };
        let geometry = StructureGeometry {
            outer_contour: outer,
            boundaries: [
                spoke([90.0, 50.0]),
                spoke([50.0, 90.0]),
                spoke([10.0, 50.0]),
                spoke([50.0, 10.0]),
            ],
            pouch_center: pouch,
            disc_center: [52.0, 48.0],
            image_width: 101,
            image_height: 101,
        };
        SplineSnakeModel::from_geometry(&geometry, 8, 1000).unwrap()
    }

    fn designated_boundaries(snake: &SplineSnakeModel) -> (BoundaryCurve, BoundaryCurve) {
        (
            BoundaryCurve::new("first", snake.boundary(0)),
            BoundaryCurve::new("second", snake.boundary(1)),
        )
    }

    #[test]
    fn grid_has_odd_square_side() {
        let snake = circle_snake();
        let (a, b) = designated_boundaries(&snake);
        let grid = generate_grid(&snake, &a, &b, EquatorMode::BoundaryA, 5).unwrap();
        assert_eq!(grid.side(), 9);
    }

    #[test]
    fn equator_row_traverses_the_reference_boundary() {
        let snake = circle_snake();
        let (a, b) = designated_boundaries(&snake);
        let n = 6;
        let grid = generate_grid(&snake, &a, &b, EquatorMode::BoundaryA, n).unwrap();

        // the central row of mode A runs from the anchor opposite boundary
        // A's reference, through the center, to the reference anchor
        let center_row = n - 1;
        let middle = grid.point(center_row, n - 1);
        assert_approx_eq!(middle.x, snake.pouch_center().x, 1e-6);
        assert_approx_eq!(middle.y, snake.pouch_center().y, 1e-6);

        let far = snake.anchor_on_contour(2);
        let near = snake.anchor_on_contour(0);
        let first = grid.point(center_row, 0);
        let last = grid.point(center_row, grid.side() - 1);
        assert_approx_eq!(first.x, far.x, 1e-6);
        assert_approx_eq!(first.y, far.y, 1e-6);
        assert_approx_eq!(last.x, near.x, 1e-6);
        assert_approx_eq!(last.y, near.y, 1e-6);
    }

    #[test]
    fn equator_mode_b_pins_the_other_boundary() {
        let snake = circle_snake();
        let (a, b) = designated_boundaries(&snake);
        let n = 6;
        let grid = generate_grid(&snake, &a, &b, EquatorMode::BoundaryB, n).unwrap();

        let center_row = n - 1;
        let first = grid.point(center_row, 0);
        let last = grid.point(center_row, grid.side() - 1);
        let near = snake.anchor_on_contour(1);
        let far = snake.anchor_on_contour(3);
        assert_approx_eq!(first.x, near.x, 1e-6);
        assert_approx_eq!(first.y, near.y, 1e-6);
        assert_approx_eq!(last.x, far.x, 1e-6);
        assert_approx_eq!(last.y, far.y, 1e-6);
    }

    #[test]
    fn empty_boundary_is_rejected() {
        let snake = circle_snake();
        let (a, _) = designated_boundaries(&snake);
        let empty = BoundaryCurve::new("empty", Vec::new());
        assert!(matches!(
            generate_grid(&snake, &a, &empty, EquatorMode::BoundaryA, 5),
            Err(WingMorphError::StructureIncomplete(_))
        ));
    }

    #[test]
    fn identical_references_leave_arcs_unresolved() {
        let snake = circle_snake();
        let (a, _) = designated_boundaries(&snake);
        // both boundaries claim the same spoke, so no consecutive arc exists
        assert!(matches!(
            generate_grid(&snake, &a, &a, EquatorMode::BoundaryA, 5),
            Err(WingMorphError::UnresolvedArc(_))
        ));
    }

    #[test]
    fn too_few_grid_points_is_a_parameter_error() {
        let snake = circle_snake();
        let (a, b) = designated_boundaries(&snake);
        assert!(matches!(
            generate_grid(&snake, &a, &b, EquatorMode::BoundaryA, 1),
            Err(WingMorphError::Parameter(_))
        ));
    }

    #[test]
    fn role_assignment_requires_a_strict_minimum() {
        let endpoints = [
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
            Point::new(0.0, -1.0),
        ];
        // equidistant from endpoints 0 and 1
        let tie = Point::new(0.5, 0.5);
        assert!(matches!(
            assign_role(&tie, &endpoints, "tied"),
            Err(WingMorphError::AmbiguousRoleAssignment(_))
        ));
        // strictly nearest to endpoint 3
        let clear = Point::new(0.1, -0.9);
        assert_eq!(assign_role(&clear, &endpoints, "clear").unwrap(), 3);
    }

    #[test]
    fn collinear_morph_references_are_perturbed_and_recovered() {
        // both base axes lie on the y axis, so the reference triple is
        // exactly collinear and the transform is recomputed after the
        // one-pixel perturbation
        let top = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(0.0, 2.0),
        ];
        let bottom = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, -1.0),
            Point::new(0.0, -2.0),
        ];
        let p = Point::new(0.0, 2.0);
        let q = Point::new(0.0, 0.0);
        let r = Point::new(0.0, -2.0);
        let morphed = morph_axis(&top, &bottom, &p, &q, &r);

        assert_eq!(morphed.len(), 5);
        for pt in &morphed {
            assert!(pt.x.is_finite() && pt.y.is_finite());
        }
        // the center constraint survives the perturbation
        assert_approx_eq!(morphed[2].x, q.x, 1e-9);
        assert_approx_eq!(morphed[2].y, q.y, 1e-9);
    }

    #[test]
    fn morph_interpolates_the_three_references() {
        let top = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
        ];
        let bottom = vec![
            Point::new(0.0, 0.0),
            Point::new(-1.0, -1.0),
            Point::new(-2.0, 0.5),
        ];
        let p = Point::new(10.0, 5.0);
        let q = Point::new(8.0, 4.0);
        let r = Point::new(6.0, 7.0);
        let morphed = morph_axis(&top, &bottom, &p, &q, &r);

        // morphed[0] = T(top rim) = p, middle = T(center) = q, last = T(bottom rim) = r
        assert_approx_eq!(morphed[0].x, p.x, 1e-9);
        assert_approx_eq!(morphed[0].y, p.y, 1e-9);
        assert_approx_eq!(morphed[2].x, q.x, 1e-9);
        assert_approx_eq!(morphed[2].y, q.y, 1e-9);
        assert_approx_eq!(morphed[4].x, r.x, 1e-9);
        assert_approx_eq!(morphed[4].y, r.y, 1e-9);
    }
}
