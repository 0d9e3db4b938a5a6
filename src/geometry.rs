// Polyline and polygon primitives shared by the snake model and the
// projection grid mapper.

use nalgebra::Point2;

/// 2D point type used throughout the crate
pub type Point = Point2<f64>;

/// Euclidean distance between two points
pub fn distance(a: &Point, b: &Point) -> f64 {
    nalgebra::distance(a, b)
}

/// Total length of an open polyline
pub fn polyline_length(curve: &[Point]) -> f64 {
    curve.windows(2).map(|w| distance(&w[0], &w[1])).sum()
}

/// Orientation of a simple closed polygon in image coordinates (y down).
///
/// Returns +1.0 for clockwise parameterization, -1.0 for counterclockwise,
/// 0.0 when the polygon encloses no area.
pub fn polygon_orientation(polygon: &[Point]) -> f64 {
    let n = polygon.len();
    let mut area2 = 0.0;
    for i in 0..n {
        let prev = if i == 0 { n - 1 } else { i - 1 };
        area2 += (polygon[i].x + polygon[prev].x) * (polygon[i].y - polygon[prev].y);
    }
    if area2 == 0.0 {
        0.0
    } else {
        area2.signum()
    }
}

/// Returns a copy of the curve with the point order reversed
pub fn reverse(curve: &[Point]) -> Vec<Point> {
    curve.iter().rev().cloned().collect()
}

/// Index of the curve point nearest to the target.
///
/// Ties are broken by the first point encountered in scan order.
pub fn nearest_index(curve: &[Point], target: &Point) -> usize {
    let mut best = 0;
    let mut best_dist = f64::MAX;
    for (i, p) in curve.iter().enumerate() {
        let d = distance(p, target);
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Redistributes `n_points` points evenly along the cumulative arc length of
/// an open polyline. The first and last points of the input are preserved
/// exactly.
pub fn arc_length_resample(curve: &[Point], n_points: usize) -> Vec<Point> {
    debug_assert!(curve.len() >= 2);
    debug_assert!(n_points >= 2);

    let n_samples = curve.len();
    let mut arc_length = vec![0.0; n_samples];
    for i in 1..n_samples {
        arc_length[i] = arc_length[i - 1] + distance(&curve[i], &curve[i - 1]);
    }

    let delta = arc_length[n_samples - 1] / (n_points - 1) as f64;
    let mut resampled = Vec::with_capacity(n_points);
    let mut index = 0;
    for i in 0..n_points {
        let t = delta * i as f64;
        while index + 1 < n_samples - 1 && arc_length[index + 1] < t {
            index += 1;
        }
        let span = arc_length[index + 1] - arc_length[index];
        if span > 0.0 {
            let w = (t - arc_length[index]) / span;
            resampled.push(Point::new(
                curve[index].x + w * (curve[index + 1].x - curve[index].x),
                curve[index].y + w * (curve[index + 1].y - curve[index].y),
            ));
        } else {
            // zero-length segment, keep the vertex
            resampled.push(curve[index]);
        }
    }
    // guard against accumulated floating point error on the last sample
    if let Some(last) = resampled.last_mut() {
        *last = curve[n_samples - 1];
    }
    resampled
}

/// Resamples a closed polygon to `n_points` points with uniform arc-length
/// spacing. The closing edge between the last and first vertex is included;
/// the output does not duplicate the start point.
pub fn resample_closed(polygon: &[Point], n_points: usize) -> Vec<Point> {
    debug_assert!(polygon.len() >= 3);
    let mut closed: Vec<Point> = polygon.to_vec();
    closed.push(polygon[0]);
    let mut resampled = arc_length_resample(&closed, n_points + 1);
    resampled.pop();
    resampled
}

/// Intersection of the infinite lines (p1, p2) and (p3, p4).
///
/// Returns `None` when the lines are parallel.
pub fn line_intersection(p1: &Point, p2: &Point, p3: &Point, p4: &Point) -> Option<Point> {
    let denom = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if denom == 0.0 {
        return None;
    }
    let a = p1.x * p2.y - p1.y * p2.x;
    let b = p3.x * p4.y - p3.y * p4.x;
    Some(Point::new(
        (a * (p3.x - p4.x) - (p1.x - p2.x) * b) / denom,
        (a * (p3.y - p4.y) - (p1.y - p2.y) * b) / denom,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn polyline_length_of_unit_steps() {
        let curve = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        assert_approx_eq!(polyline_length(&curve), 2.0);
    }

    #[test]
    fn resampling_preserves_endpoints_and_spacing() {
        let curve = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
        ];
        let resampled = arc_length_resample(&curve, 5);
        assert_eq!(resampled.len(), 5);
        assert_approx_eq!(resampled[0].x, 0.0);
        assert_approx_eq!(resampled[4].x, 4.0);
        assert_approx_eq!(resampled[4].y, 4.0);
        // samples are 2.0 apart in arc length
        assert_approx_eq!(resampled[1].x, 2.0);
        assert_approx_eq!(resampled[2].x, 4.0);
        assert_approx_eq!(resampled[2].y, 0.0);
        assert_approx_eq!(resampled[3].y, 2.0);
    }

    #[test]
    fn closed_resampling_keeps_point_count() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let resampled = resample_closed(&square, 8);
        assert_eq!(resampled.len(), 8);
        assert_approx_eq!(resampled[0].x, 0.0);
        assert_approx_eq!(resampled[0].y, 0.0);
        // perimeter 8.0 -> one sample per unit
        assert_approx_eq!(resampled[1].x, 1.0);
        assert_approx_eq!(resampled[1].y, 0.0);
    }

    #[test]
    fn orientation_sign_flips_with_reversal() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        let forward = polygon_orientation(&square);
        let backward = polygon_orientation(&reverse(&square));
        assert_approx_eq!(forward + backward, 0.0);
        assert!(forward != 0.0);
    }

    #[test]
    fn diagonal_intersection_of_a_square() {
        let p = line_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(2.0, 2.0),
            &Point::new(2.0, 0.0),
            &Point::new(0.0, 2.0),
        )
        .unwrap();
        assert_approx_eq!(p.x, 1.0);
        assert_approx_eq!(p.y, 1.0);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let p = line_intersection(
            &Point::new(0.0, 0.0),
            &Point::new(1.0, 0.0),
            &Point::new(0.0, 1.0),
            &Point::new(1.0, 1.0),
        );
        assert!(p.is_none());
    }

    #[test]
    fn nearest_index_breaks_ties_by_scan_order() {
        let curve = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(0.0, 2.0),
        ];
        // equidistant from points 1 and 2
        let idx = nearest_index(&curve, &Point::new(1.0, 1.0));
        assert_eq!(idx, 1);
    }
}
