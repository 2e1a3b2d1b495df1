//! Path simplification: extracted points → dominant points.
//!
//! 1. RDP reduction (closed rings re-oriented and re-anchored at their start)
//! 2. Max-distance insertion
//! 3. Min-distance filtering
//! 4. Optional Visvalingam-Whyatt reduction to a target count

use geo::{LineString, Simplify};
use kurbo::Point;

use crate::config::{Epsilon, SimplifyParams, Spacing};
use crate::error::{DotsError, Stage};
use crate::geom::{ensure_clockwise, nearest_index, perimeter, round_point, triangle_area};

/// Run every configured simplification step over `points`.
///
/// `closed` marks a ring whose last point connects back to the first.
pub fn simplify(
    points: &[Point],
    closed: bool,
    params: &SimplifyParams,
) -> Result<Vec<Point>, DotsError> {
    if closed && points.len() < 3 {
        return Err(DotsError::InsufficientPoints {
            stage: Stage::Simplify,
            got: points.len(),
        });
    }
    let length = perimeter(points, closed);
    if length <= 0.0 {
        return Err(DotsError::ZeroPerimeter {
            stage: Stage::Simplify,
        });
    }
    let epsilon = match params.epsilon {
        Epsilon::Absolute(px) => px,
        Epsilon::ArcFraction(f) => f * length,
    };

    let mut result = if closed {
        let reduced = rdp_closed(points, epsilon)?;
        anchor_ring(reduced, points[0])
    } else {
        rdp_simplify(points, epsilon)
    };
    log::debug!("rdp: {} -> {} points (epsilon {:.2})", points.len(), result.len(), epsilon);

    if let Some(max) = params.max_distance {
        result = match params.spacing {
            Spacing::Even => insert_midpoints(&result, max, closed),
            Spacing::Bisect => bisect_long_gaps(&result, max, closed),
        };
    }
    if let Some(min) = params.min_distance {
        result = filter_close_points(&result, min);
    }
    if params.target_count.is_some() || params.area_threshold.is_some() {
        result = visvalingam_whyatt(&result, params.target_count, params.area_threshold);
    }
    Ok(result)
}

/// RDP polyline simplification. Endpoints are always kept.
pub fn rdp_simplify(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 || epsilon <= 0.0 {
        return points.to_vec();
    }
    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    LineString::from(coords)
        .simplify(&epsilon)
        .into_inner()
        .into_iter()
        .map(|c| Point::new(c.x, c.y))
        .collect()
}

/// RDP on a closed ring.
///
/// The ring is split at the vertex farthest from its start and both arcs
/// are simplified independently, so the start vertex always survives.
pub fn rdp_closed(points: &[Point], epsilon: f64) -> Result<Vec<Point>, DotsError> {
    let n = points.len();
    if n < 3 {
        return Err(DotsError::InsufficientPoints {
            stage: Stage::Simplify,
            got: n,
        });
    }
    let start = points[0];
    let split = (1..n)
        .max_by(|&a, &b| {
            start
                .distance(points[a])
                .total_cmp(&start.distance(points[b]))
                .then(b.cmp(&a))
        })
        .unwrap_or(1);

    let mut second: Vec<Point> = points[split..].to_vec();
    second.push(start);

    let mut ring = rdp_simplify(&points[..=split], epsilon);
    let tail = rdp_simplify(&second, epsilon);
    ring.extend_from_slice(&tail[1..tail.len() - 1]);

    if ring.len() < 3 {
        return Err(DotsError::InsufficientPoints {
            stage: Stage::Simplify,
            got: ring.len(),
        });
    }
    Ok(ring)
}

/// Orient a ring clockwise and rotate it to start nearest `start`.
///
/// Keeps the numbering start stable while epsilon changes.
fn anchor_ring(mut ring: Vec<Point>, start: Point) -> Vec<Point> {
    ensure_clockwise(&mut ring);
    if let Some(i) = nearest_index(&ring, start) {
        ring.rotate_left(i);
    }
    ring
}

/// Insert floor(d / max) evenly spaced points into every gap longer than `max`.
pub fn insert_midpoints(points: &[Point], max_distance: f64, closed: bool) -> Vec<Point> {
    if points.len() < 2 || max_distance <= 0.0 {
        return points.to_vec();
    }
    let mut refined = Vec::with_capacity(points.len());
    refined.push(points[0]);
    for w in points.windows(2) {
        push_even(&mut refined, w[0], w[1], max_distance);
        refined.push(w[1]);
    }
    if closed {
        let (last, first) = (points[points.len() - 1], points[0]);
        push_even(&mut refined, last, first, max_distance);
    }
    refined
}

fn push_even(out: &mut Vec<Point>, a: Point, b: Point, max_distance: f64) {
    let n = (a.distance(b) / max_distance).floor() as usize;
    for k in 1..=n {
        let t = k as f64 / (n + 1) as f64;
        out.push(round_point(a.lerp(b, t)));
    }
}

/// Repeatedly bisect every gap longer than `max` until none remains.
pub fn bisect_long_gaps(points: &[Point], max_distance: f64, closed: bool) -> Vec<Point> {
    if points.len() < 2 || max_distance <= 0.0 {
        return points.to_vec();
    }
    let mut refined = Vec::with_capacity(points.len());
    refined.push(points[0]);
    for w in points.windows(2) {
        push_bisected(&mut refined, w[0], w[1], max_distance);
        refined.push(w[1]);
    }
    if closed {
        let (last, first) = (points[points.len() - 1], points[0]);
        push_bisected(&mut refined, last, first, max_distance);
    }
    refined
}

fn push_bisected(out: &mut Vec<Point>, a: Point, b: Point, max_distance: f64) {
    if a.distance(b) <= max_distance {
        return;
    }
    let mid = a.midpoint(b);
    push_bisected(out, a, mid, max_distance);
    out.push(round_point(mid));
    push_bisected(out, mid, b, max_distance);
}

/// Drop points closer than `min_distance` to the last kept point.
///
/// The first and last points are always kept.
pub fn filter_close_points(points: &[Point], min_distance: f64) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }
    let mut filtered = vec![points[0]];
    let mut last_kept = points[0];
    for &p in &points[1..points.len() - 1] {
        if last_kept.distance(p) >= min_distance {
            filtered.push(p);
            last_kept = p;
        }
    }
    filtered.push(points[points.len() - 1]);
    filtered
}

/// Visvalingam-Whyatt reduction.
///
/// Removes the interior point with the smallest effective area (earliest on
/// ties) until `target_count` points remain or the smallest area reaches
/// `area_threshold`. Endpoints are never removed.
pub fn visvalingam_whyatt(
    points: &[Point],
    target_count: Option<usize>,
    area_threshold: Option<f64>,
) -> Vec<Point> {
    if target_count.is_none() && area_threshold.is_none() {
        return points.to_vec();
    }
    let mut pts = points.to_vec();
    if pts.len() < 3 {
        return pts;
    }

    let mut areas = vec![f64::INFINITY; pts.len()];
    for i in 1..pts.len() - 1 {
        areas[i] = triangle_area(pts[i - 1], pts[i], pts[i + 1]);
    }

    while pts.len() > 2 {
        if target_count.is_some_and(|n| pts.len() <= n) {
            break;
        }
        let mut min_idx = 1;
        for i in 2..pts.len() - 1 {
            if areas[i] < areas[min_idx] {
                min_idx = i;
            }
        }
        if area_threshold.is_some_and(|t| areas[min_idx] >= t) {
            break;
        }

        pts.remove(min_idx);
        areas.remove(min_idx);

        let last = pts.len() - 1;
        for i in [min_idx - 1, min_idx] {
            if i >= 1 && i < last {
                areas[i] = triangle_area(pts[i - 1], pts[i], pts[i + 1]);
            }
        }
    }
    pts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::signed_area;

    fn pt(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn collinear_points_collapse_to_endpoints() {
        let line: Vec<Point> = (0..=10).map(|i| pt(i as f64 * 3.0, 0.0)).collect();
        assert_eq!(rdp_simplify(&line, 1.0), vec![pt(0.0, 0.0), pt(30.0, 0.0)]);
    }

    #[test]
    fn closed_square_keeps_corners_and_start() {
        // Dense clockwise square starting mid-way along the top edge.
        let mut ring = Vec::new();
        for x in 5..20 {
            ring.push(pt(x as f64, 0.0));
        }
        for y in 0..20 {
            ring.push(pt(20.0, y as f64));
        }
        for x in (1..=20).rev() {
            ring.push(pt(x as f64, 20.0));
        }
        for y in (1..=20).rev() {
            ring.push(pt(0.0, y as f64));
        }
        for x in 0..5 {
            ring.push(pt(x as f64, 0.0));
        }
        let params = SimplifyParams {
            epsilon: Epsilon::Absolute(1.0),
            ..SimplifyParams::default()
        };
        let out = simplify(&ring, true, &params).unwrap();
        assert_eq!(out[0], pt(5.0, 0.0));
        for corner in [pt(20.0, 0.0), pt(20.0, 20.0), pt(0.0, 20.0), pt(0.0, 0.0)] {
            assert!(out.contains(&corner), "missing corner {:?}", corner);
        }
        assert!(signed_area(&out) < 0.0);
    }

    #[test]
    fn counter_clockwise_ring_is_reversed() {
        let ring = vec![pt(0.0, 0.0), pt(0.0, 10.0), pt(10.0, 10.0), pt(10.0, 0.0)];
        assert!(signed_area(&ring) > 0.0);
        let params = SimplifyParams {
            epsilon: Epsilon::Absolute(0.5),
            ..SimplifyParams::default()
        };
        let out = simplify(&ring, true, &params).unwrap();
        assert!(signed_area(&out) < 0.0);
        assert_eq!(out[0], pt(0.0, 0.0));
    }

    #[test]
    fn closed_needs_three_points() {
        let err = simplify(&[pt(0.0, 0.0), pt(1.0, 1.0)], true, &SimplifyParams::default());
        assert!(matches!(
            err,
            Err(DotsError::InsufficientPoints { stage: Stage::Simplify, got: 2 })
        ));
    }

    #[test]
    fn single_point_has_zero_perimeter() {
        let params = SimplifyParams {
            epsilon: Epsilon::ArcFraction(0.01),
            ..SimplifyParams::default()
        };
        let err = simplify(&[pt(4.0, 4.0), pt(4.0, 4.0)], false, &params);
        assert!(matches!(err, Err(DotsError::ZeroPerimeter { .. })));
    }

    #[test]
    fn even_insertion_bounds_every_gap() {
        let pts = vec![pt(0.0, 0.0), pt(100.0, 0.0), pt(100.0, 37.0), pt(3.0, 80.0)];
        for closed in [false, true] {
            let out = insert_midpoints(&pts, 20.0, closed);
            let mut gaps: Vec<f64> = out.windows(2).map(|w| w[0].distance(w[1])).collect();
            if closed {
                gaps.push(out[out.len() - 1].distance(out[0]));
            }
            assert!(gaps.iter().all(|&g| g <= 20.0 + 1.0), "{:?}", gaps);
        }
        // 100 / 20 = 5 inserted points on the first edge.
        let out = insert_midpoints(&pts[..2], 20.0, false);
        assert_eq!(out.len(), 7);
    }

    #[test]
    fn bisection_bounds_every_gap() {
        let pts = vec![pt(0.0, 0.0), pt(90.0, 0.0), pt(90.0, 10.0)];
        let out = bisect_long_gaps(&pts, 25.0, false);
        // 90 -> 45 -> 22.5: three points inserted on the long edge.
        assert_eq!(out.len(), 6);
        assert!(out.windows(2).all(|w| w[0].distance(w[1]) <= 25.0 + 1.0));
    }

    #[test]
    fn min_distance_keeps_first_and_last() {
        let pts: Vec<Point> = (0..=10).map(|i| pt(i as f64 * 4.0, 0.0)).collect();
        let out = filter_close_points(&pts, 10.0);
        assert_eq!(out.first(), Some(&pt(0.0, 0.0)));
        assert_eq!(out.last(), Some(&pt(40.0, 0.0)));
        assert_eq!(out, vec![pt(0.0, 0.0), pt(12.0, 0.0), pt(24.0, 0.0), pt(36.0, 0.0), pt(40.0, 0.0)]);
        for w in out[..out.len() - 1].windows(2) {
            assert!(w[0].distance(w[1]) >= 10.0);
        }
    }

    #[test]
    fn vw_removes_flattest_point_first_and_breaks_ties_early() {
        // Two identical tiny bumps: the earlier one goes first.
        let pts = vec![pt(0.0, 0.0), pt(10.0, 1.0), pt(20.0, 0.0), pt(30.0, 1.0), pt(40.0, 0.0)];
        let out = visvalingam_whyatt(&pts, Some(4), None);
        assert_eq!(out, vec![pt(0.0, 0.0), pt(20.0, 0.0), pt(30.0, 1.0), pt(40.0, 0.0)]);
    }

    #[test]
    fn vw_area_threshold_stops_early() {
        let pts = vec![pt(0.0, 0.0), pt(10.0, 0.5), pt(20.0, 0.0), pt(30.0, 20.0), pt(40.0, 0.0)];
        let out = visvalingam_whyatt(&pts, None, Some(50.0));
        assert_eq!(out, vec![pt(0.0, 0.0), pt(20.0, 0.0), pt(30.0, 20.0), pt(40.0, 0.0)]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let pts = vec![pt(0.0, 0.0), pt(50.0, 1.0), pt(100.0, 0.0), pt(100.0, 100.0)];
        let params = SimplifyParams {
            epsilon: Epsilon::Absolute(2.0),
            max_distance: Some(30.0),
            min_distance: Some(5.0),
            ..SimplifyParams::default()
        };
        let once = simplify(&pts, false, &params).unwrap();
        let twice = simplify(&once, false, &params).unwrap();
        assert_eq!(once, twice);
    }
}
