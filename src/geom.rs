//! Shared geometry utilities.
//!
//! All coordinates are image coordinates: x to the right, y down.

use kurbo::Point;

/// Signed area of a closed polygon as seen on screen (y-down).
///
/// Negative = clockwise, positive = counter-clockwise.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let twice: f64 = (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum();
    // The raw shoelace sum is positive for screen-clockwise rings in y-down
    // coordinates; flip it so clockwise reads as negative.
    -twice / 2.0
}

/// Reverse `points` in place if the ring is counter-clockwise on screen.
///
/// Returns true if the order was reversed.
pub fn ensure_clockwise(points: &mut [Point]) -> bool {
    if signed_area(points) > 0.0 {
        points.reverse();
        true
    } else {
        false
    }
}

/// Unsigned area of triangle abc.
pub fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs()
}

/// Shortest distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    if len_sq < 1e-16 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

/// Total length of the polyline, including the closing edge if `closed`.
pub fn perimeter(points: &[Point], closed: bool) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    match (closed, points.first(), points.last()) {
        (true, Some(&first), Some(&last)) if points.len() > 2 => open + last.distance(first),
        _ => open,
    }
}

/// Index of the point nearest to `target` (first one on ties).
pub fn nearest_index(points: &[Point], target: Point) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(target);
        if best.map_or(true, |(_, bd)| d < bd) {
            best = Some((i, d));
        }
    }
    best.map(|(i, _)| i)
}

/// Round a point to whole pixels.
pub fn round_point(p: Point) -> Point {
    Point::new(p.x.round(), p.y.round())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        // Right, down, left, up: clockwise on screen.
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ]
    }

    #[test]
    fn screen_clockwise_is_negative() {
        assert_eq!(signed_area(&square()), -100.0);
        let mut ccw = square();
        ccw.reverse();
        assert_eq!(signed_area(&ccw), 100.0);
    }

    #[test]
    fn ensure_clockwise_reverses_ccw_only() {
        let mut pts = square();
        assert!(!ensure_clockwise(&mut pts));
        pts.reverse();
        assert!(ensure_clockwise(&mut pts));
        assert!(signed_area(&pts) < 0.0);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Point::new(-3.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Point::new(1.0, 1.0), a, a), 2f64.sqrt());
    }

    #[test]
    fn triangle_area_ignores_winding() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(4.0, 0.0);
        let c = Point::new(0.0, 3.0);
        assert_eq!(triangle_area(a, b, c), 6.0);
        assert_eq!(triangle_area(a, c, b), 6.0);
    }

    #[test]
    fn perimeter_closes_ring() {
        assert_eq!(perimeter(&square(), false), 30.0);
        assert_eq!(perimeter(&square(), true), 40.0);
    }
}
