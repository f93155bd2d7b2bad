//! Exact rational positions and predicates over placed polygons.
//!
//! The placement solver hands back model values as exact rationals, and
//! they stay rational until the final scale-up into integer slicer
//! coordinates. The predicates here re-check a candidate placement in
//! exact arithmetic: a position accepted by the weak solver formula is
//! only committed once no footprint pair overlaps and no unreachable
//! zone catches a later footprint, and those checks must not be subject
//! to float rounding.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};

use crate::polygon::Polygon;
use crate::Point;

/// Exact rational number used for solver positions.
pub type Rational = num_rational::BigRational;

/// Rational from an integer value.
pub fn rational_from_int(value: i64) -> Rational {
    Rational::from_integer(BigInt::from(value))
}

/// Rational from a numerator/denominator pair.
pub fn rational_from_pair(numer: i64, denom: i64) -> Rational {
    Rational::new(BigInt::from(numer), BigInt::from(denom))
}

/// Approximate float value, for logging and SVG-style debug output only.
pub fn rational_to_f64(value: &Rational) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Scale a rational solver position up to integer slicer coordinates:
/// multiply by `factor` and take the integer part (truncation toward
/// zero).
pub fn scale_up_position(x: &Rational, y: &Rational, factor: i64) -> (i64, i64) {
    let f = rational_from_int(factor);
    let sx = (x * &f).to_integer();
    let sy = (y * &f).to_integer();
    (
        sx.to_i64().unwrap_or(if sx.is_negative() { i64::MIN } else { i64::MAX }),
        sy.to_i64().unwrap_or(if sy.is_negative() { i64::MIN } else { i64::MAX }),
    )
}

/// A point with exact rational coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RationalPoint {
    /// X coordinate.
    pub x: Rational,
    /// Y coordinate.
    pub y: Rational,
}

impl RationalPoint {
    /// Create a rational point.
    pub fn new(x: Rational, y: Rational) -> Self {
        Self { x, y }
    }

    /// Integer point translated by a rational offset.
    pub fn placed(p: Point, dx: &Rational, dy: &Rational) -> Self {
        Self {
            x: rational_from_int(p.x) + dx,
            y: rational_from_int(p.y) + dy,
        }
    }
}

/// Sign of the cross product of `a - o` and `b - o`: positive for a
/// counter-clockwise turn.
fn cross_sign(o: &RationalPoint, a: &RationalPoint, b: &RationalPoint) -> i8 {
    let lhs = (&a.x - &o.x) * (&b.y - &o.y);
    let rhs = (&a.y - &o.y) * (&b.x - &o.x);
    let d = lhs - rhs;
    if d.is_zero() {
        0
    } else if d.is_positive() {
        1
    } else {
        -1
    }
}

/// Test whether `point` lies strictly inside a counter-clockwise convex
/// polygon translated by `(dx, dy)`.
pub fn point_strictly_inside_convex(
    polygon: &Polygon,
    dx: &Rational,
    dy: &Rational,
    point: &RationalPoint,
) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    polygon.edges().all(|(a, b)| {
        let a = RationalPoint::placed(a, dx, dy);
        let b = RationalPoint::placed(b, dx, dy);
        cross_sign(&a, &b, point) > 0
    })
}

/// Point-in-polygon for an arbitrary simple polygon translated by
/// `(dx, dy)`, even-odd rule, boundary counts as inside.
pub fn point_inside_polygon(
    polygon: &Polygon,
    dx: &Rational,
    dy: &Rational,
    point: &RationalPoint,
) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in polygon.edges() {
        let a = RationalPoint::placed(a, dx, dy);
        let b = RationalPoint::placed(b, dx, dy);
        if on_segment(&a, &b, point) {
            return true;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let d = &b.y - &a.y;
            let lhs = (&point.x - &a.x) * &d;
            let rhs = (&point.y - &a.y) * (&b.x - &a.x);
            let crossed = if d.is_positive() { lhs < rhs } else { lhs > rhs };
            if crossed {
                inside = !inside;
            }
        }
    }
    inside
}

/// Boundary-excluding variant of [`point_inside_polygon`].
pub fn point_strictly_inside_polygon(
    polygon: &Polygon,
    dx: &Rational,
    dy: &Rational,
    point: &RationalPoint,
) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    for (a, b) in polygon.edges() {
        let a = RationalPoint::placed(a, dx, dy);
        let b = RationalPoint::placed(b, dx, dy);
        if on_segment(&a, &b, point) {
            return false;
        }
        if (a.y > point.y) != (b.y > point.y) {
            let d = &b.y - &a.y;
            let lhs = (&point.x - &a.x) * &d;
            let rhs = (&point.y - &a.y) * (&b.x - &a.x);
            let crossed = if d.is_positive() { lhs < rhs } else { lhs > rhs };
            if crossed {
                inside = !inside;
            }
        }
    }
    inside
}

fn on_segment(a: &RationalPoint, b: &RationalPoint, p: &RationalPoint) -> bool {
    if cross_sign(a, b, p) != 0 {
        return false;
    }
    let (xmin, xmax) = if a.x <= b.x { (&a.x, &b.x) } else { (&b.x, &a.x) };
    let (ymin, ymax) = if a.y <= b.y { (&a.y, &b.y) } else { (&b.y, &a.y) };
    p.x >= *xmin && p.x <= *xmax && p.y >= *ymin && p.y <= *ymax
}

/// Test whether segment `a1 → a2` translated by `(dxa, dya)` properly
/// crosses segment `b1 → b2` translated by `(dxb, dyb)`.
pub fn segments_properly_cross_at(
    a1: Point,
    a2: Point,
    dxa: &Rational,
    dya: &Rational,
    b1: Point,
    b2: Point,
    dxb: &Rational,
    dyb: &Rational,
) -> bool {
    let a1 = RationalPoint::placed(a1, dxa, dya);
    let a2 = RationalPoint::placed(a2, dxa, dya);
    let b1 = RationalPoint::placed(b1, dxb, dyb);
    let b2 = RationalPoint::placed(b2, dxb, dyb);
    let o1 = cross_sign(&a1, &a2, &b1);
    let o2 = cross_sign(&a1, &a2, &b2);
    let o3 = cross_sign(&b1, &b2, &a1);
    let o4 = cross_sign(&b1, &b2, &a2);
    (o1 as i16) * (o2 as i16) < 0 && (o3 as i16) * (o4 as i16) < 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(v: i64) -> Rational {
        rational_from_int(v)
    }

    #[test]
    fn test_scale_up_position_truncates() {
        let x = rational_from_pair(7, 2); // 3.5
        let y = rational_from_pair(-7, 2); // -3.5
        let (sx, sy) = scale_up_position(&x, &y, 100_000);
        assert_eq!(sx, 350_000);
        assert_eq!(sy, -350_000);

        let x = rational_from_pair(1, 3);
        let (sx, _) = scale_up_position(&x, &r(0), 100_000);
        assert_eq!(sx, 33_333);
    }

    #[test]
    fn test_rational_to_f64() {
        assert!((rational_to_f64(&rational_from_pair(1, 4)) - 0.25).abs() < 1e-15);
        assert!((rational_to_f64(&r(-3)) + 3.0).abs() < 1e-15);
    }

    #[test]
    fn test_point_strictly_inside_convex() {
        let square = Polygon::from_pairs(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let inside = RationalPoint::new(rational_from_pair(11, 2), rational_from_pair(11, 2));
        assert!(point_strictly_inside_convex(&square, &r(0), &r(0), &inside));
        // On the boundary is not strict.
        let edge = RationalPoint::new(r(10), r(5));
        assert!(!point_strictly_inside_convex(&square, &r(0), &r(0), &edge));
        // Translation moves the square away from the point.
        assert!(!point_strictly_inside_convex(&square, &r(20), &r(0), &inside));
    }

    #[test]
    fn test_point_inside_polygon_translated() {
        let square = Polygon::from_pairs(&[(0, 0), (10, 0), (10, 10), (0, 10)]);
        let p = RationalPoint::new(rational_from_pair(25, 2), r(5));
        assert!(!point_inside_polygon(&square, &r(0), &r(0), &p));
        assert!(point_inside_polygon(&square, &r(5), &r(0), &p));
    }

    #[test]
    fn test_segments_properly_cross_at() {
        let zero = r(0);
        assert!(segments_properly_cross_at(
            Point::new(0, 0),
            Point::new(10, 10),
            &zero,
            &zero,
            Point::new(0, 10),
            Point::new(10, 0),
            &zero,
            &zero,
        ));
        // Sliding one segment away removes the crossing.
        assert!(!segments_properly_cross_at(
            Point::new(0, 0),
            Point::new(10, 10),
            &zero,
            &zero,
            Point::new(0, 10),
            Point::new(10, 0),
            &r(100),
            &zero,
        ));
    }
}
