//! Polygon boolean operations backed by the `geo` crate.
//!
//! Two places in the arrangement pipeline need boolean operations: the
//! unreachable-zone simplification (drop a contribution fully consumed
//! by a larger one) and the union-area computation behind the
//! low-object gluing rule. [`union`] and [`difference`] expose the
//! underlying operations directly. Everything else in the pipeline
//! stays in exact integer arithmetic.

use geo::{Area, BooleanOps, LineString, MultiPolygon};

use crate::polygon::Polygon;

/// Area below which a difference remainder counts as empty, in slicer
/// units squared. At 10⁶ units per millimeter this is 10⁻⁸ mm².
const EMPTY_AREA_EPSILON: f64 = 1e4;

fn to_geo(polygon: &Polygon) -> geo::Polygon<f64> {
    let ring: Vec<(f64, f64)> = polygon
        .points
        .iter()
        .map(|p| (p.x as f64, p.y as f64))
        .collect();
    geo::Polygon::new(LineString::from(ring), vec![])
}

fn to_geo_multi(polygons: &[Polygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(polygons.iter().map(to_geo).collect())
}

fn from_geo_multi(multi: &MultiPolygon<f64>) -> Vec<Polygon> {
    multi
        .0
        .iter()
        .map(|polygon| {
            let mut points: Vec<crate::Point> = polygon
                .exterior()
                .points()
                .map(|p| crate::Point::new(p.x().round() as i64, p.y().round() as i64))
                .collect();
            // geo rings repeat the first vertex.
            if points.len() > 1 && points.first() == points.last() {
                points.pop();
            }
            let mut result = Polygon::new(points);
            result.make_ccw();
            result
        })
        .collect()
}

/// Union of a set of possibly overlapping polygons, returned as the
/// exterior rings of the merged pieces (holes are dropped, coordinates
/// rounded to integers).
pub fn union(polygons: &[Polygon]) -> Vec<Polygon> {
    let mut merged = MultiPolygon::<f64>::new(Vec::new());
    for polygon in polygons {
        if polygon.len() < 3 {
            continue;
        }
        merged = merged.union(&to_geo_multi(std::slice::from_ref(polygon)));
    }
    from_geo_multi(&merged)
}

/// `p` minus `q`: zero or more remainder polygons (exterior rings,
/// coordinates rounded to integers).
pub fn difference(p: &Polygon, q: &Polygon) -> Vec<Polygon> {
    let result = to_geo_multi(std::slice::from_ref(p))
        .difference(&to_geo_multi(std::slice::from_ref(q)));
    from_geo_multi(&result)
}

/// Area of the union of a set of possibly overlapping polygons, in
/// slicer units squared.
pub fn union_area(polygons: &[Polygon]) -> f64 {
    let mut union = MultiPolygon::<f64>::new(Vec::new());
    for polygon in polygons {
        if polygon.len() < 3 {
            continue;
        }
        union = union.union(&to_geo_multi(std::slice::from_ref(polygon)));
    }
    union.unsigned_area()
}

/// Test whether the union of `consumers` fully covers the union of
/// `pieces`: clip the pieces by each consumer in turn and check that
/// nothing remains.
pub fn consumed_by(pieces: &[Polygon], consumers: &[Polygon]) -> bool {
    let mut remainder = to_geo_multi(pieces);
    for consumer in consumers {
        if remainder.0.is_empty() {
            break;
        }
        remainder = remainder.difference(&to_geo_multi(std::slice::from_ref(consumer)));
    }
    remainder.unsigned_area() <= EMPTY_AREA_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: i64, max: i64) -> Polygon {
        Polygon::from_pairs(&[(min, min), (max, min), (max, max), (min, max)])
    }

    #[test]
    fn test_union_area_disjoint_and_overlapping() {
        let disjoint = [square(0, 1_000_000), square(2_000_000, 3_000_000)];
        let expected = 2.0 * 1_000_000.0f64.powi(2);
        assert_relative_eq!(union_area(&disjoint), expected, max_relative = 1e-9);

        // Identical squares must not double count.
        let overlapping = [square(0, 1_000_000), square(0, 1_000_000)];
        let expected = 1_000_000.0f64.powi(2);
        assert_relative_eq!(union_area(&overlapping), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_union_merges_overlapping_squares() {
        let merged = union(&[square(0, 1_000_000), square(500_000, 1_500_000)]);
        assert_eq!(merged.len(), 1);
        assert!(merged[0].is_ccw());
        let bbox = merged[0].bounding_box();
        assert_eq!(bbox.min, crate::Point::new(0, 0));
        assert_eq!(bbox.max, crate::Point::new(1_500_000, 1_500_000));

        let separate = union(&[square(0, 1_000_000), square(2_000_000, 3_000_000)]);
        assert_eq!(separate.len(), 2);
    }

    #[test]
    fn test_difference_clips_overlap() {
        let remainder = difference(&square(0, 1_000_000), &square(500_000, 1_500_000));
        assert_eq!(remainder.len(), 1);
        let area: f64 = remainder.iter().map(Polygon::area).sum();
        // One quadrant removed from the unit square.
        assert_relative_eq!(area, 0.75 * 1_000_000.0f64.powi(2), max_relative = 1e-9);

        // Full cover leaves nothing.
        assert!(difference(&square(200_000, 800_000), &square(0, 1_000_000)).is_empty());
    }

    #[test]
    fn test_consumed_by_smaller_inside_larger() {
        let small = [square(200_000, 800_000)];
        let large = [square(0, 1_000_000)];
        assert!(consumed_by(&small, &large));
        assert!(!consumed_by(&large, &small));
    }

    #[test]
    fn test_consumed_by_needs_all_consumers() {
        // Two half-covers only consume the piece together.
        let piece = [square(0, 1_000_000)];
        let left = Polygon::from_pairs(&[
            (-100_000, -100_000),
            (500_000, -100_000),
            (500_000, 1_100_000),
            (-100_000, 1_100_000),
        ]);
        let right = Polygon::from_pairs(&[
            (400_000, -100_000),
            (1_100_000, -100_000),
            (1_100_000, 1_100_000),
            (400_000, 1_100_000),
        ]);
        assert!(!consumed_by(&piece, std::slice::from_ref(&left)));
        assert!(consumed_by(&piece, &[left, right]));
    }
}
