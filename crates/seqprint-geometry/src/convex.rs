//! Convex hulls and Minkowski sums.
//!
//! The unreachable-zone expansion needs the Minkowski sum of an object
//! slice with a convex extruder silhouette. The sum of two convex
//! polygons is the convex hull of their pairwise vertex sums; a general
//! simple polygon is first ear-clipped into triangles and each triangle
//! is summed separately. The pieces are returned without being unioned:
//! the zone semantic is the union of the set, and downstream consumers
//! (the SMT encoding in particular) want convex pieces anyway.

use log::warn;

use crate::polygon::Polygon;
use crate::{cross, Point};

/// Convex hull of a point set (monotone chain), counter-clockwise,
/// collinear points dropped.
pub fn convex_hull(points: &[Point]) -> Polygon {
    let mut sorted: Vec<Point> = points.to_vec();
    sorted.sort_by(|a, b| (a.x, a.y).cmp(&(b.x, b.y)));
    sorted.dedup();

    if sorted.len() < 3 {
        return Polygon::new(sorted);
    }

    let mut lower: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in &sorted {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::with_capacity(sorted.len());
    for &p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }
    // Each chain ends with the other chain's starting point.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    Polygon::new(lower)
}

/// Test whether a polygon is convex (collinear runs allowed).
pub fn is_convex(polygon: &Polygon) -> bool {
    let n = polygon.points.len();
    if n < 4 {
        return n == 3;
    }
    let mut sign = 0i128;
    for i in 0..n {
        let a = polygon.points[i];
        let b = polygon.points[(i + 1) % n];
        let c = polygon.points[(i + 2) % n];
        let turn = cross(a, b, c).signum();
        if turn != 0 {
            if sign != 0 && turn != sign {
                return false;
            }
            sign = turn;
        }
    }
    true
}

/// Minkowski sum of a simple polygon with a convex polygon.
///
/// Returns a list of convex pieces whose union is the exact sum. A convex
/// input yields a single piece; a concave input is triangulated first.
pub fn minkowski_sum_convex(polygon: &Polygon, convex: &Polygon) -> Vec<Polygon> {
    if polygon.is_empty() || convex.is_empty() {
        return Vec::new();
    }
    if is_convex(polygon) {
        return vec![pairwise_sum_hull(&polygon.points, &convex.points)];
    }

    let triangles = match triangulate(polygon) {
        Some(triangles) => triangles,
        None => {
            // Ear clipping rejected the input (self-touching ring or
            // similar); cover it with its hull instead of failing.
            warn!(
                "triangulation failed for a {}-vertex polygon, using convex hull cover",
                polygon.len()
            );
            return vec![pairwise_sum_hull(
                &convex_hull(&polygon.points).points,
                &convex.points,
            )];
        }
    };

    triangles
        .iter()
        .map(|triangle| pairwise_sum_hull(triangle, &convex.points))
        .collect()
}

fn pairwise_sum_hull(a: &[Point], b: &[Point]) -> Polygon {
    let mut sums = Vec::with_capacity(a.len() * b.len());
    for &p in a {
        for &q in b {
            sums.push(Point::new(p.x + q.x, p.y + q.y));
        }
    }
    convex_hull(&sums)
}

fn triangulate(polygon: &Polygon) -> Option<Vec<[Point; 3]>> {
    let flat: Vec<f64> = polygon
        .points
        .iter()
        .flat_map(|p| [p.x as f64, p.y as f64])
        .collect();
    let indices = earcutr::earcut(&flat, &[], 2).ok()?;
    if indices.is_empty() {
        return None;
    }
    Some(
        indices
            .chunks_exact(3)
            .map(|tri| {
                [
                    polygon.points[tri[0]],
                    polygon.points[tri[1]],
                    polygon.points[tri[2]],
                ]
            })
            .collect(),
    )
}
