//! Polygon decimation for the placement solver.
//!
//! The solver cost grows quickly with vertex count, so object footprints
//! are simplified with Douglas–Peucker before constraints are built. A
//! plain simplification can cut corners *inward*, which would let the
//! solver place objects where the real footprint still collides; the
//! decimated polygon is therefore grown about its bounding-box center
//! until it contains every vertex of the input. The result is always a
//! superset of the input polygon.

use log::debug;

use crate::polygon::Polygon;
use crate::{Point, Vector};

/// Growth factor applied per containment iteration.
pub const DECIMATION_GROW_FACTOR: f64 = 1.005;

/// Upper bound on containment growth iterations before falling back to
/// the bounding box.
const MAX_GROW_ITERATIONS: u32 = 64;

/// Decimate `polygon` with the given Douglas–Peucker tolerance and grow
/// the result until it contains the input.
///
/// With `extra_safety`, one additional growth step is applied after
/// containment is reached. Inputs that simplify below 4 vertices come
/// back as the input's axis-aligned bounding box.
pub fn decimate_polygon(polygon: &Polygon, tolerance: f64, extra_safety: bool) -> Polygon {
    let mut decimated = polygon.clone();
    decimated.make_ccw();
    decimated.points = douglas_peucker_ring(&decimated.points, tolerance);

    let bbox = polygon.bounding_box();
    let center = bbox.center();

    if decimated.len() < 4 {
        return Polygon::rectangle(bbox.min, bbox.max);
    }

    for iteration in 0..MAX_GROW_ITERATIONS {
        grow_for_containment(center, &mut decimated);

        if contains_all_vertices(&decimated, polygon) {
            if extra_safety {
                grow_for_containment(center, &mut decimated);
            }
            debug!(
                "decimated {} -> {} vertices in {} growth steps",
                polygon.len(),
                decimated.len(),
                iteration + 1
            );
            return decimated;
        }
    }

    // Growth did not converge; the bounding box is always a safe cover.
    debug!(
        "decimation growth did not converge after {MAX_GROW_ITERATIONS} steps, using bounding box"
    );
    Polygon::rectangle(bbox.min, bbox.max)
}

/// Scale a polygon by [`DECIMATION_GROW_FACTOR`] and re-center its
/// bounding box on `center`.
pub fn grow_for_containment(center: Point, polygon: &mut Polygon) {
    for p in &mut polygon.points {
        p.x = (p.x as f64 * DECIMATION_GROW_FACTOR).round() as i64;
        p.y = (p.y as f64 * DECIMATION_GROW_FACTOR).round() as i64;
    }
    let grown_center = polygon.bounding_box().center();
    polygon.translate(Vector::new(
        center.x - grown_center.x,
        center.y - grown_center.y,
    ));
}

fn contains_all_vertices(cover: &Polygon, polygon: &Polygon) -> bool {
    polygon.points.iter().all(|&p| cover.contains_point(p))
}

/// Douglas–Peucker over a closed vertex ring.
///
/// The ring is cut at its first vertex, simplified as a polyline and
/// re-closed. A non-positive tolerance keeps every vertex.
fn douglas_peucker_ring(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() < 4 || tolerance <= 0.0 {
        return points.to_vec();
    }

    let mut ring: Vec<Point> = points.to_vec();
    ring.push(points[0]);

    let tol2 = tolerance * tolerance;
    let mut keep = vec![false; ring.len()];
    keep[0] = true;
    keep[ring.len() - 1] = true;

    let mut stack = vec![(0usize, ring.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut farthest = start;
        let mut max_dist2 = 0.0f64;
        for i in start + 1..end {
            let d2 = segment_distance_squared(ring[i], ring[start], ring[end]);
            if d2 > max_dist2 {
                max_dist2 = d2;
                farthest = i;
            }
        }
        if max_dist2 > tol2 {
            keep[farthest] = true;
            stack.push((start, farthest));
            stack.push((farthest, end));
        }
    }

    let mut simplified: Vec<Point> = ring
        .iter()
        .zip(&keep)
        .filter_map(|(&p, &k)| k.then_some(p))
        .collect();
    simplified.pop(); // drop the duplicated closing vertex
    simplified
}

fn segment_distance_squared(p: Point, a: Point, b: Point) -> f64 {
    let abx = (b.x - a.x) as f64;
    let aby = (b.y - a.y) as f64;
    let apx = (p.x - a.x) as f64;
    let apy = (p.y - a.y) as f64;
    let len2 = abx * abx + aby * aby;
    if len2 == 0.0 {
        return apx * apx + apy * apy;
    }
    let t = ((apx * abx + apy * aby) / len2).clamp(0.0, 1.0);
    let dx = apx - t * abx;
    let dy = apy - t * aby;
    dx * dx + dy * dy
}
