//! Closed integer polygons and their exact predicates.

use crate::bbox::BoundingBox;
use crate::{cross, Point, Vector};

/// A closed 2D polygon over integer coordinates.
///
/// The vertex list is stored without repeating the first point; the edge
/// from the last vertex back to the first is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polygon {
    /// Vertices of the polygon in order.
    pub points: Vec<Point>,
}

impl Polygon {
    /// Create a new polygon from points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Create a polygon from `(x, y)` coordinate pairs.
    pub fn from_pairs(pairs: &[(i64, i64)]) -> Self {
        Self {
            points: pairs.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    /// Axis-aligned rectangle from corner to corner.
    pub fn rectangle(min: Point, max: Point) -> Self {
        Self {
            points: vec![
                min,
                Point::new(max.x, min.y),
                max,
                Point::new(min.x, max.y),
            ],
        }
    }

    /// Check if the polygon has no vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Twice the signed area, exact in `i128`.
    ///
    /// Positive for counter-clockwise vertex order.
    pub fn signed_area_doubled(&self) -> i128 {
        let n = self.points.len();
        if n < 3 {
            return 0;
        }
        let mut area = 0i128;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            area += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        area
    }

    /// Absolute area as a float (slicer units squared).
    pub fn area(&self) -> f64 {
        self.signed_area_doubled().unsigned_abs() as f64 / 2.0
    }

    /// Is the polygon counter-clockwise?
    pub fn is_ccw(&self) -> bool {
        self.signed_area_doubled() > 0
    }

    /// Reverse the winding order.
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Ensure counter-clockwise winding.
    pub fn make_ccw(&mut self) {
        if self.signed_area_doubled() < 0 {
            self.reverse();
        }
    }

    /// Bounding box of the vertices.
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::of_points(self.points.iter().copied())
    }

    /// Iterate over directed edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Translate all vertices by an offset.
    pub fn translate(&mut self, offset: Vector) {
        for p in &mut self.points {
            *p += offset;
        }
    }

    /// Translated copy.
    pub fn translated(&self, offset: Vector) -> Self {
        let mut poly = self.clone();
        poly.translate(offset);
        poly
    }

    /// Shift the polygon so its bounding-box minimum lands at the origin.
    pub fn ground_by_bounding_box(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let bbox = self.bounding_box();
        self.translate(Vector::new(-bbox.min.x, -bbox.min.y));
    }

    /// Shift the polygon so its first vertex lands at the origin.
    pub fn ground_by_first_point(&mut self) {
        if let Some(&first) = self.points.first() {
            self.translate(Vector::new(-first.x, -first.y));
        }
    }

    /// Divide every coordinate by `factor` (truncating), re-establishing
    /// counter-clockwise order afterwards.
    pub fn scaled_down(&self, factor: i64) -> Self {
        let mut poly = Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x / factor, p.y / factor))
                .collect(),
        };
        poly.make_ccw();
        poly
    }

    /// Divide every coordinate by `factor`, rounding away from zero,
    /// re-establishing counter-clockwise order afterwards. For a
    /// polygon surrounding the origin this is an outward (conservative)
    /// scale-down.
    pub fn scaled_down_outward(&self, factor: i64) -> Self {
        let div_out = |v: i64| -> i64 {
            if v >= 0 {
                (v + factor - 1) / factor
            } else {
                (v - factor + 1) / factor
            }
        };
        let mut poly = Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(div_out(p.x), div_out(p.y)))
                .collect(),
        };
        poly.make_ccw();
        poly
    }

    /// Multiply every coordinate by `factor`.
    pub fn scaled_up(&self, factor: i64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x * factor, p.y * factor))
                .collect(),
        }
    }

    /// Point-in-polygon test, exact, boundary counts as inside.
    ///
    /// Even-odd crossing rule; works for arbitrary simple polygons.
    pub fn contains_point(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if point_on_segment(p, a, b) {
                return true;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let d = (b.y - a.y) as i128;
                let lhs = (p.x - a.x) as i128 * d;
                let rhs = (p.y - a.y) as i128 * (b.x - a.x) as i128;
                let crossed = if d > 0 { lhs < rhs } else { lhs > rhs };
                if crossed {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Point-in-polygon test that excludes the boundary: true only when
    /// `p` lies strictly inside.
    pub fn contains_point_strictly(&self, p: Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        for (a, b) in self.edges() {
            if point_on_segment(p, a, b) {
                return false;
            }
            if (a.y > p.y) != (b.y > p.y) {
                let d = (b.y - a.y) as i128;
                let lhs = (p.x - a.x) as i128 * d;
                let rhs = (p.y - a.y) as i128 * (b.x - a.x) as i128;
                let crossed = if d > 0 { lhs < rhs } else { lhs > rhs };
                if crossed {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// Test whether `p` lies on the closed segment `a → b`.
pub fn point_on_segment(p: Point, a: Point, b: Point) -> bool {
    cross(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// Test whether two segments cross properly (intersect in exactly one
/// interior point of each). Shared endpoints and collinear touching do
/// not count.
pub fn segments_properly_cross(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let o1 = cross(a1, a2, b1).signum();
    let o2 = cross(a1, a2, b2).signum();
    let o3 = cross(b1, b2, a1).signum();
    let o4 = cross(b1, b2, a2).signum();
    o1 * o2 < 0 && o3 * o4 < 0
}
