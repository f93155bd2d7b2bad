#![warn(missing_docs)]

//! Integer 2D geometry primitives for the seqprint arrangement solver.
//!
//! Coordinates are `i64` values at the slicer's scale. All polygon
//! products (signed areas, orientation tests, segment intersection
//! predicates) are computed in `i128` so that slicer-scale coordinates
//! can never overflow. Positions produced by the placement solver are
//! exact rationals and stay exact until the final scale-up back to
//! integer slicer coordinates.

pub mod bbox;
pub mod boolean;
pub mod convex;
pub mod decimate;
pub mod polygon;
pub mod rational;

pub use bbox::BoundingBox;
pub use convex::{convex_hull, minkowski_sum_convex};
pub use decimate::{decimate_polygon, DECIMATION_GROW_FACTOR};
pub use polygon::Polygon;
pub use rational::{scale_up_position, Rational};

/// A point in the slicer's integer coordinate space.
pub type Point = nalgebra::Point2<i64>;

/// A displacement between two integer points.
pub type Vector = nalgebra::Vector2<i64>;

/// Cross product of `b - a` and `c - a`, widened to `i128`.
///
/// Positive when `a → b → c` turns counter-clockwise.
pub fn cross(a: Point, b: Point, c: Point) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let acx = (c.x - a.x) as i128;
    let acy = (c.y - a.y) as i128;
    abx * acy - aby * acx
}
