//! Axis-aligned bounding boxes in the integer coordinate space.

use crate::{Point, Vector};

/// Axis-aligned bounding box with inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point,
    /// Maximum corner.
    pub max: Point,
}

impl BoundingBox {
    /// Create a bounding box from min and max corners.
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Create an inverted (empty) box suitable for expansion.
    pub fn empty() -> Self {
        Self {
            min: Point::new(i64::MAX, i64::MAX),
            max: Point::new(i64::MIN, i64::MIN),
        }
    }

    /// Compute the bounding box of a set of points.
    ///
    /// Returns the empty (inverted) box when the iterator yields nothing.
    pub fn of_points<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut bbox = Self::empty();
        for p in points {
            bbox.include(p);
        }
        bbox
    }

    /// Expand the box to include a point.
    pub fn include(&mut self, p: Point) {
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
    }

    /// Width along the X axis.
    pub fn x_size(&self) -> i64 {
        self.max.x - self.min.x
    }

    /// Height along the Y axis.
    pub fn y_size(&self) -> i64 {
        self.max.y - self.min.y
    }

    /// Center point, rounded toward negative infinity on odd extents.
    pub fn center(&self) -> Point {
        Point::new(
            self.min.x + (self.max.x - self.min.x) / 2,
            self.min.y + (self.max.y - self.min.y) / 2,
        )
    }

    /// Test whether a point lies inside the box (boundary included).
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Test whether `other` lies fully inside this box (boundary included).
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Translate the box by an offset.
    pub fn translated(&self, offset: Vector) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}
