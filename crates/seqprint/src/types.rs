//! Input and output data model of the arrangement core.

use std::collections::{BTreeMap, BTreeSet};

use seqprint_geometry::convex::is_convex;
use seqprint_geometry::{BoundingBox, Point, Polygon};

use crate::error::{Result, ScheduleError};

/// Stable object identifier, carried from input to output.
pub type ObjectId = i32;

/// The printer's physical envelope seen from above, sliced at the
/// heights where its silhouette changes shape.
#[derive(Debug, Clone)]
pub struct PrinterGeometry {
    /// Build plate outline in slicer units. Must be convex; a rectangle
    /// gives the solver the most room.
    pub plate: Polygon,
    /// Heights whose silhouettes are expanded with a Minkowski sum.
    /// Height 0 (the nozzle) must be present.
    pub convex_heights: BTreeSet<i64>,
    /// Heights whose silhouettes are expanded as bounding-box sums.
    pub box_heights: BTreeSet<i64>,
    /// Silhouette polygons per declared height.
    pub extruder_slices: BTreeMap<i64, Vec<Polygon>>,
}

impl PrinterGeometry {
    /// Check the structural invariants: nozzle height present and
    /// convex, every declared height has silhouette polygons, and the
    /// plate is a non-empty convex polygon.
    pub fn validate(&self) -> Result<()> {
        if self.plate.len() < 3 {
            return Err(ScheduleError::InvalidGeometry(
                "plate outline has fewer than 3 vertices".into(),
            ));
        }
        if !is_convex(&self.plate) {
            return Err(ScheduleError::InvalidGeometry(
                "plate outline is not convex".into(),
            ));
        }
        if !self.convex_heights.contains(&0) {
            return Err(ScheduleError::InvalidGeometry(
                "height 0 (nozzle) must be declared convex".into(),
            ));
        }
        for &height in self.convex_heights.iter().chain(self.box_heights.iter()) {
            match self.extruder_slices.get(&height) {
                Some(polygons) if !polygons.is_empty() => {}
                _ => return Err(ScheduleError::MissingExtruderSlice { height }),
            }
        }
        Ok(())
    }

    /// Plate bounds in solver units: the bounding box, and the scaled
    /// plate polygon when the plate is not an axis-aligned rectangle.
    pub fn plate_bounds(&self, scale_factor: i64) -> (BoundingBox, Option<Polygon>) {
        let scaled = self.plate.scaled_down(scale_factor);
        let bbox = scaled.bounding_box();
        if is_axis_aligned_rectangle(&scaled) {
            (bbox, None)
        } else {
            (bbox, Some(scaled))
        }
    }
}

fn is_axis_aligned_rectangle(polygon: &Polygon) -> bool {
    if polygon.len() != 4 {
        return false;
    }
    polygon
        .edges()
        .all(|(a, b)| a.x == b.x || a.y == b.y)
}

/// One object handed to the scheduler.
#[derive(Debug, Clone)]
pub struct ObjectToPrint {
    /// Stable identifier, surfaced in the result.
    pub id: ObjectId,
    /// The next caller-order object must be printed right after this
    /// one, on the same bed.
    pub glued_to_next: bool,
    /// Total object height in slicer units; informational only.
    pub total_height: i64,
    /// Outline polygons per height, lowest first. An empty polygon
    /// skips that height. The height-0 entry is the printable
    /// footprint.
    pub slices: Vec<(i64, Polygon)>,
}

impl ObjectToPrint {
    /// The non-empty polygon at nozzle height, if any.
    pub fn footprint(&self) -> Option<&Polygon> {
        self.slices
            .iter()
            .find(|(height, polygon)| *height == 0 && !polygon.is_empty())
            .map(|(_, polygon)| polygon)
    }
}

/// One placed object in a schedule: where its footprint's reference
/// origin lands, in slicer units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledObject {
    /// Identifier of the input object.
    pub id: ObjectId,
    /// X translation in slicer units.
    pub x: i64,
    /// Y translation in slicer units.
    pub y: i64,
}

impl ScheduledObject {
    /// Create a scheduled object.
    pub fn new(id: ObjectId, x: i64, y: i64) -> Self {
        Self { id, x, y }
    }

    /// The placement as a point.
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// One bed of a schedule; objects are listed in print order.
#[derive(Debug, Clone, Default)]
pub struct ScheduledPlate {
    /// Objects on this bed, temporally ordered.
    pub scheduled_objects: Vec<ScheduledObject>,
}
