//! Printability checking: replay a finished schedule and verify that no
//! later object ever sits inside an earlier object's unreachable zone.
//!
//! The checker works at full slicer scale in exact integer arithmetic
//! and rebuilds the zones from the objects' original, undecimated
//! slices. The scheduler's zones are built from decimated (enlarged)
//! slices, so anything the scheduler accepts passes here, while the
//! checker itself never under-approximates a collision.
//!
//! Both entry points are total: malformed inputs (unknown ids, heights
//! the printer does not declare) are skipped, not reported.

use log::debug;
use seqprint_geometry::polygon::segments_properly_cross;
use seqprint_geometry::{Polygon, Vector};

use crate::preprocess::{expand_box_zone, expand_convex_zone};
use crate::types::{ObjectId, ObjectToPrint, PrinterGeometry, ScheduledPlate};

/// Is the schedule collision-free when printed one object at a time in
/// the given per-plate order?
pub fn check_sequential_printability(
    geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    plates: &[ScheduledPlate],
) -> bool {
    find_sequential_conflict(geometry, objects, plates).is_none()
}

/// Find one conflicting ordered pair in a schedule, if any: the second
/// object of the pair cannot be printed because the extruder would hit
/// the first. Not necessarily the first conflict in print order.
pub fn find_sequential_conflict(
    geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    plates: &[ScheduledPlate],
) -> Option<(ObjectId, ObjectId)> {
    for plate in plates {
        // Resolve ids against the inputs; unknown ids are skipped so the
        // checker stays total.
        let entries: Vec<(&crate::types::ScheduledObject, &ObjectToPrint)> = plate
            .scheduled_objects
            .iter()
            .filter_map(|scheduled| {
                objects
                    .iter()
                    .find(|object| object.id == scheduled.id)
                    .map(|object| (scheduled, object))
            })
            .collect();

        for earlier_index in 0..entries.len() {
            let (earlier_placed, earlier) = entries[earlier_index];
            let zones = unreachable_zones_at(
                geometry,
                earlier,
                Vector::new(earlier_placed.x, earlier_placed.y),
            );
            if zones.is_empty() {
                continue;
            }
            for (later_placed, later) in entries.iter().skip(earlier_index + 1) {
                let Some(footprint) = later.footprint() else {
                    continue;
                };
                let footprint =
                    footprint.translated(Vector::new(later_placed.x, later_placed.y));
                if zones
                    .iter()
                    .any(|zone| zone_hits_footprint(zone, &footprint))
                {
                    debug!(
                        "conflict: object {} unreachable zone hits object {}",
                        earlier.id, later.id
                    );
                    return Some((earlier.id, later.id));
                }
            }
        }
    }
    None
}

/// A zone collides with a footprint when a footprint vertex lies
/// strictly inside the zone, a zone vertex lies strictly inside the
/// footprint, or their edges properly cross. Boundary contact is
/// allowed.
fn zone_hits_footprint(zone: &Polygon, footprint: &Polygon) -> bool {
    if footprint
        .points
        .iter()
        .any(|&vertex| zone.contains_point_strictly(vertex))
    {
        return true;
    }
    if zone
        .points
        .iter()
        .any(|&vertex| footprint.contains_point_strictly(vertex))
    {
        return true;
    }
    zone.edges().any(|(a1, a2)| {
        footprint
            .edges()
            .any(|(b1, b2)| segments_properly_cross(a1, a2, b1, b2))
    })
}

/// Build an object's unreachable zone polygons at full slicer scale
/// from its original slices, translated to its placement. Slices at
/// undeclared heights are skipped.
fn unreachable_zones_at(
    geometry: &PrinterGeometry,
    object: &ObjectToPrint,
    offset: Vector,
) -> Vec<Polygon> {
    let mut zones = Vec::new();
    for (height, polygon) in &object.slices {
        if polygon.is_empty() {
            continue;
        }
        let mut ccw = polygon.clone();
        ccw.make_ccw();
        let Some(silhouettes) = geometry.extruder_slices.get(height) else {
            continue;
        };
        let contributions = if geometry.convex_heights.contains(height) {
            expand_convex_zone(&ccw, silhouettes)
        } else if geometry.box_heights.contains(height) {
            expand_box_zone(&ccw, silhouettes)
        } else {
            continue;
        };
        for mut zone in contributions {
            zone.make_ccw();
            zone.translate(offset);
            zones.push(zone);
        }
    }
    zones
}
