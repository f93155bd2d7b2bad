//! Object preprocessing: decimation, plate-fit checks, unreachable-zone
//! expansion and the low-object gluing rule.
//!
//! Per object the pipeline walks its height slices, decimates each
//! non-empty polygon, classifies the height as convex (Minkowski
//! expansion against the extruder silhouette) or box (bounding-box sum
//! against the gantry/hose silhouette), simplifies away zone levels
//! consumed by larger ones, and scales everything down to solver units.
//! The result is one [`SolvableObject`] per input, in caller order.

use log::debug;
use rayon::prelude::*;
use seqprint_geometry::boolean::{consumed_by, union_area};
use seqprint_geometry::convex::{convex_hull, minkowski_sum_convex};
use seqprint_geometry::decimate::decimate_polygon;
use seqprint_geometry::{Point, Polygon};

use crate::config::SolverConfiguration;
use crate::error::{Result, ScheduleError};
use crate::types::{ObjectToPrint, PrinterGeometry};
use crate::SLICER_SCALE_FACTOR;

/// Preprocessed form of an [`ObjectToPrint`], ready for the solver.
#[derive(Debug, Clone)]
pub struct SolvableObject {
    /// Identifier of the input object.
    pub id: crate::types::ObjectId,
    /// Decimated footprint at solver scale, counter-clockwise.
    pub footprint: Polygon,
    /// Unreachable-zone pieces at solver scale, counter-clockwise and
    /// convex; their union is where no later object may sit while this
    /// one is being printed at the origin.
    pub zones: Vec<Polygon>,
    /// Glue flag, carried from the input or switched on by
    /// [`glue_low_objects`].
    pub glued_to_next: bool,
}

/// Extract the per-height silhouette polygon lists from a printer
/// geometry: `(convex levels, box levels)`, each in ascending height
/// order.
pub fn extruder_unreachable_zones(
    geometry: &PrinterGeometry,
) -> (Vec<Vec<Polygon>>, Vec<Vec<Polygon>>) {
    let collect = |heights: &std::collections::BTreeSet<i64>| {
        heights
            .iter()
            .filter_map(|height| geometry.extruder_slices.get(height).cloned())
            .collect::<Vec<_>>()
    };
    (collect(&geometry.convex_heights), collect(&geometry.box_heights))
}

/// Preprocess all objects against a printer geometry, in caller order.
pub fn prepare_objects(
    config: &SolverConfiguration,
    geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    extra_safety: bool,
) -> Result<Vec<SolvableObject>> {
    let mut solvable: Vec<SolvableObject> = objects
        .par_iter()
        .map(|object| prepare_one(config, object, extra_safety, |height| {
            if geometry.convex_heights.contains(&height) {
                geometry
                    .extruder_slices
                    .get(&height)
                    .map(|polygons| (HeightKind::Convex, polygons.as_slice()))
            } else if geometry.box_heights.contains(&height) {
                geometry
                    .extruder_slices
                    .get(&height)
                    .map(|polygons| (HeightKind::Box, polygons.as_slice()))
            } else {
                None
            }
        }))
        .collect::<Result<_>>()?;
    glue_low_objects(&mut solvable);
    Ok(solvable)
}

/// Preprocess objects against precomputed silhouette level lists. The
/// object's non-empty slices are paired with the levels positionally:
/// the first slices against the convex levels, the following ones
/// against the box levels.
pub fn prepare_objects_with_zones(
    config: &SolverConfiguration,
    objects: &[ObjectToPrint],
    convex_levels: &[Vec<Polygon>],
    box_levels: &[Vec<Polygon>],
    extra_safety: bool,
) -> Result<Vec<SolvableObject>> {
    let mut solvable: Vec<SolvableObject> = objects
        .par_iter()
        .map(|object| {
            let mut slot = 0usize;
            let mut resolve = |_height: i64| {
                let entry = if slot < convex_levels.len() {
                    Some((HeightKind::Convex, convex_levels[slot].as_slice()))
                } else if slot - convex_levels.len() < box_levels.len() {
                    Some((
                        HeightKind::Box,
                        box_levels[slot - convex_levels.len()].as_slice(),
                    ))
                } else {
                    None
                };
                slot += 1;
                entry
            };
            prepare_one(config, object, extra_safety, &mut resolve)
        })
        .collect::<Result<_>>()?;
    glue_low_objects(&mut solvable);
    Ok(solvable)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum HeightKind {
    Convex,
    Box,
}

fn prepare_one<'a, F>(
    config: &SolverConfiguration,
    object: &ObjectToPrint,
    extra_safety: bool,
    mut resolve_height: F,
) -> Result<SolvableObject>
where
    F: FnMut(i64) -> Option<(HeightKind, &'a [Polygon])>,
{
    let tolerance = config.decimation_precision.tolerance();

    // Slicer-scale zone contributions, one level per non-empty slice.
    let mut levels: Vec<Vec<Polygon>> = Vec::new();
    let mut footprint: Option<Polygon> = None;

    for (height, polygon) in &object.slices {
        if polygon.is_empty() {
            continue;
        }
        let decimated = match tolerance {
            Some(tolerance) => decimate_polygon(polygon, tolerance, extra_safety),
            None => {
                let mut copy = polygon.clone();
                copy.make_ccw();
                copy
            }
        };
        if !polygon_fits_plate(config, &decimated) {
            return Err(ScheduleError::ObjectTooLarge { id: object.id });
        }
        let (kind, silhouettes) =
            resolve_height(*height).ok_or(ScheduleError::SliceHeightMismatch {
                id: object.id,
                height: *height,
            })?;
        let contributions = match kind {
            HeightKind::Convex => expand_convex_zone(&decimated, silhouettes),
            HeightKind::Box => expand_box_zone(&decimated, silhouettes),
        };
        if kind == HeightKind::Convex && footprint.is_none() {
            footprint = Some(decimated);
        }
        levels.push(contributions);
    }

    let footprint = footprint.ok_or(ScheduleError::EmptyFootprint { id: object.id })?;
    let levels = simplify_zone_levels(levels);

    let mut zones = Vec::new();
    for level in levels {
        for piece in level {
            // Zones scale down rounding outward so truncation can never
            // admit a placement the slicer-scale zone would reject; the
            // hull repairs any convexity lost to per-vertex rounding.
            let scaled = piece.scaled_down_outward(SLICER_SCALE_FACTOR);
            zones.push(convex_hull(&scaled.points));
        }
    }

    debug!(
        "object {}: footprint {} vertices, {} zone pieces",
        object.id,
        footprint.len(),
        zones.len()
    );
    Ok(SolvableObject {
        id: object.id,
        footprint: footprint.scaled_down(SLICER_SCALE_FACTOR),
        zones,
        glued_to_next: object.glued_to_next,
    })
}

/// Minkowski-expand a slice polygon by each silhouette polygon of its
/// height. Slicer scale in, slicer scale out.
pub(crate) fn expand_convex_zone(polygon: &Polygon, silhouettes: &[Polygon]) -> Vec<Polygon> {
    let mut contributions = Vec::new();
    for silhouette in silhouettes {
        contributions.extend(minkowski_sum_convex(polygon, silhouette));
    }
    contributions
}

/// Expand a slice polygon by each silhouette's bounding box: the
/// resulting rectangle spans the sums of the two bounding boxes.
pub(crate) fn expand_box_zone(polygon: &Polygon, silhouettes: &[Polygon]) -> Vec<Polygon> {
    if polygon.is_empty() {
        return Vec::new();
    }
    let polygon_box = polygon.bounding_box();
    silhouettes
        .iter()
        .filter(|silhouette| !silhouette.is_empty())
        .map(|silhouette| {
            let silhouette_box = silhouette.bounding_box();
            Polygon::rectangle(
                Point::new(
                    polygon_box.min.x + silhouette_box.min.x,
                    polygon_box.min.y + silhouette_box.min.y,
                ),
                Point::new(
                    polygon_box.max.x + silhouette_box.max.x,
                    polygon_box.max.y + silhouette_box.max.y,
                ),
            )
        })
        .collect()
}

/// Drop every zone level whose area is fully consumed by a larger
/// level. Keeps the union semantic while shrinking the constraint set.
fn simplify_zone_levels(levels: Vec<Vec<Polygon>>) -> Vec<Vec<Polygon>> {
    let areas: Vec<f64> = levels.iter().map(|level| union_area(level)).collect();
    let mut kept = Vec::with_capacity(levels.len());
    for (i, level) in levels.iter().enumerate() {
        let consumed = levels.iter().enumerate().any(|(j, consumer)| {
            i != j && areas[j] > areas[i] && consumed_by(level, consumer)
        });
        if consumed {
            debug!("zone level {i} consumed by a larger level, dropped");
        } else {
            kept.push(level.clone());
        }
    }
    kept
}

/// Does the polygon's bounding box fit the plate's dimensions at all?
/// The polygon is in slicer units; the configured plate is in solver
/// units.
pub fn polygon_fits_plate(config: &SolverConfiguration, polygon: &Polygon) -> bool {
    let polygon_box = polygon.bounding_box();
    let plate_box = match &config.plate_bounding_polygon {
        Some(plate) => plate.bounding_box(),
        None => config.plate_bounding_box,
    };
    polygon_box.x_size() <= plate_box.x_size() * SLICER_SCALE_FACTOR
        && polygon_box.y_size() <= plate_box.y_size() * SLICER_SCALE_FACTOR
}

/// Does the polygon, translated by `(x, y)` slicer units, lie within
/// the plate?
///
/// With a polygonal plate only the four corners of the translated
/// bounding box are tested; a concave plate could accept a placement
/// that sticks out between two tested corners, which is why plates are
/// required to be convex.
pub fn position_within_plate(
    config: &SolverConfiguration,
    x: i64,
    y: i64,
    polygon: &Polygon,
) -> bool {
    let polygon_box = polygon.bounding_box();
    match &config.plate_bounding_polygon {
        None => {
            let plate = &config.plate_bounding_box;
            x + polygon_box.min.x >= plate.min.x * SLICER_SCALE_FACTOR
                && x + polygon_box.max.x <= plate.max.x * SLICER_SCALE_FACTOR
                && y + polygon_box.min.y >= plate.min.y * SLICER_SCALE_FACTOR
                && y + polygon_box.max.y <= plate.max.y * SLICER_SCALE_FACTOR
        }
        Some(plate) => {
            let plate = plate.scaled_up(SLICER_SCALE_FACTOR);
            let corners = [
                Point::new(x + polygon_box.min.x, y + polygon_box.min.y),
                Point::new(x + polygon_box.max.x, y + polygon_box.min.y),
                Point::new(x + polygon_box.max.x, y + polygon_box.max.y),
                Point::new(x + polygon_box.min.x, y + polygon_box.max.y),
            ];
            corners.iter().all(|&corner| plate.contains_point(corner))
        }
    }
}

/// The low-object gluing rule: an object whose unreachable area is
/// small relative to its footprint is "low"; two or more consecutive
/// low objects get glued so the scheduler packs them into the same bed
/// batch.
pub fn glue_low_objects(objects: &mut [SolvableObject]) {
    let mut low_run = 0u32;
    for i in 0..objects.len() {
        let polygon_area = union_area(std::slice::from_ref(&objects[i].footprint));
        let mut union_input = Vec::with_capacity(objects[i].zones.len() + 1);
        union_input.push(objects[i].footprint.clone());
        union_input.extend(objects[i].zones.iter().cloned());
        let unreachable_area = union_area(&union_input);

        if 2.0 * polygon_area > unreachable_area {
            low_run += 1;
            if low_run >= 2 {
                objects[i - 1].glued_to_next = true;
                low_run = 1;
            }
        } else {
            low_run = 0;
        }
    }
}
