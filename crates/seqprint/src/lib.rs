#![warn(missing_docs)]

//! Sequential-print arrangement for one-object-at-a-time printing.
//!
//! Given per-height outline slices of a set of objects and the
//! printer's extruder/gantry/hose silhouettes at matching heights, this
//! crate decides which print bed each object goes on, where it is
//! placed and in which order the objects print, so that the moving
//! print head never collides with an already-printed object.
//!
//! The pipeline: each object's slices are decimated and expanded into
//! *unreachable zones* (Minkowski sums against convex silhouettes,
//! bounding-box sums against gantry-style ones); a sub-global scheduler
//! then asks an SMT solver for `(x, y, t)` placements group by group,
//! shrinking a plate-centered bounding box and lazily strengthening the
//! overlap constraints until a verified arrangement exists; a
//! printability checker can replay any schedule in exact integer
//! arithmetic.
//!
//! # Example
//!
//! ```ignore
//! use seqprint::{profiles, SolverConfiguration};
//!
//! let geometry = profiles::mk3s();
//! let config = SolverConfiguration::for_printer(geometry);
//! let objects = seqprint::io::load_objects_from_file("export.txt".as_ref())?;
//! let plates = seqprint::schedule_objects_for_sequential_print(
//!     &config,
//!     geometry,
//!     &objects,
//!     |percent| eprintln!("{percent}%"),
//! )?;
//! assert!(seqprint::check_sequential_printability(geometry, &objects, &plates));
//! ```

pub mod checker;
pub mod config;
pub mod error;
pub mod io;
pub mod preprocess;
pub mod profiles;
pub mod scheduler;
pub mod types;

pub use checker::{check_sequential_printability, find_sequential_conflict};
pub use config::{DecimationPrecision, SolverConfiguration};
pub use error::{Result, ScheduleError};
pub use preprocess::{extruder_unreachable_zones, SolvableObject};
pub use seqprint_geometry::{BoundingBox, Point, Polygon};
pub use types::{ObjectId, ObjectToPrint, PrinterGeometry, ScheduledObject, ScheduledPlate};

/// Ratio between slicer coordinates and the solver's working scale.
pub const SLICER_SCALE_FACTOR: i64 = 100_000;

/// Schedule objects for sequential printing.
///
/// Preprocesses every object against `geometry` (plate bounds are
/// derived from it, overriding whatever the configuration carried),
/// then fills beds one at a time. `progress` receives a non-decreasing
/// percentage in `0..=100` from the scheduling thread; keep it cheap.
///
/// # Errors
///
/// [`ScheduleError::ObjectTooLarge`] when an object cannot fit the
/// plate even alone, [`ScheduleError::SolverTimeout`] when a placement
/// query exceeds the configured budget, plus the preprocessing errors
/// for malformed inputs.
pub fn schedule_objects_for_sequential_print(
    config: &SolverConfiguration,
    geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    mut progress: impl FnMut(i32),
) -> Result<Vec<ScheduledPlate>> {
    geometry.validate()?;
    let mut config = config.clone();
    // Adopt the plate from the geometry; the search knobs stay as the
    // caller tuned them.
    let (plate_box, plate_polygon) = geometry.plate_bounds(SLICER_SCALE_FACTOR);
    config.plate_bounding_box = plate_box;
    config.plate_bounding_polygon = plate_polygon;
    let solvable = preprocess::prepare_objects(&config, geometry, objects, true)?;
    scheduler::schedule_objects(&config, &solvable, &mut progress)
}

/// In-place variant of [`schedule_objects_for_sequential_print`]:
/// appends the produced plates to `plates`.
pub fn schedule_objects_for_sequential_print_into(
    config: &SolverConfiguration,
    geometry: &PrinterGeometry,
    objects: &[ObjectToPrint],
    plates: &mut Vec<ScheduledPlate>,
    progress: impl FnMut(i32),
) -> Result<()> {
    let scheduled = schedule_objects_for_sequential_print(config, geometry, objects, progress)?;
    plates.extend(scheduled);
    Ok(())
}

/// Schedule objects against precomputed silhouette level lists instead
/// of a full printer geometry, for batch callers that reuse the same
/// zones across many calls. The configuration's plate bounds are used
/// as-is; each object's non-empty slices pair positionally with the
/// convex levels first, then the box levels.
pub fn schedule_objects_with_unreachable_zones(
    config: &SolverConfiguration,
    objects: &[ObjectToPrint],
    convex_levels: &[Vec<Polygon>],
    box_levels: &[Vec<Polygon>],
    mut progress: impl FnMut(i32),
) -> Result<Vec<ScheduledPlate>> {
    let solvable =
        preprocess::prepare_objects_with_zones(config, objects, convex_levels, box_levels, true)?;
    scheduler::schedule_objects(config, &solvable, &mut progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The MK4-style geometry the slicer exports for MK3S-height
    /// compatibility: convex nozzle/extruder levels, box gantry/hose
    /// levels.
    const PRINTER_GEOMETRY_TEXT: &str = "X_SIZE250000000\n\
Y_SIZE210000000\n\
CONVEX_HEIGHT0\n\
CONVEX_HEIGHT2000000\n\
BOX_HEIGHT18000000\n\
BOX_HEIGHT26000000\n\
POLYGON_AT_HEIGHT0\n\
POINT-500000 -500000\n\
POINT500000 -500000\n\
POINT500000 500000\n\
POINT-500000 500000\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-1000000 -21000000\n\
POINT37000000 -21000000\n\
POINT37000000 44000000\n\
POINT-1000000 44000000\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-40000000 -45000000\n\
POINT38000000 -45000000\n\
POINT38000000 20000000\n\
POINT-40000000 20000000\n\
POLYGON_AT_HEIGHT18000000\n\
POINT-350000000 -23000000\n\
POINT350000000 -23000000\n\
POINT350000000 -35000000\n\
POINT-350000000 -35000000\n\
POLYGON_AT_HEIGHT26000000\n\
POINT-12000000 -350000000\n\
POINT9000000 -350000000\n\
POINT9000000 -39000000\n\
POINT-12000000 -39000000\n";

    fn test_geometry() -> PrinterGeometry {
        io::load_printer_geometry_from_str(PRINTER_GEOMETRY_TEXT).unwrap()
    }

    /// 42 × 32 mm footprint with chamfered top corners.
    fn hexagon_footprint() -> Polygon {
        Polygon::from_pairs(&[
            (-21_000_000, -16_000_000),
            (21_000_000, -16_000_000),
            (21_000_000, 12_000_000),
            (17_000_000, 16_000_000),
            (-17_000_000, 16_000_000),
            (-21_000_000, 12_000_000),
        ])
    }

    fn upper_rectangle() -> Polygon {
        Polygon::from_pairs(&[
            (-21_000_000, -16_000_000),
            (21_000_000, -16_000_000),
            (21_000_000, 4_000_000),
            (-21_000_000, 4_000_000),
        ])
    }

    fn tall_object(id: i32) -> ObjectToPrint {
        ObjectToPrint {
            id,
            glued_to_next: false,
            total_height: 62_265_434,
            slices: vec![
                (0, hexagon_footprint()),
                (2_000_000, hexagon_footprint()),
                (18_000_000, upper_rectangle()),
                (26_000_000, upper_rectangle()),
            ],
        }
    }

    fn short_object(id: i32) -> ObjectToPrint {
        ObjectToPrint {
            id,
            glued_to_next: false,
            total_height: 10_000_000,
            slices: vec![
                (0, hexagon_footprint()),
                (2_000_000, upper_rectangle()),
                (18_000_000, Polygon::new(vec![])),
                (26_000_000, Polygon::new(vec![])),
            ],
        }
    }

    fn twelve_objects() -> Vec<ObjectToPrint> {
        (1..=12)
            .map(|id| {
                if id % 3 == 0 {
                    short_object(id)
                } else {
                    tall_object(id)
                }
            })
            .collect()
    }

    fn assert_schedule_shape(
        geometry: &PrinterGeometry,
        objects: &[ObjectToPrint],
        plates: &[ScheduledPlate],
    ) {
        let plate_box = geometry.plate.bounding_box();
        let mut seen = std::collections::BTreeSet::new();
        for plate in plates {
            assert!(!plate.scheduled_objects.is_empty());
            for placed in &plate.scheduled_objects {
                assert!(seen.insert(placed.id), "object {} placed twice", placed.id);
                assert!(placed.x >= plate_box.min.x && placed.x <= plate_box.max.x);
                assert!(placed.y >= plate_box.min.y && placed.y <= plate_box.max.y);

                // The whole placed footprint stays on the plate, not
                // just its reference point.
                let object = objects.iter().find(|o| o.id == placed.id).unwrap();
                let footprint = object
                    .footprint()
                    .unwrap()
                    .translated(seqprint_geometry::Vector::new(placed.x, placed.y));
                assert!(
                    plate_box.contains_box(&footprint.bounding_box()),
                    "object {} footprint leaves the plate",
                    placed.id
                );
            }
        }
        assert_eq!(seen.len(), objects.len());
    }

    #[test]
    fn test_schedule_twelve_objects() {
        let geometry = test_geometry();
        let objects = twelve_objects();
        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::High;
        config.optimization_timeout = "60000".into();

        let mut reports = Vec::new();
        let plates = schedule_objects_for_sequential_print(&config, &geometry, &objects, |p| {
            reports.push(p)
        })
        .unwrap();

        // The gantry/hose sweeps are far too large for one bed.
        assert!(plates.len() >= 2);
        assert_schedule_shape(&geometry, &objects, &plates);
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 100);

        // The scheduler's own output must replay collision-free.
        assert!(check_sequential_printability(&geometry, &objects, &plates));
        assert_eq!(find_sequential_conflict(&geometry, &objects, &plates), None);
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let geometry = test_geometry();
        let objects: Vec<ObjectToPrint> = (1..=4).map(short_object).collect();
        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::Low;

        let first =
            schedule_objects_for_sequential_print(&config, &geometry, &objects, |_| {}).unwrap();
        let second =
            schedule_objects_for_sequential_print(&config, &geometry, &objects, |_| {}).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.scheduled_objects, b.scheduled_objects);
        }
    }

    #[test]
    fn test_glued_objects_preserve_caller_order() {
        let geometry = test_geometry();
        let mut objects: Vec<ObjectToPrint> = (1..=8)
            .map(|id| {
                if id <= 2 {
                    tall_object(id)
                } else {
                    short_object(id)
                }
            })
            .collect();
        for object in &mut objects {
            object.glued_to_next = true;
        }
        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::Low;
        config.optimization_timeout = "60000".into();

        let plates =
            schedule_objects_for_sequential_print(&config, &geometry, &objects, |_| {}).unwrap();
        assert_schedule_shape(&geometry, &objects, &plates);

        // Print order must follow caller order across all beds.
        let printed: Vec<ObjectId> = plates
            .iter()
            .flat_map(|plate| plate.scheduled_objects.iter().map(|placed| placed.id))
            .collect();
        let expected: Vec<ObjectId> = (1..=8).collect();
        assert_eq!(printed, expected);

        assert!(check_sequential_printability(&geometry, &objects, &plates));
    }

    #[test]
    fn test_oversized_object_is_rejected() {
        let geometry = test_geometry();
        let config = SolverConfiguration::for_printer(&geometry);
        let huge = ObjectToPrint {
            id: 42,
            glued_to_next: false,
            total_height: 10_000_000,
            slices: vec![(
                0,
                Polygon::from_pairs(&[
                    (-130_000_000, -110_000_000),
                    (130_000_000, -110_000_000),
                    (130_000_000, 110_000_000),
                    (-130_000_000, 110_000_000),
                ]),
            )],
        };
        let result =
            schedule_objects_for_sequential_print(&config, &geometry, &[huge], |_| {});
        assert!(matches!(
            result,
            Err(ScheduleError::ObjectTooLarge { id: 42 })
        ));
    }

    #[test]
    fn test_one_millisecond_budget_times_out() {
        let geometry = test_geometry();
        // Undecimated many-vertex footprints make the pair formula far
        // too large for a 1 ms budget.
        let blob = |id: i32, cx: i64| {
            let points: Vec<(i64, i64)> = (0..96)
                .map(|i| {
                    let angle = i as f64 / 96.0 * std::f64::consts::TAU;
                    (
                        cx + (20_000_000.0 * angle.cos()).round() as i64,
                        (16_000_000.0 * angle.sin()).round() as i64,
                    )
                })
                .collect();
            ObjectToPrint {
                id,
                glued_to_next: false,
                total_height: 10_000_000,
                slices: vec![(0, Polygon::from_pairs(&points))],
            }
        };
        let objects = vec![blob(1, 0), blob(2, 0)];
        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::Undefined;
        config.optimization_timeout = "1".into();

        let result = schedule_objects_for_sequential_print(&config, &geometry, &objects, |_| {});
        assert!(matches!(result, Err(ScheduleError::SolverTimeout { .. })));
    }

    /// A slice of the slicer's export stream: one tall object followed
    /// by three that only reach the extruder level.
    const ARRANGE_EXPORT_TEXT: &str = "OBJECT_ID131\n\
TOTAL_HEIGHT62265434\n\
POLYGON_AT_HEIGHT0\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 12000000\n\
POINT17000000 16000000\n\
POINT-17000000 16000000\n\
POINT-21000000 12000000\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 12000000\n\
POINT17000000 16000000\n\
POINT-17000000 16000000\n\
POINT-21000000 12000000\n\
POLYGON_AT_HEIGHT18000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 4000000\n\
POINT-21000000 4000000\n\
POLYGON_AT_HEIGHT26000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 4000000\n\
POINT-21000000 4000000\n\
OBJECT_ID66\n\
TOTAL_HEIGHT10000000\n\
POLYGON_AT_HEIGHT0\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 12000000\n\
POINT17000000 16000000\n\
POINT-17000000 16000000\n\
POINT-21000000 12000000\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 4000000\n\
POINT-21000000 4000000\n\
POLYGON_AT_HEIGHT18000000\n\
POLYGON_AT_HEIGHT26000000\n\
OBJECT_ID44\n\
TOTAL_HEIGHT10000000\n\
POLYGON_AT_HEIGHT0\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 11999992\n\
POINT17000000 15999992\n\
POINT-17000000 15999992\n\
POINT-21000000 11999992\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 3999992\n\
POINT-21000000 3999992\n\
POLYGON_AT_HEIGHT18000000\n\
POLYGON_AT_HEIGHT26000000\n\
OBJECT_ID88\n\
TOTAL_HEIGHT10000000\n\
POLYGON_AT_HEIGHT0\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 12000000\n\
POINT17000000 16000000\n\
POINT-17000000 16000000\n\
POINT-21000000 12000000\n\
POLYGON_AT_HEIGHT2000000\n\
POINT-21000000 -16000000\n\
POINT21000000 -16000000\n\
POINT21000000 4000000\n\
POINT-21000000 4000000\n\
POLYGON_AT_HEIGHT18000000\n\
POLYGON_AT_HEIGHT26000000\n";

    #[test]
    fn test_export_to_import_round_trip() {
        let geometry = test_geometry();
        let objects = io::load_objects_from_str(ARRANGE_EXPORT_TEXT).unwrap();
        assert_eq!(objects.len(), 4);
        assert_eq!(objects[0].slices.len(), 4);
        // Short objects carry empty entries for the upper heights.
        assert!(objects[1].slices[2].1.is_empty());

        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::Low;
        config.optimization_timeout = "60000".into();

        let plates =
            schedule_objects_for_sequential_print(&config, &geometry, &objects, |_| {}).unwrap();
        assert_schedule_shape(&geometry, &objects, &plates);
        assert!(check_sequential_printability(&geometry, &objects, &plates));

        let mut buffer = Vec::new();
        io::write_import_data(&mut buffer, &plates).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().count(), 4);
        for line in text.lines() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            assert_eq!(fields.len(), 3);
            let id: i32 = fields[0].parse().unwrap();
            assert!([131, 66, 44, 88].contains(&id));
            let _: i64 = fields[1].parse().unwrap();
            let _: i64 = fields[2].parse().unwrap();
        }
    }

    #[test]
    fn test_schedule_with_precomputed_zones() {
        let geometry = test_geometry();
        let (convex_levels, box_levels) = extruder_unreachable_zones(&geometry);
        assert_eq!(convex_levels.len(), 2);
        assert_eq!(box_levels.len(), 2);

        let objects: Vec<ObjectToPrint> = (1..=3).map(short_object).collect();
        let mut config = SolverConfiguration::for_printer(&geometry);
        config.decimation_precision = DecimationPrecision::Low;

        let plates = schedule_objects_with_unreachable_zones(
            &config,
            &objects,
            &convex_levels,
            &box_levels,
            |_| {},
        )
        .unwrap();
        assert_schedule_shape(&geometry, &objects, &plates);
        assert!(check_sequential_printability(&geometry, &objects, &plates));
    }
}
