//! The slicer-side text formats.
//!
//! Three line-oriented formats are exchanged with the slicer:
//!
//! * the *export* format describing objects (`OBJECT_ID`,
//!   `TOTAL_HEIGHT`, `POLYGON_AT_HEIGHT`, `POINT` keys),
//! * the *printer geometry* format (`X_SIZE`, `Y_SIZE`,
//!   `CONVEX_HEIGHT`, `BOX_HEIGHT`, `POLYGON_AT_HEIGHT`, `POINT`),
//! * the *import* format carrying scheduled positions back
//!   (`<id> <x> <y>` per line).
//!
//! Keys sit at the start of the line with their numeric argument
//! attached directly (no separating whitespace); `POINT` is the only
//! key whose arguments contain a space.

use std::fs;
use std::io::Write;
use std::path::Path;

use seqprint_geometry::{Point, Polygon};

use crate::error::{Result, ScheduleError};
use crate::types::{ObjectToPrint, PrinterGeometry, ScheduledPlate};

/// Load objects from an export-format file.
pub fn load_objects_from_file(path: &Path) -> Result<Vec<ObjectToPrint>> {
    load_objects_from_str(&fs::read_to_string(path)?)
}

/// Load objects from export-format text.
pub fn load_objects_from_str(text: &str) -> Result<Vec<ObjectToPrint>> {
    let mut objects: Vec<ObjectToPrint> = Vec::new();

    for (number, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(value) = strip_key(line, "OBJECT_ID") {
            objects.push(ObjectToPrint {
                id: parse_int(value, number)? as i32,
                glued_to_next: false,
                total_height: 0,
                slices: Vec::new(),
            });
        } else if let Some(value) = strip_key(line, "TOTAL_HEIGHT") {
            let object = current(&mut objects, number)?;
            object.total_height = parse_int(value, number)?;
        } else if let Some(value) = strip_key(line, "POLYGON_AT_HEIGHT") {
            let height = parse_int(value, number)?;
            let object = current(&mut objects, number)?;
            object.slices.push((height, Polygon::new(Vec::new())));
        } else if let Some(value) = strip_key(line, "POINT") {
            let point = parse_point(value, number)?;
            let object = current(&mut objects, number)?;
            let slice = object.slices.last_mut().ok_or(ScheduleError::Parse {
                line: number + 1,
                message: "POINT before any POLYGON_AT_HEIGHT".into(),
            })?;
            slice.1.points.push(point);
        } else {
            return Err(ScheduleError::Parse {
                line: number + 1,
                message: format!("unrecognized line {line:?}"),
            });
        }
    }
    Ok(objects)
}

/// Load a printer geometry from a geometry-format file.
pub fn load_printer_geometry_from_file(path: &Path) -> Result<PrinterGeometry> {
    load_printer_geometry_from_str(&fs::read_to_string(path)?)
}

/// Load a printer geometry from geometry-format text. The plate
/// rectangle is synthesized from `X_SIZE` and `Y_SIZE`.
pub fn load_printer_geometry_from_str(text: &str) -> Result<PrinterGeometry> {
    let mut geometry = PrinterGeometry {
        plate: Polygon::new(Vec::new()),
        convex_heights: Default::default(),
        box_heights: Default::default(),
        extruder_slices: Default::default(),
    };
    let mut x_size: Option<i64> = None;
    let mut y_size: Option<i64> = None;
    let mut current_height: Option<i64> = None;

    for (number, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(value) = strip_key(line, "X_SIZE") {
            x_size = Some(parse_int(value, number)?);
        } else if let Some(value) = strip_key(line, "Y_SIZE") {
            y_size = Some(parse_int(value, number)?);
        } else if let Some(value) = strip_key(line, "CONVEX_HEIGHT") {
            geometry.convex_heights.insert(parse_int(value, number)?);
        } else if let Some(value) = strip_key(line, "BOX_HEIGHT") {
            geometry.box_heights.insert(parse_int(value, number)?);
        } else if let Some(value) = strip_key(line, "POLYGON_AT_HEIGHT") {
            let height = parse_int(value, number)?;
            geometry
                .extruder_slices
                .entry(height)
                .or_default()
                .push(Polygon::new(Vec::new()));
            current_height = Some(height);
        } else if let Some(value) = strip_key(line, "POINT") {
            let point = parse_point(value, number)?;
            let height = current_height.ok_or(ScheduleError::Parse {
                line: number + 1,
                message: "POINT before any POLYGON_AT_HEIGHT".into(),
            })?;
            let polygons = geometry.extruder_slices.entry(height).or_default();
            if let Some(polygon) = polygons.last_mut() {
                polygon.points.push(point);
            }
        } else {
            return Err(ScheduleError::Parse {
                line: number + 1,
                message: format!("unrecognized line {line:?}"),
            });
        }
    }

    let (x_size, y_size) = match (x_size, y_size) {
        (Some(x), Some(y)) if x > 0 && y > 0 => (x, y),
        _ => {
            return Err(ScheduleError::Parse {
                line: text.lines().count(),
                message: "missing or non-positive X_SIZE / Y_SIZE".into(),
            })
        }
    };
    geometry.plate = Polygon::from_pairs(&[(0, 0), (x_size, 0), (x_size, y_size), (0, y_size)]);
    Ok(geometry)
}

/// Write scheduled positions in the import format, one `<id> <x> <y>`
/// line per object, plates in order.
pub fn write_import_data<W: Write>(mut writer: W, plates: &[ScheduledPlate]) -> Result<()> {
    for plate in plates {
        for object in &plate.scheduled_objects {
            writeln!(writer, "{} {} {}", object.id, object.x, object.y)?;
        }
    }
    Ok(())
}

/// Save scheduled positions to an import-format file.
pub fn save_import_data(path: &Path, plates: &[ScheduledPlate]) -> Result<()> {
    let file = fs::File::create(path)?;
    write_import_data(std::io::BufWriter::new(file), plates)
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)
}

fn parse_int(value: &str, number: usize) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ScheduleError::Parse {
            line: number + 1,
            message: format!("expected an integer, found {:?}", value.trim()),
        })
}

fn parse_point(value: &str, number: usize) -> Result<Point> {
    let mut parts = value.split_whitespace();
    let x = parts.next().and_then(|v| v.parse::<i64>().ok());
    let y = parts.next().and_then(|v| v.parse::<i64>().ok());
    match (x, y, parts.next()) {
        (Some(x), Some(y), None) => Ok(Point::new(x, y)),
        _ => Err(ScheduleError::Parse {
            line: number + 1,
            message: format!("expected POINT<x> <y>, found {value:?}"),
        }),
    }
}

fn current<'a>(
    objects: &'a mut [ObjectToPrint],
    number: usize,
) -> Result<&'a mut ObjectToPrint> {
    objects.last_mut().ok_or(ScheduleError::Parse {
        line: number + 1,
        message: "object data before any OBJECT_ID".into(),
    })
}
