//! Built-in printer profiles.
//!
//! The MK3S, MK4 and XL silhouettes ship as JSON data files embedded in
//! the crate, parsed once on first use and immutable afterwards. The
//! polygon values are coarse approximations of the real machines; treat
//! them as replaceable data, not as measured geometry.

use std::sync::OnceLock;

use seqprint_geometry::{Point, Polygon};
use serde::Deserialize;

use crate::types::PrinterGeometry;

#[derive(Deserialize)]
struct ProfileData {
    #[allow(dead_code)]
    name: String,
    plate: PlateData,
    convex_heights: Vec<i64>,
    box_heights: Vec<i64>,
    slices: Vec<SliceData>,
}

#[derive(Deserialize)]
struct PlateData {
    x_size: i64,
    y_size: i64,
}

#[derive(Deserialize)]
struct SliceData {
    height: i64,
    polygons: Vec<Vec<[i64; 2]>>,
}

fn build(json: &str) -> PrinterGeometry {
    let data: ProfileData =
        serde_json::from_str(json).expect("embedded printer profile is valid JSON");
    let mut geometry = PrinterGeometry {
        plate: Polygon::from_pairs(&[
            (0, 0),
            (data.plate.x_size, 0),
            (data.plate.x_size, data.plate.y_size),
            (0, data.plate.y_size),
        ]),
        convex_heights: data.convex_heights.into_iter().collect(),
        box_heights: data.box_heights.into_iter().collect(),
        extruder_slices: Default::default(),
    };
    for slice in data.slices {
        let polygons = slice
            .polygons
            .into_iter()
            .map(|ring| Polygon::new(ring.iter().map(|&[x, y]| Point::new(x, y)).collect()))
            .collect();
        geometry.extruder_slices.insert(slice.height, polygons);
    }
    geometry
        .validate()
        .expect("embedded printer profile is structurally valid");
    geometry
}

/// Original Prusa MK3S geometry (approximate).
pub fn mk3s() -> &'static PrinterGeometry {
    static GEOMETRY: OnceLock<PrinterGeometry> = OnceLock::new();
    GEOMETRY.get_or_init(|| build(include_str!("../profiles/mk3s.json")))
}

/// Prusa MK4 geometry (approximate).
pub fn mk4() -> &'static PrinterGeometry {
    static GEOMETRY: OnceLock<PrinterGeometry> = OnceLock::new();
    GEOMETRY.get_or_init(|| build(include_str!("../profiles/mk4.json")))
}

/// Prusa XL geometry (approximate).
pub fn xl() -> &'static PrinterGeometry {
    static GEOMETRY: OnceLock<PrinterGeometry> = OnceLock::new();
    GEOMETRY.get_or_init(|| build(include_str!("../profiles/xl.json")))
}
