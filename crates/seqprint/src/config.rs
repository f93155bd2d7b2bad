//! Scheduler configuration.

use seqprint_geometry::{BoundingBox, Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};
use crate::types::PrinterGeometry;
use crate::SLICER_SCALE_FACTOR;

/// How aggressively object footprints are simplified before solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecimationPrecision {
    /// No decimation; footprints go to the solver as-is.
    Undefined,
    /// Coarse decimation: fastest solving, loosest packing.
    Low,
    /// Fine decimation: slower solving, tighter packing.
    High,
}

impl DecimationPrecision {
    /// The Douglas–Peucker tolerance in slicer units, or `None` when
    /// decimation is disabled.
    pub fn tolerance(self) -> Option<f64> {
        match self {
            DecimationPrecision::Undefined => None,
            DecimationPrecision::Low => Some(600_000.0),
            DecimationPrecision::High => Some(150_000.0),
        }
    }
}

/// Knobs of the sub-global scheduler and its solver queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfiguration {
    /// Plate bounding box in solver units.
    #[serde(skip, default = "default_plate_bounding_box")]
    pub plate_bounding_box: BoundingBox,
    /// Plate outline in solver units when the plate is not an
    /// axis-aligned rectangle.
    #[serde(skip)]
    pub plate_bounding_polygon: Option<Polygon>,
    /// Shrink step of the bed-bounding-box search, in solver units.
    pub bounding_box_size_optimization_step: i64,
    /// Floor of the bed-bounding-box search, in solver units.
    pub minimum_bounding_box_size: i64,
    /// Iteration cap of the weak-to-strong refinement loop.
    pub max_refines: u32,
    /// How many undecided objects one solver query takes on.
    pub object_group_size: usize,
    /// Cap on objects (committed plus undecided) in a single query.
    pub fixed_object_grouping_limit: usize,
    /// Scale on the minimum temporal distance between objects.
    pub temporal_spread: i64,
    /// Footprint simplification level.
    pub decimation_precision: DecimationPrecision,
    /// Per-query wall-clock budget in milliseconds, as a decimal
    /// string handed to the solver unchanged.
    pub optimization_timeout: String,
}

fn default_plate_bounding_box() -> BoundingBox {
    // 250 × 210 mm plate at solver scale.
    BoundingBox::new(Point::new(0, 0), Point::new(2500, 2100))
}

impl Default for SolverConfiguration {
    fn default() -> Self {
        let mut config = Self {
            plate_bounding_box: default_plate_bounding_box(),
            plate_bounding_polygon: None,
            bounding_box_size_optimization_step: 0,
            minimum_bounding_box_size: 0,
            max_refines: 5,
            object_group_size: 4,
            fixed_object_grouping_limit: 16,
            temporal_spread: 1,
            decimation_precision: DecimationPrecision::Low,
            optimization_timeout: "10000".into(),
        };
        config.derive_bounding_box_search();
        config
    }
}

impl SolverConfiguration {
    /// Default configuration sized for the given printer.
    pub fn for_printer(geometry: &PrinterGeometry) -> Self {
        let mut config = Self::default();
        config.setup(geometry);
        config
    }

    /// Re-derive the plate bounds and the bed-bounding-box search
    /// parameters from a printer geometry.
    pub fn setup(&mut self, geometry: &PrinterGeometry) {
        let (bbox, polygon) = geometry.plate_bounds(SLICER_SCALE_FACTOR);
        self.plate_bounding_box = bbox;
        self.plate_bounding_polygon = polygon;
        self.derive_bounding_box_search();
    }

    fn derive_bounding_box_search(&mut self) {
        let min_dimension = self
            .plate_bounding_box
            .x_size()
            .min(self.plate_bounding_box.y_size());
        self.bounding_box_size_optimization_step = (min_dimension / 10).max(1);
        self.minimum_bounding_box_size = (min_dimension / 10).max(1);
    }

    /// Check the configuration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.plate_bounding_box.x_size() <= 0 || self.plate_bounding_box.y_size() <= 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "plate bounding box is empty".into(),
            ));
        }
        if self.bounding_box_size_optimization_step <= 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "bounding box optimization step must be positive".into(),
            ));
        }
        if self.minimum_bounding_box_size <= 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "minimum bounding box size must be positive".into(),
            ));
        }
        if self.object_group_size == 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "object group size must be at least 1".into(),
            ));
        }
        if self.fixed_object_grouping_limit < self.object_group_size {
            return Err(ScheduleError::InvalidConfiguration(
                "fixed object grouping limit must be at least the group size".into(),
            ));
        }
        if self.temporal_spread <= 0 {
            return Err(ScheduleError::InvalidConfiguration(
                "temporal spread must be positive".into(),
            ));
        }
        if !self.optimization_timeout.is_empty()
            && self.optimization_timeout.parse::<u64>().is_err()
        {
            return Err(ScheduleError::InvalidConfiguration(format!(
                "optimization timeout {:?} is not a decimal millisecond count",
                self.optimization_timeout
            )));
        }
        Ok(())
    }
}
