//! Error types for the arrangement core.

use thiserror::Error;

use crate::types::ObjectId;

/// Errors surfaced by preprocessing, scheduling and the file formats.
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// An object's footprint cannot fit the plate, alone or at all.
    #[error("object {id}: footprint does not fit the plate")]
    ObjectTooLarge {
        /// Identifier of the offending object.
        id: ObjectId,
    },

    /// The solver gave up within its wall-clock budget on a
    /// minimum-viable query.
    #[error("solver timed out while placing object {id}")]
    SolverTimeout {
        /// Identifier of the object whose placement query timed out.
        id: ObjectId,
    },

    /// An object has a non-empty slice at a height the printer does not
    /// declare.
    #[error("object {id}: slice height {height} matches no printer height")]
    SliceHeightMismatch {
        /// Identifier of the offending object.
        id: ObjectId,
        /// The undeclared slice height.
        height: i64,
    },

    /// A declared height has no registered extruder slice.
    #[error("no extruder slice registered for height {height}")]
    MissingExtruderSlice {
        /// The height without silhouette polygons.
        height: i64,
    },

    /// An object has no polygon at nozzle height.
    #[error("object {id} has no printable footprint at nozzle height")]
    EmptyFootprint {
        /// Identifier of the offending object.
        id: ObjectId,
    },

    /// The printer geometry violates a structural invariant.
    #[error("invalid printer geometry: {0}")]
    InvalidGeometry(String),

    /// The solver configuration violates a structural invariant.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A failure inside the SMT layer.
    #[error(transparent)]
    Solver(#[from] seqprint_solver::SolverError),

    /// An I/O failure while reading or writing the text formats.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed line in one of the text formats.
    #[error("parse error at line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        message: String,
    },
}

/// Result type for arrangement operations.
pub type Result<T> = std::result::Result<T, ScheduleError>;
