#![warn(missing_docs)]

//! SMT placement and ordering constraints for the seqprint arrangement
//! solver.
//!
//! The scheduler needs to answer one kind of question: given a set of
//! already-placed objects and a group of undecided ones, is there an
//! `(x, y, t)` assignment per undecided object so that every footprint is
//! on the plate, no two footprints overlap, and each object placed later
//! in time stays out of every earlier object's unreachable zone? This
//! crate encodes that question over real-valued decision variables and
//! discharges it to Z3.
//!
//! Overlap is encoded in two strengths. The *weak* form only requires
//! every vertex of each polygon to lie outside the other polygon, which
//! is cheap but admits edge-through-edge configurations. The *strong*
//! form additionally forbids edge pairs from crossing and is added
//! lazily, for exactly the pairs a candidate model actually violates.
//!
//! All model values are extracted as exact rationals; nothing in the
//! placement pipeline goes through floating point.

pub mod constraints;
pub mod error;
pub mod session;

pub use error::{Result, SolverError};
pub use session::{solver_context, CheckOutcome, Frame, Session};
