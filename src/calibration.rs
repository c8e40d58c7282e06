//! Calibration
//!
//! Each role (dark, flat, sky, ...) has a rules file declaring which header fields
//! must agree between a frame and a candidate, an append-only index of candidates,
//! and a current binding. See [`Calibration::select`] for the selection order.

pub mod index;
pub mod rules;
pub mod selector;

pub use index::{CalibrationIndex, IndexEntry};
pub use rules::{CalibrationRules, FieldMatch, FieldRule};
pub use selector::{Binding, Calibration};
