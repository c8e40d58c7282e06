//! Pipeline Orchestrator
//!
//! [`Pipeline::run`] ties the arrival loop, groups, calibration, recipe compiler
//! and executor together for one run and returns a [`RunSummary`].

mod orchestrator;
mod params;
mod stats;

pub use orchestrator::Pipeline;
pub use params::{parse_calib, RunParams};
pub use stats::{GroupSummary, RunStats, RunSummary, StopReason};
