//! orac: Recipe-Driven Data Reduction
//!
//! Observations arrive as raw files, are grouped, and have named recipes run on
//! them. Recipes expand into primitive steps that call external algorithm
//! engines, with calibrations chosen from time-ordered indexes.

pub mod abort;
pub mod arrival;
pub mod calibration;
pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod error;
pub mod frame;
pub mod group;
pub mod header;
pub mod instrument;
pub mod logging;
pub mod pipeline;
pub mod recipe;
pub mod report;
pub mod status;
