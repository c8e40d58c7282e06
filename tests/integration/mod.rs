//! Integration tests for the orac reduction pipeline

mod arrival_loops;
mod calibration_selection;
mod cli_commands;
mod config_integration;
mod executor_scenario;
mod group_membership;
mod recipe_compile;
pub mod test_utils;
