//! Environment inputs: the ORAC_* variables that locate data, recipes and the instrument.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;

const DATA_IN: &str = "ORAC_DATA_IN";
const DATA_OUT: &str = "ORAC_DATA_OUT";
const DATA_CAL: &str = "ORAC_DATA_CAL";
const RECIPE_DIR: &str = "ORAC_RECIPE_DIR";
const PRIMITIVE_DIR: &str = "ORAC_PRIMITIVE_DIR";
const INSTRUMENT: &str = "ORAC_INSTRUMENT";

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a `:`-separated directory list.
pub fn split_dir_list(value: &str) -> Vec<String> {
    value
        .split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Apply environment overrides. These win over every file source.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let mut builder = builder
        .set_override_option("paths.input_dir", non_empty(DATA_IN))?
        .set_override_option("paths.output_dir", non_empty(DATA_OUT))?
        .set_override_option("paths.calibration_dir", non_empty(DATA_CAL))?
        .set_override_option("instrument.name", non_empty(INSTRUMENT))?;

    if let Some(dirs) = non_empty(RECIPE_DIR) {
        builder = builder.set_override("paths.recipe_dirs", split_dir_list(&dirs))?;
    }
    if let Some(dirs) = non_empty(PRIMITIVE_DIR) {
        builder = builder.set_override("paths.primitive_dirs", split_dir_list(&dirs))?;
    }
    Ok(builder)
}
