//! Defaults underneath every configuration layer.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Builder seeded with the directory defaults.
///
/// Later sources override earlier ones key by key; tables merge, lists replace.
/// Everything not seeded here falls back to the serde defaults on [`super::super::OracConfig`].
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("paths.input_dir", ".")?
        .set_default("paths.output_dir", ".")?
        .set_default("paths.recipe_root", "recipes")?
        .set_default("instrument.name", "GENERIC")
}
