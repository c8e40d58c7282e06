//! Config loader facade: assembles sources in precedence order and deserializes.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::OracConfig;
use config::{Config, File};
use std::path::{Path, PathBuf};

/// Loads [`OracConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files,
    /// environment inputs.
    pub fn load(workspace_root: &Path) -> Result<OracConfig, config::ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }

    /// Load configuration from one explicit file. Environment inputs still apply.
    pub fn load_from_file(path: &Path) -> Result<OracConfig, config::ConfigError> {
        let builder = merge_policy::builder_with_defaults()?
            .add_source(File::from(path.to_path_buf()).required(true));
        let builder = environment::add_to_builder(builder)?;
        builder.build()?.try_deserialize()
    }

    /// Global config file location, if HOME or XDG_CONFIG_HOME is set.
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }

    /// Defaults only; no files, no environment.
    pub fn defaults() -> Result<OracConfig, config::ConfigError> {
        Config::builder().build()?.try_deserialize()
    }
}
