//! Workspace config files: config/config.toml, then config/{ORAC_ENV}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_ENV: &str = "development";

/// Name of the environment-specific overlay. Blank ORAC_ENV counts as unset.
fn env_name() -> String {
    std::env::var("ORAC_ENV")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENV.to_string())
}

/// Existing workspace config files, lowest precedence first.
pub fn workspace_config_files(workspace_root: &Path) -> Vec<PathBuf> {
    let config_dir = workspace_root.join("config");
    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", env_name())),
    ]
    .into_iter()
    .filter(|path| path.is_file())
    .collect()
}

pub fn add_to_builder(
    mut builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    for path in workspace_config_files(workspace_root) {
        debug!(config_path = %path.display(), "Workspace configuration layer");
        builder = builder.add_source(File::from(path).required(false));
    }
    Ok(builder)
}
