//! Configuration System
//!
//! Layered pipeline configuration: built-in defaults, the user's global file,
//! the workspace files, then the environment inputs the reduction system has
//! always been driven by (`ORAC_DATA_IN`, `ORAC_DATA_OUT`, ...).

use crate::error::PipelineError;
use crate::logging::LoggingConfig;
use crate::recipe::SearchPath;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracConfig {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub instrument: InstrumentConfig,

    #[serde(default)]
    pub arrival: ArrivalConfig,

    /// Algorithm engines by name
    #[serde(default)]
    pub engines: HashMap<String, EngineConfig>,

    #[serde(default)]
    pub pipeline: PipelineSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Directories the pipeline reads from and writes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Raw data directory (ORAC_DATA_IN)
    #[serde(default = "default_dir")]
    pub input_dir: PathBuf,

    /// Reduced data directory (ORAC_DATA_OUT)
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,

    /// Calibration index directory (ORAC_DATA_CAL); defaults to the output directory
    #[serde(default)]
    pub calibration_dir: Option<PathBuf>,

    /// Calibration rules directory; defaults to `<recipe_root>/calib/<instrument>`
    #[serde(default)]
    pub rules_dir: Option<PathBuf>,

    /// Root of the built-in recipe tree
    #[serde(default = "default_recipe_root")]
    pub recipe_root: PathBuf,

    /// Recipe override directories, searched first (ORAC_RECIPE_DIR)
    #[serde(default)]
    pub recipe_dirs: Vec<PathBuf>,

    /// Primitive override directories, searched first (ORAC_PRIMITIVE_DIR)
    #[serde(default)]
    pub primitive_dirs: Vec<PathBuf>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_recipe_root() -> PathBuf {
    PathBuf::from("recipes")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: default_dir(),
            output_dir: default_dir(),
            calibration_dir: None,
            rules_dir: None,
            recipe_root: default_recipe_root(),
            recipe_dirs: Vec::new(),
            primitive_dirs: Vec::new(),
        }
    }
}

impl PathsConfig {
    pub fn calibration_dir(&self) -> PathBuf {
        self.calibration_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.clone())
    }

    pub fn rules_dir(&self, instrument: &str) -> PathBuf {
        self.rules_dir.clone().unwrap_or_else(|| {
            self.recipe_root
                .join("calib")
                .join(instrument.to_lowercase())
        })
    }

    pub fn recipe_search(&self, instrument: &str) -> SearchPath {
        SearchPath::new(
            self.recipe_dirs.clone(),
            vec![self.recipe_root.join("recipes").join(instrument.to_lowercase())],
        )
    }

    pub fn primitive_search(&self, instrument: &str) -> SearchPath {
        SearchPath::new(
            self.primitive_dirs.clone(),
            vec![self.recipe_root.join("primitives").join(instrument.to_lowercase())],
        )
    }

    /// Resolve relative directories against the workspace root.
    pub fn resolve_against(&self, root: &Path) -> PathsConfig {
        let resolve = |p: &PathBuf| if p.is_absolute() { p.clone() } else { root.join(p) };
        PathsConfig {
            input_dir: resolve(&self.input_dir),
            output_dir: resolve(&self.output_dir),
            calibration_dir: self.calibration_dir.as_ref().map(resolve),
            rules_dir: self.rules_dir.as_ref().map(resolve),
            recipe_root: resolve(&self.recipe_root),
            recipe_dirs: self.recipe_dirs.iter().map(resolve).collect(),
            primitive_dirs: self.primitive_dirs.iter().map(resolve).collect(),
        }
    }
}

/// Instrument description used to build an [`crate::instrument::Instrument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Instrument identifier (ORAC_INSTRUMENT)
    #[serde(default = "default_instrument")]
    pub name: String,

    /// Raw filename prefix
    #[serde(default)]
    pub prefix: String,

    /// Zero-padded width of the observation number in raw filenames
    #[serde(default = "default_digits")]
    pub digits: usize,

    /// Raw filename extension, including the dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Flag file suffix
    #[serde(default = "default_flag_suffix")]
    pub flag_suffix: String,

    /// Header fields that define a group
    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,

    /// Header naming the recipe for a frame
    #[serde(default = "default_recipe_header")]
    pub recipe_header: String,

    /// Recipe used when the header names none
    #[serde(default = "default_recipe")]
    pub default_recipe: String,

    /// Calibration roles available to recipes
    #[serde(default = "default_calibration_roles")]
    pub calibration_roles: Vec<String>,
}

fn default_instrument() -> String {
    "GENERIC".to_string()
}

fn default_digits() -> usize {
    5
}

fn default_extension() -> String {
    ".fits".to_string()
}

fn default_flag_suffix() -> String {
    ".ok".to_string()
}

fn default_group_by() -> Vec<String> {
    vec!["GRPNUM".to_string()]
}

fn default_recipe_header() -> String {
    "RECIPE".to_string()
}

fn default_recipe() -> String {
    "QUICK_LOOK".to_string()
}

fn default_calibration_roles() -> Vec<String> {
    ["bias", "dark", "flat", "sky", "standard", "readnoise"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            name: default_instrument(),
            prefix: String::new(),
            digits: default_digits(),
            extension: default_extension(),
            flag_suffix: default_flag_suffix(),
            group_by: default_group_by(),
            recipe_header: default_recipe_header(),
            default_recipe: default_recipe(),
            calibration_roles: default_calibration_roles(),
        }
    }
}

/// Polling behaviour of the wait and flag loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrivalConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Slices each poll sleep is cut into so abort requests are seen promptly
    #[serde(default = "default_poll_subdivisions")]
    pub poll_subdivisions: u32,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_timeout_secs() -> u64 {
    2 * 60 * 60
}

fn default_poll_subdivisions() -> u32 {
    4
}

impl Default for ArrivalConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_timeout_secs(),
            poll_subdivisions: default_poll_subdivisions(),
        }
    }
}

impl ArrivalConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// External algorithm engine launched as a program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub program: PathBuf,

    /// Arguments placed before the operation name
    #[serde(default)]
    pub args: Vec<String>,

    /// Start before the first frame is processed
    #[serde(default)]
    pub prestart: bool,
}

/// Orchestrator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Reuse compiled recipes across frames
    #[serde(default = "default_true")]
    pub cache_recipes: bool,

    /// Bad-observation rule file
    #[serde(default)]
    pub badobs_file: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            cache_recipes: true,
            badobs_file: None,
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub enum ValidationError {
    Paths(String),
    Instrument(String),
    Arrival(String),
    Engine(String, String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Paths(msg) => write!(f, "Paths: {}", msg),
            ValidationError::Instrument(msg) => write!(f, "Instrument: {}", msg),
            ValidationError::Arrival(msg) => write!(f, "Arrival: {}", msg),
            ValidationError::Engine(name, msg) => write!(f, "Engine '{}': {}", name, msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl OracConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.paths.input_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Paths("input_dir cannot be empty".to_string()));
        }
        if self.paths.output_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Paths("output_dir cannot be empty".to_string()));
        }

        if self.instrument.name.trim().is_empty() {
            errors.push(ValidationError::Instrument("name cannot be empty".to_string()));
        }
        if self.instrument.digits == 0 || self.instrument.digits > 9 {
            errors.push(ValidationError::Instrument(format!(
                "digits must be between 1 and 9, got {}",
                self.instrument.digits
            )));
        }
        if self.instrument.default_recipe.trim().is_empty() {
            errors.push(ValidationError::Instrument(
                "default_recipe cannot be empty".to_string(),
            ));
        }

        if self.arrival.poll_interval_ms == 0 {
            errors.push(ValidationError::Arrival(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        if self.arrival.poll_subdivisions == 0 {
            errors.push(ValidationError::Arrival(
                "poll_subdivisions must be at least 1".to_string(),
            ));
        }

        for (name, engine) in &self.engines {
            if engine.program.as_os_str().is_empty() {
                errors.push(ValidationError::Engine(
                    name.clone(),
                    "program cannot be empty".to_string(),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold every problem into one error.
    pub fn ensure_valid(&self) -> Result<(), PipelineError> {
        self.validate().map_err(|errors| {
            let msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            PipelineError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                msgs.join("\n")
            ))
        })
    }
}
