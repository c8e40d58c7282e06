//! Error types for the orac reduction pipeline.

use crate::recipe::SourceKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Location-tagged parse failure in one of the pipeline's text formats.
#[derive(Debug, Clone, Error)]
#[error("{}:{line}: {message}", path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub line: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line,
            message: message.into(),
        }
    }
}

/// Recipe compilation errors. All of them abort the run.
#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("{kind} not found: {name} (searched: {searched})")]
    NotFound {
        kind: SourceKind,
        name: String,
        searched: String,
    },

    #[error("Primitive cycle detected: {path}")]
    Cycle { path: String },

    #[error("Failed to read {kind} {path:?}: {source}")]
    Io {
        kind: SourceKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Frame construction errors.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to read raw file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed header: {0}")]
    Header(#[from] ParseError),
}

/// Calibration selection and index errors.
#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("No suitable {role} calibration: {reason}")]
    NoSuitable { role: String, reason: String },

    #[error("Unknown calibration role: {0}")]
    UnknownRole(String),

    #[error("Invalid calibration rules: {0}")]
    Rules(ParseError),

    #[error("Invalid calibration index: {0}")]
    Index(ParseError),

    #[error("Calibration I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Algorithm engine errors. Surfaced to the run as `BAD_ENGINE`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Engine not configured: {0}")]
    NotConfigured(String),

    #[error("Failed to start engine {engine}: {reason}")]
    StartFailed { engine: String, reason: String },

    #[error("Engine {engine} failed during {operation}: {reason}")]
    Transport {
        engine: String,
        operation: String,
        reason: String,
    },
}

/// Data-arrival loop errors. "No more work" is not an error; it is `Ok(None)`.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Timed out after {waited:?} waiting for {path:?}")]
    Timeout { path: PathBuf, waited: Duration },

    #[error("Observation {obsnum} not found at {path:?}")]
    Missing { obsnum: u32, path: PathBuf },

    #[error("Failed to scan data directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("Aborted by user while waiting for data")]
    UserAbort,
}

impl LoopError {
    /// A missing file is transient: the strategy reports it, higher-level code decides.
    pub fn is_transient(&self) -> bool {
        matches!(self, LoopError::Missing { .. })
    }
}

/// Conditions that unwind the whole run. Never converted into a [`crate::status::Status`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[must_use]
pub enum Interrupt {
    #[error("Fatal error: {0}")]
    Fatal(String),

    #[error("Aborted by user")]
    UserAbort,
}

/// Top-level pipeline errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Recipe error: {0}")]
    Recipe(#[from] RecipeError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Data loop error: {0}")]
    Loop(#[from] LoopError),

    #[error("Bad observation rules: {0}")]
    BadObs(ParseError),

    #[error(transparent)]
    Interrupted(#[from] Interrupt),

    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

impl PipelineError {
    /// True when the error ended the run at the operator's request.
    pub fn is_user_abort(&self) -> bool {
        matches!(self, PipelineError::Interrupted(Interrupt::UserAbort))
    }
}
