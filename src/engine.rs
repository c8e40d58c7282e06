//! Algorithm Engines
//!
//! Numerical work happens in external engines. The pipeline only needs two
//! operations: start an engine by name, and invoke an operation on it with an
//! argument string, getting a status code back. Transports implement
//! [`EngineLauncher`] and [`AlgorithmEngine`]; [`CommandLauncher`] runs each
//! invocation as a child process.

pub mod command;

pub use command::{CommandEngine, CommandLauncher};

use crate::error::EngineError;
use crate::status::EngineStatus;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A started engine. Calls are synchronous; one at a time.
pub trait AlgorithmEngine: Send {
    fn name(&self) -> &str;

    fn invoke(&mut self, operation: &str, args: &str) -> Result<EngineStatus, EngineError>;

    /// Shut the engine down. Called once by [`EngineSet::close_all`].
    fn close(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

/// Starts engines by name.
pub trait EngineLauncher: Send + Sync {
    fn start(&self, name: &str) -> Result<Box<dyn AlgorithmEngine>, EngineError>;
}

/// Engines started so far in this run, keyed by name.
pub struct EngineSet {
    launcher: Arc<dyn EngineLauncher>,
    running: BTreeMap<String, Box<dyn AlgorithmEngine>>,
}

impl EngineSet {
    pub fn new(launcher: Arc<dyn EngineLauncher>) -> Self {
        Self {
            launcher,
            running: BTreeMap::new(),
        }
    }

    /// Start `name` unless it is already running.
    pub fn start(&mut self, name: &str) -> Result<(), EngineError> {
        if !self.running.contains_key(name) {
            info!(engine = name, "Starting algorithm engine");
            let engine = self.launcher.start(name)?;
            self.running.insert(name.to_string(), engine);
        }
        Ok(())
    }

    /// Start every engine in `names` before processing begins.
    pub fn prestart<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Result<(), EngineError> {
        for name in names {
            self.start(name)?;
        }
        Ok(())
    }

    /// Invoke `operation` on `engine`, starting it on first use.
    pub fn invoke(
        &mut self,
        engine: &str,
        operation: &str,
        args: &str,
    ) -> Result<EngineStatus, EngineError> {
        self.start(engine)?;
        let handle = self
            .running
            .get_mut(engine)
            .ok_or_else(|| EngineError::NotConfigured(engine.to_string()))?;
        debug!(engine, operation, args, "Engine call");
        let status = handle.invoke(operation, args)?;
        debug!(engine, operation, status = status.0, "Engine replied");
        Ok(status)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains_key(name)
    }

    pub fn running(&self) -> impl Iterator<Item = &str> {
        self.running.keys().map(String::as_str)
    }

    /// Close every running engine. Failures are logged, not returned.
    pub fn close_all(&mut self) {
        for (name, mut engine) in std::mem::take(&mut self.running) {
            match engine.close() {
                Ok(()) => info!(engine = %name, "Closed algorithm engine"),
                Err(e) => warn!(engine = %name, error = %e, "Failed to close algorithm engine"),
            }
        }
    }
}

impl Drop for EngineSet {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl std::fmt::Debug for EngineSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSet")
            .field("running", &self.running.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
