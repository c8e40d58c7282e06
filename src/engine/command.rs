//! Process-per-call engine transport.

use super::{AlgorithmEngine, EngineLauncher};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::status::EngineStatus;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

/// Launches engines described in the `[engines]` configuration table.
#[derive(Debug, Clone, Default)]
pub struct CommandLauncher {
    engines: HashMap<String, EngineConfig>,
    workdir: Option<PathBuf>,
}

impl CommandLauncher {
    pub fn new(engines: HashMap<String, EngineConfig>) -> Self {
        Self {
            engines,
            workdir: None,
        }
    }

    /// Run engine processes from `dir` (normally the output directory).
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }
}

impl EngineLauncher for CommandLauncher {
    fn start(&self, name: &str) -> Result<Box<dyn AlgorithmEngine>, EngineError> {
        let config = self
            .engines
            .get(name)
            .ok_or_else(|| EngineError::NotConfigured(name.to_string()))?;
        if config.program.components().count() > 1 && !config.program.exists() {
            return Err(EngineError::StartFailed {
                engine: name.to_string(),
                reason: format!("{} does not exist", config.program.display()),
            });
        }
        Ok(Box::new(CommandEngine {
            name: name.to_string(),
            config: config.clone(),
            workdir: self.workdir.clone(),
        }))
    }
}

/// Runs `program [args...] operation argstring` for every invocation.
///
/// The exit code is the engine status. Failing to spawn, or a child killed by a
/// signal, is a transport failure.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    name: String,
    config: EngineConfig,
    workdir: Option<PathBuf>,
}

impl AlgorithmEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&mut self, operation: &str, args: &str) -> Result<EngineStatus, EngineError> {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).arg(operation).arg(args);
        if let Some(dir) = &self.workdir {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|e| EngineError::Transport {
            engine: self.name.clone(),
            operation: operation.to_string(),
            reason: format!("failed to run {}: {}", self.config.program.display(), e),
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(engine = %self.name, operation, stderr = %stderr.trim(), "Engine stderr");
        }
        match output.status.code() {
            Some(code) => Ok(EngineStatus(code)),
            None => Err(EngineError::Transport {
                engine: self.name.clone(),
                operation: operation.to_string(),
                reason: "terminated by signal".to_string(),
            }),
        }
    }
}
