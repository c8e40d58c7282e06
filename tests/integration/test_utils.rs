//! Shared test utilities for integration tests
//!
//! A throwaway reduction workspace (raw data, recipe tree, output and
//! calibration directories) and an in-process algorithm engine stub.

use orac::config::OracConfig;
use orac::engine::{AlgorithmEngine, EngineLauncher};
use orac::error::EngineError;
use orac::frame::UtDate;
use orac::header::{render_cards, HeaderValue};
use orac::status::EngineStatus;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Global mutex serializing tests that touch ORAC_* environment variables.
pub static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

pub fn utdate() -> UtDate {
    UtDate::from_ymd(2024, 1, 5).unwrap()
}

/// Temporary workspace laid out the way the default configuration expects.
pub struct Workspace {
    _temp: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        for dir in [
            "raw",
            "out",
            "cal",
            "orac/recipes/generic",
            "orac/primitives/generic",
            "orac/calib/generic",
        ] {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        Self { _temp: temp, root }
    }

    pub fn config(&self) -> OracConfig {
        let mut config = OracConfig::default();
        config.paths.input_dir = self.root.join("raw");
        config.paths.output_dir = self.root.join("out");
        config.paths.calibration_dir = Some(self.root.join("cal"));
        config.paths.recipe_root = self.root.join("orac");
        config.instrument.prefix = "f".into();
        config.arrival.poll_interval_ms = 20;
        config.arrival.timeout_secs = 2;
        config
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn recipe(&self, name: &str, body: &str) -> &Self {
        fs::write(self.root.join("orac/recipes/generic").join(name), body).unwrap();
        self
    }

    pub fn primitive(&self, name: &str, body: &str) -> &Self {
        fs::write(self.root.join("orac/primitives/generic").join(name), body).unwrap();
        self
    }

    pub fn rules(&self, role: &str, body: &str) -> &Self {
        fs::write(self.root.join("orac/calib/generic").join(format!("rules.{}", role)), body).unwrap();
        self
    }

    /// Write raw observation `obsnum` with the given header cards.
    pub fn raw(&self, obsnum: u32, cards: &[(&str, HeaderValue)]) -> PathBuf {
        let path = self
            .root
            .join("raw")
            .join(format!("f{}_{:05}.fits", utdate(), obsnum));
        fs::write(&path, render_cards(cards)).unwrap();
        path
    }
}

pub fn raw_path(dir: &Path, obsnum: u32) -> PathBuf {
    dir.join(format!("f{}_{:05}.fits", utdate(), obsnum))
}

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub engine: String,
    pub operation: String,
    pub args: String,
}

#[derive(Default)]
struct StubState {
    calls: Vec<Call>,
    failing_ops: HashMap<String, i32>,
    failing_args: Vec<(String, i32)>,
    unreachable: Vec<String>,
    starts: usize,
}

/// In-process engines that record every call and answer with configured statuses.
#[derive(Clone, Default)]
pub struct StubEngines {
    state: Arc<Mutex<StubState>>,
}

impl StubEngines {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call to `operation` returns `code`.
    pub fn fail_operation(&self, operation: &str, code: i32) -> &Self {
        self.state.lock().failing_ops.insert(operation.to_string(), code);
        self
    }

    /// Calls whose argument string contains `needle` return `code`.
    pub fn fail_args_containing(&self, needle: &str, code: i32) -> &Self {
        self.state.lock().failing_args.push((needle.to_string(), code));
        self
    }

    /// Starting `engine` fails.
    pub fn unreachable(&self, engine: &str) -> &Self {
        self.state.lock().unreachable.push(engine.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn starts(&self) -> usize {
        self.state.lock().starts
    }

    pub fn launcher(&self) -> Arc<dyn EngineLauncher> {
        Arc::new(self.clone())
    }
}

impl EngineLauncher for StubEngines {
    fn start(&self, name: &str) -> Result<Box<dyn AlgorithmEngine>, EngineError> {
        let mut state = self.state.lock();
        if state.unreachable.iter().any(|e| e == name) {
            return Err(EngineError::StartFailed {
                engine: name.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        state.starts += 1;
        Ok(Box::new(StubEngine {
            name: name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct StubEngine {
    name: String,
    state: Arc<Mutex<StubState>>,
}

impl AlgorithmEngine for StubEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&mut self, operation: &str, args: &str) -> Result<EngineStatus, EngineError> {
        let mut state = self.state.lock();
        state.calls.push(Call {
            engine: self.name.clone(),
            operation: operation.to_string(),
            args: args.to_string(),
        });
        if let Some(&code) = state.failing_ops.get(operation) {
            return Ok(EngineStatus(code));
        }
        if let Some((_, code)) = state.failing_args.iter().find(|(n, _)| args.contains(n.as_str())) {
            return Ok(EngineStatus(*code));
        }
        Ok(EngineStatus::OK)
    }
}
