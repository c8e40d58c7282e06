//! Display sink.
//!
//! Recipes ask for intermediate products to be displayed. Interactive viewers are
//! external; the pipeline only forwards the request.

use std::path::{Path, PathBuf};
use tracing::info;

pub trait DisplaySink: Send {
    /// Show `file`, produced for observation `obsnum`.
    fn display(&mut self, obsnum: u32, file: &Path);
}

/// Drops every request.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn display(&mut self, _obsnum: u32, _file: &Path) {}
}

/// Logs requests and keeps them for inspection.
#[derive(Debug, Default)]
pub struct LogDisplay {
    requests: Vec<(u32, PathBuf)>,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> &[(u32, PathBuf)] {
        &self.requests
    }
}

impl DisplaySink for LogDisplay {
    fn display(&mut self, obsnum: u32, file: &Path) {
        info!(obsnum, file = %file.display(), "Display requested");
        self.requests.push((obsnum, file.to_path_buf()));
    }
}
