//! Run statistics and the end-of-run summary.

use crate::report::ErrorReport;
use crate::status::Status;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome counts for every frame a recipe ran on.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub ok: usize,
    pub terminated: usize,
    pub bad_engine: usize,
    pub error: usize,
}

impl RunStats {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Ok => self.ok += 1,
            Status::Terminated => self.terminated += 1,
            Status::BadEngine => self.bad_engine += 1,
            Status::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.ok + self.terminated + self.bad_engine + self.error
    }

    pub fn has_failures(&self) -> bool {
        self.bad_engine + self.error > 0
    }

    /// 0 when every frame finished OK or was terminated, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }
}

/// Why the frame loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    /// No more work was defined
    Completed,
    /// An expected observation was not on disk
    EndOfData { obsnum: u32 },
    /// Waiting for an observation timed out
    Timeout { obsnum: Option<u32>, message: String },
    UserAbort,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub key: String,
    pub file: PathBuf,
    pub members: Vec<u32>,
    pub all_members: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub loop_kind: String,
    pub batch: bool,
    pub stats: RunStats,
    pub stopped: StopReason,
    pub groups: Vec<GroupSummary>,
    pub errors: Vec<ErrorReport>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        self.stats.exit_code()
    }
}
