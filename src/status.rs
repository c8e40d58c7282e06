//! Recipe outcome statuses.
//!
//! A `Status` is what one recipe execution hands back to the orchestrator.
//! Conditions that unwind the whole run (fatal environment errors, operator
//! aborts) are not statuses; they travel as [`crate::error::Interrupt`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single recipe execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// All steps completed.
    Ok,
    /// Recoverable per-frame failure; the run continues with the next frame.
    Error,
    /// The recipe ended itself early on purpose.
    Terminated,
    /// An algorithm engine could not be contacted or died mid-call.
    BadEngine,
}

impl Status {
    pub fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// True for outcomes that count against the run's exit status.
    pub fn is_failure(self) -> bool {
        matches!(self, Status::Error | Status::BadEngine)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::Error => "ERROR",
            Status::Terminated => "TERMINATED",
            Status::BadEngine => "BAD_ENGINE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw status code returned by an algorithm engine. Zero is the canonical OK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EngineStatus(pub i32);

impl EngineStatus {
    pub const OK: EngineStatus = EngineStatus(0);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
