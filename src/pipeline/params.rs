//! Run parameters supplied on the command line.

use crate::arrival::{Cursor, LoopKind};
use crate::error::PipelineError;
use crate::frame::UtDate;

/// What to process and how.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    /// First observation number (defaults to 1)
    pub from: Option<u32>,
    /// Last observation number, inclusive
    pub to: Option<u32>,
    /// Explicit observation numbers; excludes `from`/`to`
    pub list: Option<Vec<u32>>,
    /// Arrival strategy; inferred from the other options when absent
    pub loop_kind: Option<LoopKind>,
    pub skip: bool,
    pub batch: bool,
    /// Pinned calibrations as `(role, value)`
    pub calib: Vec<(String, String)>,
    /// Defaults to today's UT date
    pub utdate: Option<UtDate>,
    /// Recipe forced on every frame
    pub recipe: Option<String>,
}

impl RunParams {
    /// Explicit loop, else `list` when the work is bounded, else `wait`.
    pub fn loop_kind(&self) -> LoopKind {
        match self.loop_kind {
            Some(kind) => kind,
            None if self.list.is_some() || self.to.is_some() => LoopKind::List,
            None => LoopKind::Wait,
        }
    }

    pub fn cursor(&self) -> Result<Cursor, PipelineError> {
        match &self.list {
            Some(_) if self.from.is_some() || self.to.is_some() => Err(PipelineError::ConfigError(
                "--list cannot be combined with --from/--to".to_string(),
            )),
            Some(list) if list.is_empty() => Err(PipelineError::ConfigError(
                "observation list is empty".to_string(),
            )),
            Some(list) => Ok(Cursor::list(list.iter().copied())),
            None => {
                let from = self.from.unwrap_or(1);
                if let Some(to) = self.to {
                    if to < from {
                        return Err(PipelineError::ConfigError(format!(
                            "--to {} is before --from {}",
                            to, from
                        )));
                    }
                }
                Ok(Cursor::from(from, self.to))
            }
        }
    }

    pub fn utdate(&self) -> UtDate {
        self.utdate.unwrap_or_else(UtDate::today)
    }
}

/// Parse a `role=value` calibration override.
pub fn parse_calib(text: &str) -> Result<(String, String), String> {
    let (role, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected ROLE=VALUE, got '{}'", text))?;
    let (role, value) = (role.trim(), value.trim());
    if role.is_empty() || value.is_empty() {
        return Err(format!("expected ROLE=VALUE, got '{}'", text));
    }
    Ok((role.to_string(), value.to_string()))
}
