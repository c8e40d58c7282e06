//! Data-Arrival Loop
//!
//! Strategies that produce the next frame to process. All share
//! [`ArrivalStrategy::next`]: `Ok(Some(frame))` is work, `Ok(None)` means no more
//! work is defined (the list ran out or the cursor passed its end), and errors
//! are reserved for timeouts, missing files and I/O failures.

pub mod infinite;
pub mod list;
pub mod presence;
pub mod wait;

pub use infinite::InfiniteLoop;
pub use list::ListLoop;
pub use presence::{FlagFile, PresenceDetector, StableSize};
pub use wait::WaitLoop;

use crate::abort::AbortFlag;
use crate::config::ArrivalConfig;
use crate::error::LoopError;
use crate::frame::{Frame, UtDate};
use crate::instrument::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Which observation to look for next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    /// Explicit observation numbers, consumed front to back
    List(VecDeque<u32>),
    /// Counting upwards from `next`, optionally stopping after `end`
    Next { next: u32, end: Option<u32> },
}

impl Cursor {
    pub fn list(obsnums: impl IntoIterator<Item = u32>) -> Self {
        Cursor::List(obsnums.into_iter().collect())
    }

    pub fn from(start: u32, end: Option<u32>) -> Self {
        Cursor::Next { next: start, end }
    }

    /// Observation the cursor points at, or `None` when no work is left.
    pub fn current(&self) -> Option<u32> {
        match self {
            Cursor::List(queue) => queue.front().copied(),
            Cursor::Next { next, end } => match end {
                Some(end) if next > end => None,
                _ => Some(*next),
            },
        }
    }

    pub fn advance(&mut self) {
        match self {
            Cursor::List(queue) => {
                queue.pop_front();
            }
            Cursor::Next { next, .. } => *next = next.saturating_add(1),
        }
    }

    /// Move forward to `obsnum`, dropping anything before it.
    pub fn jump_to(&mut self, obsnum: u32) {
        match self {
            Cursor::List(queue) => queue.retain(|&n| n >= obsnum),
            Cursor::Next { next, .. } => *next = (*next).max(obsnum),
        }
    }
}

/// Where raw files come from, and how to turn one into a configured frame.
#[derive(Debug, Clone)]
pub struct DataSource {
    pub input_dir: PathBuf,
    pub instrument: Instrument,
    /// Recipe used for every frame instead of the one named in its header
    pub forced_recipe: Option<String>,
}

impl DataSource {
    pub fn new(input_dir: impl Into<PathBuf>, instrument: Instrument) -> Self {
        Self {
            input_dir: input_dir.into(),
            instrument,
            forced_recipe: None,
        }
    }

    pub fn with_forced_recipe(mut self, recipe: Option<String>) -> Self {
        self.forced_recipe = recipe;
        self
    }

    pub fn raw_path(&self, utdate: UtDate, obsnum: u32) -> PathBuf {
        self.input_dir
            .join(self.instrument.naming.raw_filename(utdate, obsnum))
    }

    pub fn flag_path(&self, utdate: UtDate, obsnum: u32) -> PathBuf {
        self.input_dir
            .join(self.instrument.naming.flag_filename(utdate, obsnum))
    }

    /// Create and configure the frame for an observation that is present.
    pub fn frame(&self, utdate: UtDate, obsnum: u32) -> Result<Frame, LoopError> {
        let mut frame = Frame::new(self.raw_path(utdate, obsnum), utdate, obsnum);
        frame.configure(&self.instrument, self.forced_recipe.as_deref())?;
        Ok(frame)
    }

    /// Lowest observation number above `after` with a raw file in the input directory.
    pub fn next_available(&self, utdate: UtDate, after: u32) -> Result<Option<u32>, LoopError> {
        let mut best: Option<u32> = None;
        for entry in WalkDir::new(&self.input_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| walk_error(&self.input_dir, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(n) = self.instrument.naming.parse_obsnum(utdate, &name) {
                if n > after && best.map_or(true, |b| n < b) {
                    best = Some(n);
                }
            }
        }
        Ok(best)
    }

    pub(crate) fn missing(&self, utdate: UtDate, obsnum: u32) -> LoopError {
        LoopError::Missing {
            obsnum,
            path: self.raw_path(utdate, obsnum),
        }
    }
}

fn walk_error(dir: &Path, err: walkdir::Error) -> LoopError {
    let message = err.to_string();
    LoopError::Io {
        path: dir.to_path_buf(),
        source: err
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, message)),
    }
}

pub trait ArrivalStrategy {
    fn name(&self) -> &'static str;

    fn next(
        &mut self,
        source: &DataSource,
        utdate: UtDate,
        cursor: &mut Cursor,
        skip: bool,
    ) -> Result<Option<Frame>, LoopError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LoopKind {
    /// Fixed list (or range) of observation numbers
    List,
    /// Count upwards until a file is missing
    Inf,
    /// Poll until each file appears and stops growing
    Wait,
    /// Poll until each file's flag file appears
    Flag,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoopKind::List => "list",
            LoopKind::Inf => "inf",
            LoopKind::Wait => "wait",
            LoopKind::Flag => "flag",
        })
    }
}

/// Build the strategy for `kind`.
pub fn strategy(kind: LoopKind, config: &ArrivalConfig, abort: AbortFlag) -> Box<dyn ArrivalStrategy> {
    match kind {
        LoopKind::List => Box::new(ListLoop),
        LoopKind::Inf => Box::new(InfiniteLoop),
        LoopKind::Wait => Box::new(WaitLoop::new(config, abort, Box::new(StableSize::default()))),
        LoopKind::Flag => Box::new(WaitLoop::new(config, abort, Box::new(FlagFile)).named("flag")),
    }
}
