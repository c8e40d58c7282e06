//! Deciding when a raw file is ready to be read.

use super::DataSource;
use crate::error::LoopError;
use crate::frame::UtDate;
use std::fs;
use std::io::ErrorKind;

pub trait PresenceDetector: Send {
    /// True once the observation is complete on disk. Called once per poll.
    fn is_ready(&mut self, source: &DataSource, utdate: UtDate, obsnum: u32) -> Result<bool, LoopError>;
}

/// Ready when the raw file has the same nonzero size on two consecutive polls.
#[derive(Debug, Default)]
pub struct StableSize {
    last: Option<(u32, u64)>,
}

impl PresenceDetector for StableSize {
    fn is_ready(&mut self, source: &DataSource, utdate: UtDate, obsnum: u32) -> Result<bool, LoopError> {
        let path = source.raw_path(utdate, obsnum);
        let size = match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => 0,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.last = None;
                return Ok(false);
            }
            Err(source) => return Err(LoopError::Io { path, source }),
        };
        let ready = size > 0 && self.last == Some((obsnum, size));
        self.last = if ready { None } else { Some((obsnum, size)) };
        Ok(ready)
    }
}

/// Ready when the flag file exists; the raw file must exist too.
#[derive(Debug, Default, Clone, Copy)]
pub struct FlagFile;

impl PresenceDetector for FlagFile {
    fn is_ready(&mut self, source: &DataSource, utdate: UtDate, obsnum: u32) -> Result<bool, LoopError> {
        Ok(source.flag_path(utdate, obsnum).exists() && source.raw_path(utdate, obsnum).is_file())
    }
}
