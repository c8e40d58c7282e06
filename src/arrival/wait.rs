//! Poll for each observation until it is ready or the timeout expires.

use super::{ArrivalStrategy, Cursor, DataSource, PresenceDetector};
use crate::abort::AbortFlag;
use crate::config::ArrivalConfig;
use crate::error::LoopError;
use crate::frame::{Frame, UtDate};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct WaitLoop {
    name: &'static str,
    poll: Duration,
    timeout: Duration,
    subdivisions: u32,
    abort: AbortFlag,
    detector: Box<dyn PresenceDetector>,
}

impl WaitLoop {
    pub fn new(config: &ArrivalConfig, abort: AbortFlag, detector: Box<dyn PresenceDetector>) -> Self {
        Self {
            name: "wait",
            poll: config.poll_interval(),
            timeout: config.timeout(),
            subdivisions: config.poll_subdivisions.max(1),
            abort,
            detector,
        }
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_timing(mut self, poll: Duration, timeout: Duration) -> Self {
        self.poll = poll;
        self.timeout = timeout;
        self
    }

    /// Sleep for `total` in slices, returning early on abort.
    fn sleep(&self, total: Duration) -> Result<(), LoopError> {
        let slice = total / self.subdivisions;
        for _ in 0..self.subdivisions {
            if self.abort.is_raised() {
                return Err(LoopError::UserAbort);
            }
            std::thread::sleep(slice);
        }
        if self.abort.is_raised() {
            return Err(LoopError::UserAbort);
        }
        Ok(())
    }
}

impl std::fmt::Debug for WaitLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitLoop")
            .field("name", &self.name)
            .field("poll", &self.poll)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ArrivalStrategy for WaitLoop {
    fn name(&self) -> &'static str {
        self.name
    }

    /// Blocks until the observation is ready. With `skip`, a missing raw file is
    /// passed over when an observation with a higher number is already on disk.
    fn next(
        &mut self,
        source: &DataSource,
        utdate: UtDate,
        cursor: &mut Cursor,
        skip: bool,
    ) -> Result<Option<Frame>, LoopError> {
        let start = Instant::now();
        let mut announced = None;
        loop {
            let Some(obsnum) = cursor.current() else {
                return Ok(None);
            };
            if announced != Some(obsnum) {
                info!(obsnum, loop_kind = self.name, "Waiting for observation");
                announced = Some(obsnum);
            }

            if self.detector.is_ready(source, utdate, obsnum)? {
                cursor.advance();
                return source.frame(utdate, obsnum).map(Some);
            }

            // A present file that is still settling is polled again, never skipped.
            if skip && !source.raw_path(utdate, obsnum).is_file() {
                if let Some(later) = source.next_available(utdate, obsnum)? {
                    debug!(from = obsnum, to = later, "Skipping ahead");
                    cursor.jump_to(later);
                    continue;
                }
            }

            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(LoopError::Timeout {
                    path: source.raw_path(utdate, obsnum),
                    waited,
                });
            }
            self.sleep(self.poll.min(self.timeout - waited))?;
        }
    }
}
