//! Process exactly the observations the cursor names.

use super::{ArrivalStrategy, Cursor, DataSource};
use crate::error::LoopError;
use crate::frame::{Frame, UtDate};
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy)]
pub struct ListLoop;

impl ArrivalStrategy for ListLoop {
    fn name(&self) -> &'static str {
        "list"
    }

    fn next(
        &mut self,
        source: &DataSource,
        utdate: UtDate,
        cursor: &mut Cursor,
        skip: bool,
    ) -> Result<Option<Frame>, LoopError> {
        while let Some(obsnum) = cursor.current() {
            cursor.advance();
            if source.raw_path(utdate, obsnum).is_file() {
                debug!(obsnum, "Observation present");
                return source.frame(utdate, obsnum).map(Some);
            }
            if skip {
                warn!(obsnum, "Observation missing, skipping");
                continue;
            }
            return Err(source.missing(utdate, obsnum));
        }
        Ok(None)
    }
}
