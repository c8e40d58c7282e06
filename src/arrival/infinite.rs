//! Count upwards from the cursor, never waiting.

use super::{ArrivalStrategy, Cursor, DataSource};
use crate::error::LoopError;
use crate::frame::{Frame, UtDate};
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct InfiniteLoop;

impl ArrivalStrategy for InfiniteLoop {
    fn name(&self) -> &'static str {
        "inf"
    }

    /// A missing file is reported as [`LoopError::Missing`] and the cursor is
    /// left where it was. With `skip`, a later observation already on disk is
    /// taken instead.
    fn next(
        &mut self,
        source: &DataSource,
        utdate: UtDate,
        cursor: &mut Cursor,
        skip: bool,
    ) -> Result<Option<Frame>, LoopError> {
        loop {
            let Some(obsnum) = cursor.current() else {
                return Ok(None);
            };
            if source.raw_path(utdate, obsnum).is_file() {
                cursor.advance();
                return source.frame(utdate, obsnum).map(Some);
            }
            if !skip {
                return Err(source.missing(utdate, obsnum));
            }
            let Some(later) = source.next_available(utdate, obsnum)? else {
                return Err(source.missing(utdate, obsnum));
            };
            debug!(from = obsnum, to = later, "Skipping ahead");
            // On a list cursor the jump can land past `later`; re-check what it points at.
            cursor.jump_to(later);
        }
    }
}
