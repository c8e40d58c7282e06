//! Operator abort flag.
//!
//! Shared between whoever receives the operator's stop request and the code that
//! must notice it: the executor between steps, the orchestrator between frames,
//! and the arrival loop on every poll subdivision.

use crate::error::Interrupt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(UserAbort)` once the flag is raised.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.is_raised() {
            Err(Interrupt::UserAbort)
        } else {
            Ok(())
        }
    }
}
