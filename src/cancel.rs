//! # Cancellation Module
//!
//! Flag di abort cooperativo condiviso tra chiamante e pipeline.
//!
//! Il chiamante esterno imposta il flag; scheduler e orchestratore lo leggono
//! solo ai checkpoint (sottomissione task, passaggio tra archivi). Il lavoro
//! già in volo non viene mai interrotto.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Thread-safe abort signal for one batch run
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an abort; idempotent
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
