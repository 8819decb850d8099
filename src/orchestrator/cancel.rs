//! Cooperative cancellation of orchestration passes.
//!
//! Every pass takes a [`PassGuard`] snapshot of a shared generation counter.
//! Starting a new pass bumps the counter and raises the previous pass's abort
//! flag; async steps check the guard at each suspension point and stop quietly
//! once superseded.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct Generation {
    counter: Arc<AtomicU64>,
    current_abort: Arc<Mutex<Arc<AtomicBool>>>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new pass, superseding whichever pass was running.
    pub fn begin(&self) -> PassGuard {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let aborted = Arc::new(AtomicBool::new(false));
        if let Ok(mut current) = self.current_abort.lock() {
            let previous = std::mem::replace(&mut *current, Arc::clone(&aborted));
            previous.store(true, Ordering::SeqCst);
        }
        PassGuard {
            generation,
            counter: Arc::clone(&self.counter),
            aborted,
        }
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            counter: Arc::clone(&self.counter),
            current_abort: Arc::clone(&self.current_abort),
        }
    }
}

/// Snapshot of the generation a pass started with.
#[derive(Debug, Clone)]
pub struct PassGuard {
    generation: u64,
    counter: Arc<AtomicU64>,
    aborted: Arc<AtomicBool>,
}

impl PassGuard {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether this pass may still touch shared state.
    pub fn is_current(&self) -> bool {
        !self.aborted.load(Ordering::SeqCst)
            && self.counter.load(Ordering::SeqCst) == self.generation
    }
}

/// Cancels the running pass from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    counter: Arc<AtomicU64>,
    current_abort: Arc<Mutex<Arc<AtomicBool>>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
        if let Ok(current) = self.current_abort.lock() {
            current.store(true, Ordering::SeqCst);
        }
        tracing::debug!("Spectrogram pass cancelled");
    }
}
