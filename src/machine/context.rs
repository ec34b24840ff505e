use crate::machine::machine_errors::*;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Cooperative cancellation for `compile` and `consult`.
///
/// Loads poll the context between terms and between files, never while a
/// clause is being compiled. Clones share one cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

/// Cancels the context it was taken from, and every clone of it.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancels the context. Loads stop at their next poll.
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Context {
    /// A context with no deadline.
    #[inline]
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that is cancelled once `deadline` has passed.
    #[inline]
    pub fn with_deadline(deadline: Instant) -> Self {
        Context {
            cancelled: Arc::default(),
            deadline: Some(deadline),
        }
    }

    /// A handle cancelling this context from elsewhere.
    #[inline]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: self.cancelled.clone(),
        }
    }

    /// The instant the context expires, if it has one.
    #[inline]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    #[inline]
    pub(crate) fn check(&self) -> Result<(), MachineError> {
        if self.is_cancelled() {
            Err(MachineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
