//! Pending speech queue shared between cue producers and the dispatcher.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cue::Cue;

/// FIFO of cues awaiting dispatch.
///
/// Cloning yields another handle to the same queue: every active request
/// holds one as its emission channel while the speech dispatcher drains it.
/// Draining swaps the contents out, so cues pushed while a drained batch is
/// being worked through land in the next batch.
#[derive(Debug, Clone, Default)]
pub struct SpeechQueue {
    pending: Arc<Mutex<Vec<Cue>>>,
}

impl SpeechQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a cue.
    pub fn push(&self, cue: Cue) {
        self.lock().push(cue);
    }

    /// Takes every pending cue, leaving the queue empty.
    #[must_use]
    pub fn drain(&self) -> Vec<Cue> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of pending cues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns `true` if both handles point at the same queue.
    #[must_use]
    pub fn same_queue(&self, other: &SpeechQueue) -> bool {
        Arc::ptr_eq(&self.pending, &other.pending)
    }

    // Queue contents stay valid even if a producer panicked mid-push.
    fn lock(&self) -> MutexGuard<'_, Vec<Cue>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
