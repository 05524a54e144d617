//! Recording sinks for observational collaborators.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use fairies_core::Actor;
use fairies_core::ports::{ActorMotion, MotionSink, ResetHook};

/// A motion sink that records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingMotionSink {
    motions: Mutex<Vec<(Actor, ActorMotion)>>,
}

impl RecordingMotionSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded motions.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn motions(&self) -> Vec<(Actor, ActorMotion)> {
        self.motions.lock().unwrap().clone()
    }

    /// Returns the recorded motions for one actor.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn motions_for(&self, actor: Actor) -> Vec<ActorMotion> {
        self.motions
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| *a == actor)
            .map(|(_, motion)| *motion)
            .collect()
    }

    /// Forgets everything recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn clear(&self) {
        self.motions.lock().unwrap().clear();
    }
}

impl MotionSink for RecordingMotionSink {
    fn handle_actor_motion(&self, actor: Actor, motion: ActorMotion) {
        self.motions.lock().unwrap().push((actor, motion));
    }
}

/// A reset hook that counts how often it fired.
#[derive(Debug, Default)]
pub struct RecordingResetHook {
    resets: AtomicUsize,
}

impl RecordingResetHook {
    /// Creates a hook that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resets triggered.
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ResetHook for RecordingResetHook {
    fn reset(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}
