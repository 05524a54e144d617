//! Simulated stage: speakers that play for a fixed time, and collaborators
//! that only log.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fairies_core::ports::{ActorMotion, AudioChannel, MotionSink, ResetHook};
use fairies_core::{Actor, ActorMap, AssetHandle};
use tracing::{debug, info, warn};

/// Three speakers sharing one simulated playback clock.
#[derive(Debug, Clone)]
pub struct SimulatedSpeakers {
    clip_length: Duration,
    remaining: Arc<Mutex<ActorMap<Duration>>>,
}

impl SimulatedSpeakers {
    /// Speakers that play every clip for `clip_length`.
    #[must_use]
    pub fn new(clip_length: Duration) -> Self {
        Self {
            clip_length,
            remaining: Arc::new(Mutex::new(ActorMap::default())),
        }
    }

    /// One channel per actor, for the session.
    #[must_use]
    pub fn channels(&self) -> ActorMap<Box<dyn AudioChannel>> {
        ActorMap::from_fn(|actor| {
            Box::new(SimulatedChannel {
                actor,
                speakers: self.clone(),
            }) as Box<dyn AudioChannel>
        })
    }

    /// Lets every channel play for `dt`.
    pub fn advance(&self, dt: Duration) {
        for remaining in self.lock().values_mut() {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    fn lock(&self) -> MutexGuard<'_, ActorMap<Duration>> {
        self.remaining.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct SimulatedChannel {
    actor: Actor,
    speakers: SimulatedSpeakers,
}

impl AudioChannel for SimulatedChannel {
    fn play(&self, asset: AssetHandle) {
        self.speakers.lock()[self.actor] = self.speakers.clip_length;
        debug!(actor = %self.actor, asset = asset.0, "playing clip");
    }

    fn is_playing(&self) -> bool {
        !self.speakers.lock()[self.actor].is_zero()
    }
}

/// Logs actor motions.
#[derive(Debug, Default)]
pub struct TracingMotionSink;

impl MotionSink for TracingMotionSink {
    fn handle_actor_motion(&self, actor: Actor, motion: ActorMotion) {
        info!(actor = %actor, ?motion, "actor motion");
    }
}

/// Logs and counts reset requests.
#[derive(Debug, Default)]
pub struct TracingResetHook {
    resets: AtomicUsize,
}

impl TracingResetHook {
    /// Number of resets requested so far.
    #[must_use]
    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

impl ResetHook for TracingResetHook {
    fn reset(&self) {
        let count = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(count, "session reset requested");
    }
}
