//! Speech arbitration: one queued utterance at a time, gated on silence.

use std::collections::VecDeque;
use std::time::Duration;

use fairies_core::ports::AudioChannel;
use fairies_core::speech_queue::SpeechQueue;
use fairies_core::{Actor, ActorMap, AssetHandle, Cue};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::silence::SilenceTracker;

/// What the queued-cue dispatcher is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "actor", rename_all = "snake_case")]
pub enum SpeechStatus {
    /// Nothing pending and nothing dispatched.
    Idle,
    /// Cues are pending but the silence gate is closed.
    Waiting,
    /// A queued cue was dispatched to this actor and is still playing.
    Speaking(Actor),
}

/// Serialises queued cues across all actor channels.
///
/// Requests push onto the shared [`SpeechQueue`]; each update drains it into
/// a working batch (only once the previous batch is exhausted), then plays
/// the next cue when the silence window has lasted long enough and no
/// channel is busy. A dispatched cue blocks further dispatch until its
/// channel stops.
///
/// Story cues bypass the queue through [`SpeechArbitrator::play_now`].
pub struct SpeechArbitrator {
    queue: SpeechQueue,
    batch: VecDeque<Cue>,
    speaking: Option<Actor>,
    channels: ActorMap<Box<dyn AudioChannel>>,
    silence: SilenceTracker,
    min_time_between_speaking: Duration,
}

impl SpeechArbitrator {
    /// Creates an arbitrator consuming `queue` and playing on `channels`.
    #[must_use]
    pub fn new(
        queue: SpeechQueue,
        channels: ActorMap<Box<dyn AudioChannel>>,
        min_time_between_speaking: Duration,
    ) -> Self {
        Self {
            queue,
            batch: VecDeque::new(),
            speaking: None,
            channels,
            silence: SilenceTracker::new(),
            min_time_between_speaking,
        }
    }

    /// Advances silence tracking by `dt`, then dispatches at most one queued
    /// cue.
    pub fn update(&mut self, dt: Duration) {
        let any_playing = self.any_playing();
        self.silence.update(any_playing, dt);

        if let Some(actor) = self.speaking {
            if self.channels[actor].is_playing() {
                return;
            }
            debug!(actor = %actor, "queued cue finished");
            self.speaking = None;
        }

        if self.batch.is_empty() {
            self.batch.extend(self.queue.drain());
        }

        if self.batch.is_empty()
            || any_playing
            || !self.silence.has_lasted(self.min_time_between_speaking)
        {
            return;
        }

        while let Some(cue) = self.batch.pop_front() {
            let Some(handle) = cue.handle() else {
                warn!(cue = %cue, "queued cue is not loaded; skipping");
                continue;
            };
            info!(cue = %cue, "playing queued cue");
            self.channels[cue.speaker()].play(handle);
            self.speaking = Some(cue.speaker());
            return;
        }
    }

    /// Plays a story cue on `actor`'s channel immediately, outside the queue.
    pub fn play_now(&self, actor: Actor, handle: AssetHandle) {
        self.channels[actor].play(handle);
    }

    /// Returns `true` while `actor`'s channel is producing sound.
    #[must_use]
    pub fn is_playing(&self, actor: Actor) -> bool {
        self.channels[actor].is_playing()
    }

    /// Returns `true` while any channel is producing sound.
    #[must_use]
    pub fn any_playing(&self) -> bool {
        self.channels.values().any(|channel| channel.is_playing())
    }

    /// Returns `true` when no cue is pending, batched or being spoken.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.speaking.is_none() && self.batch.is_empty() && self.queue.is_empty()
    }

    /// Cues waiting for dispatch, batched or still in the shared queue.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.batch.len() + self.queue.len()
    }

    /// The current silence window.
    #[must_use]
    pub fn silence(&self) -> Duration {
        self.silence.silence()
    }

    /// What the dispatcher is doing.
    #[must_use]
    pub fn status(&self) -> SpeechStatus {
        match self.speaking {
            Some(actor) => SpeechStatus::Speaking(actor),
            None if self.pending() > 0 => SpeechStatus::Waiting,
            None => SpeechStatus::Idle,
        }
    }
}

impl std::fmt::Debug for SpeechArbitrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechArbitrator")
            .field("batch", &self.batch)
            .field("speaking", &self.speaking)
            .field("silence", &self.silence)
            .field("min_time_between_speaking", &self.min_time_between_speaking)
            .finish_non_exhaustive()
    }
}
