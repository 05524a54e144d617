//! Simulated speakers: one channel per actor, each clip lasting a fixed
//! simulated length.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use fairies_core::ports::AudioChannel;
use fairies_core::{Actor, ActorMap, AssetHandle};

#[derive(Debug, Default)]
struct SpeakerState {
    clip_length: Duration,
    remaining: ActorMap<Duration>,
    played: Vec<(Actor, AssetHandle)>,
}

/// Shared state behind the three fake channels.
///
/// Channels never advance on their own; tests call [`FakeSpeakers::advance`]
/// with the same `dt` they hand to the code under test.
#[derive(Debug, Clone, Default)]
pub struct FakeSpeakers {
    state: Arc<Mutex<SpeakerState>>,
}

impl FakeSpeakers {
    /// Speakers whose clips each play for `clip_length`.
    #[must_use]
    pub fn new(clip_length: Duration) -> Self {
        let speakers = Self::default();
        speakers.state.lock().unwrap().clip_length = clip_length;
        speakers
    }

    /// The channel for `actor`.
    #[must_use]
    pub fn channel(&self, actor: Actor) -> FakeAudioChannel {
        FakeAudioChannel {
            actor,
            state: Arc::clone(&self.state),
        }
    }

    /// One boxed channel per actor.
    #[must_use]
    pub fn channels(&self) -> ActorMap<Box<dyn AudioChannel>> {
        ActorMap::from_fn(|actor| Box::new(self.channel(actor)) as Box<dyn AudioChannel>)
    }

    /// Advances playback on every channel.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn advance(&self, dt: Duration) {
        let mut state = self.state.lock().unwrap();
        for remaining in state.remaining.values_mut() {
            *remaining = remaining.saturating_sub(dt);
        }
    }

    /// Stops every channel immediately.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn finish_all(&self) {
        let mut state = self.state.lock().unwrap();
        for remaining in state.remaining.values_mut() {
            *remaining = Duration::ZERO;
        }
    }

    /// Every `play` call so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn played(&self) -> Vec<(Actor, AssetHandle)> {
        self.state.lock().unwrap().played.clone()
    }

    /// Returns `true` if `actor`'s channel is playing.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_playing(&self, actor: Actor) -> bool {
        !self.state.lock().unwrap().remaining[actor].is_zero()
    }
}

/// One actor's channel on a [`FakeSpeakers`].
#[derive(Debug, Clone)]
pub struct FakeAudioChannel {
    actor: Actor,
    state: Arc<Mutex<SpeakerState>>,
}

impl AudioChannel for FakeAudioChannel {
    fn play(&self, asset: AssetHandle) {
        let mut state = self.state.lock().unwrap();
        state.remaining[self.actor] = state.clip_length;
        state.played.push((self.actor, asset));
    }

    fn is_playing(&self) -> bool {
        !self.state.lock().unwrap().remaining[self.actor].is_zero()
    }
}
