//! Ports to the external collaborators the orchestration core drives.
//!
//! Rendering, tweening, audio hardware and asset storage live behind these
//! traits. Implementations use interior mutability where they record state,
//! so the core only ever holds shared references.

use serde::Serialize;

use crate::actor::Actor;
use crate::cue::AssetHandle;

/// A story clip discovered in a phase's story-beat directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryClip {
    /// The clip name without extension, e.g. `03_ps_priest`.
    pub name: String,
    /// The loaded asset.
    pub handle: AssetHandle,
}

/// Resolves cue paths to loaded assets.
pub trait CueLoader: Send + Sync {
    /// Loads the asset at `path`, returning `None` if it does not exist.
    /// Loading an already-loaded path must not fail.
    fn load(&self, path: &str) -> Option<AssetHandle>;

    /// Releases a previously loaded asset. Must be idempotent.
    fn unload(&self, handle: AssetHandle);

    /// Loads every clip in a story-beat `directory`, in any order.
    fn load_story_clips(&self, directory: &str) -> Vec<StoryClip>;
}

/// One actor's audio output.
pub trait AudioChannel: Send + Sync {
    /// Starts playing `asset`, replacing whatever was playing.
    fn play(&self, asset: AssetHandle);

    /// Returns `true` while the channel is producing sound.
    fn is_playing(&self) -> bool;
}

/// Visual reaction requested from the actor motion sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorMotion {
    /// The actor steps forward with a request.
    Appear,
    /// The actor accepted one of two items.
    Partial,
    /// The actor hands a wrong item back.
    Reject,
    /// The actor withdraws.
    Disappear,
}

/// Receives actor motion notifications. Purely observational: the core never
/// waits on it.
pub trait MotionSink: Send + Sync {
    /// Handles one motion for `actor`.
    fn handle_actor_motion(&self, actor: Actor, motion: ActorMotion);
}

/// Resets the whole session after a pause held for too long.
pub trait ResetHook: Send + Sync {
    /// Triggers the reset.
    fn reset(&self);
}
