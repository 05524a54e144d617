//! Cues: identified pre-recorded utterances.

use std::fmt;

use serde::Serialize;
use tracing::{debug, error};

use crate::actor::Actor;
use crate::ports::CueLoader;

/// Opaque handle to a loaded audio asset, issued by a [`CueLoader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct AssetHandle(pub u64);

/// One pre-recorded utterance, identified by speaker and path.
///
/// The asset is resolved lazily through a [`CueLoader`]; loading and
/// unloading are both idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    speaker: Actor,
    path: String,
    handle: Option<AssetHandle>,
}

impl Cue {
    /// Creates an unloaded cue for `speaker` at `path` (relative to the
    /// speaker's asset directory).
    #[must_use]
    pub fn new(speaker: Actor, path: impl Into<String>) -> Self {
        Self {
            speaker,
            path: path.into(),
            handle: None,
        }
    }

    /// Creates a cue that is already backed by a loaded asset.
    #[must_use]
    pub fn preloaded(speaker: Actor, path: impl Into<String>, handle: AssetHandle) -> Self {
        Self {
            speaker,
            path: path.into(),
            handle: Some(handle),
        }
    }

    /// The actor who speaks this cue.
    #[must_use]
    pub fn speaker(&self) -> Actor {
        self.speaker
    }

    /// The path relative to the speaker directory, e.g. `honey/r0`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The full loader path: `<speaker>/<path>`.
    #[must_use]
    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.speaker, self.path)
    }

    /// The loaded asset, if any.
    #[must_use]
    pub fn handle(&self) -> Option<AssetHandle> {
        self.handle
    }

    /// Returns `true` if an asset is bound.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Resolves the asset. A no-op if already loaded; returns whether an
    /// asset is bound afterwards.
    pub fn load(&mut self, loader: &dyn CueLoader) -> bool {
        if self.handle.is_some() {
            return true;
        }
        let path = self.resource_path();
        self.handle = loader.load(&path);
        if self.handle.is_none() {
            error!(cue = %path, "could not find cue asset");
            return false;
        }
        debug!(cue = %path, "loaded cue");
        true
    }

    /// Releases the asset. Tolerates a cue that was never loaded.
    pub fn unload(&mut self, loader: &dyn CueLoader) {
        if let Some(handle) = self.handle.take() {
            loader.unload(handle);
            debug!(cue = %self.resource_path(), "unloaded cue");
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_loaded() { "LOADED" } else { "UNLOADED" };
        write!(f, "{}_\"{}\"_{status}", self.speaker, self.path)
    }
}
