//! Filesystem cue loader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fairies_core::AssetHandle;
use fairies_core::ports::{CueLoader, StoryClip};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct LoaderState {
    handles: HashMap<String, AssetHandle>,
    loaded: HashMap<AssetHandle, String>,
    next_handle: u64,
}

/// Resolves cue paths against an asset directory tree.
///
/// A path names a file without its extension: `doctor/oil/r0` is found as
/// `doctor/oil/r0.ogg`, `doctor/oil/r0.wav` or any other extension. Nothing
/// is decoded; existence is what counts.
#[derive(Debug)]
pub struct FsCueLoader {
    root: PathBuf,
    state: Mutex<LoaderState>,
}

impl FsCueLoader {
    /// A loader rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(LoaderState::default()),
        }
    }

    /// The asset root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of assets currently loaded.
    #[must_use]
    pub fn loaded_count(&self) -> usize {
        self.lock().loaded.len()
    }

    fn locate(&self, path: &str) -> Option<PathBuf> {
        let exact = self.root.join(path);
        if exact.is_file() {
            return Some(exact);
        }
        let stem = exact.file_name()?.to_owned();
        std::fs::read_dir(exact.parent()?)
            .ok()?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|candidate| candidate.is_file() && candidate.file_stem() == Some(stem.as_os_str()))
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CueLoader for FsCueLoader {
    fn load(&self, path: &str) -> Option<AssetHandle> {
        let file = self.locate(path)?;

        let mut state = self.lock();
        let handle = if let Some(handle) = state.handles.get(path) {
            *handle
        } else {
            state.next_handle += 1;
            let handle = AssetHandle(state.next_handle);
            state.handles.insert(path.to_owned(), handle);
            handle
        };
        state.loaded.insert(handle, path.to_owned());
        debug!(cue = %path, file = %file.display(), "loaded asset");
        Some(handle)
    }

    fn unload(&self, handle: AssetHandle) {
        if let Some(path) = self.lock().loaded.remove(&handle) {
            debug!(cue = %path, "unloaded asset");
        }
    }

    fn load_story_clips(&self, directory: &str) -> Vec<StoryClip> {
        let entries = match std::fs::read_dir(self.root.join(directory)) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(directory = %directory, error = %e, "no story directory");
                return Vec::new();
            }
        };

        entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_stem()?.to_str()?.to_owned();
                let handle = self.load(&format!("{directory}/{name}"))?;
                Some(StoryClip { name, handle })
            })
            .collect()
    }
}
