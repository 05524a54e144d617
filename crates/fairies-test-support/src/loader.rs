//! In-memory cue loader that records asset traffic.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use fairies_core::AssetHandle;
use fairies_core::ports::{CueLoader, StoryClip};

#[derive(Debug, Default)]
struct LoaderState {
    // `None` accepts every path.
    known: Option<BTreeSet<String>>,
    stories: BTreeMap<String, Vec<String>>,
    by_path: BTreeMap<String, AssetHandle>,
    loaded: BTreeMap<AssetHandle, String>,
    next_handle: u64,
    load_calls: usize,
    unloaded: Vec<String>,
}

/// A cue loader backed by memory.
///
/// Loading the same path twice returns the same handle; unloads are
/// recorded by path so tests can assert on the phase-scoped asset lifetime.
#[derive(Debug, Default)]
pub struct InMemoryCueLoader {
    state: Mutex<LoaderState>,
}

impl InMemoryCueLoader {
    /// A loader that finds every path.
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// A loader that finds only the given paths (plus any story clip added
    /// later).
    #[must_use]
    pub fn strict<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let loader = Self::default();
        loader.state.lock().unwrap().known = Some(paths.into_iter().map(Into::into).collect());
        loader
    }

    /// Serves `names` (without extension, unordered) as the story clips of
    /// `directory`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn with_story(self, directory: &str, names: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let names: Vec<String> = names.iter().map(|name| (*name).to_owned()).collect();
            if let Some(known) = state.known.as_mut() {
                known.extend(names.iter().map(|name| format!("{directory}/{name}")));
            }
            state.stories.insert(directory.to_owned(), names);
        }
        self
    }

    /// Number of assets currently loaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn loaded_count(&self) -> usize {
        self.state.lock().unwrap().loaded.len()
    }

    /// Returns `true` if the asset at `path` is currently loaded.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn is_loaded(&self, path: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .by_path
            .get(path)
            .is_some_and(|handle| state.loaded.contains_key(handle))
    }

    /// The path an issued handle refers to.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn path_of(&self, handle: AssetHandle) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .by_path
            .iter()
            .find(|(_, h)| **h == handle)
            .map(|(path, _)| path.clone())
    }

    /// Total `load` calls, including misses and repeats.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn load_calls(&self) -> usize {
        self.state.lock().unwrap().load_calls
    }

    /// Paths unloaded so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn unloaded(&self) -> Vec<String> {
        self.state.lock().unwrap().unloaded.clone()
    }
}

impl CueLoader for InMemoryCueLoader {
    fn load(&self, path: &str) -> Option<AssetHandle> {
        let mut state = self.state.lock().unwrap();
        state.load_calls += 1;
        if let Some(known) = &state.known
            && !known.contains(path)
        {
            return None;
        }

        let handle = match state.by_path.get(path) {
            Some(handle) => *handle,
            None => {
                state.next_handle += 1;
                let handle = AssetHandle(state.next_handle);
                state.by_path.insert(path.to_owned(), handle);
                handle
            }
        };
        state.loaded.insert(handle, path.to_owned());
        Some(handle)
    }

    fn unload(&self, handle: AssetHandle) {
        let mut state = self.state.lock().unwrap();
        if let Some(path) = state.loaded.remove(&handle) {
            state.unloaded.push(path);
        }
    }

    fn load_story_clips(&self, directory: &str) -> Vec<StoryClip> {
        let names = self
            .state
            .lock()
            .unwrap()
            .stories
            .get(directory)
            .cloned()
            .unwrap_or_default();

        names
            .into_iter()
            .filter_map(|name| {
                let handle = self.load(&format!("{directory}/{name}"))?;
                Some(StoryClip { name, handle })
            })
            .collect()
    }
}
