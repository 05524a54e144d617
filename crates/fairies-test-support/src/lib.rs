//! Shared test fakes and utilities for the Fairies orchestration core.

mod audio;
mod clock;
mod loader;
mod motion;
mod rng;

pub use audio::{FakeAudioChannel, FakeSpeakers};
pub use clock::{FixedClock, ManualClock};
pub use loader::InMemoryCueLoader;
pub use motion::{RecordingMotionSink, RecordingResetHook};
pub use rng::{MockRng, SequenceRng};
