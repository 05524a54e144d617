//! Read-only view of a running session.

use fairies_core::ActorSet;
use fairies_narrative::application::sequencer::SequencerState;
use fairies_narrative::domain::phase::PhaseKey;
use fairies_requests::domain::request::RequestView;
use fairies_speech::application::arbitrator::SpeechStatus;
use serde::Serialize;
use uuid::Uuid;

/// Everything a debug display needs, captured at one tick boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// The session identifier.
    pub session_id: Uuid,
    /// Simulated seconds since the session started.
    pub elapsed_secs: f64,
    /// The phase being played.
    pub phase: Option<PhaseKey>,
    /// Where the sequencer is within the phase.
    pub state: SequencerState,
    /// Live requests in actor order.
    pub requests: Vec<RequestView>,
    /// Cues waiting to be spoken.
    pub pending_speech: usize,
    /// What the queued-cue dispatcher is doing.
    pub speech: SpeechStatus,
    /// Current silence window in seconds.
    pub silence_secs: f64,
    /// Actors whose request completed in the current cycle.
    pub successful: ActorSet,
    /// Whether time is frozen.
    pub paused: bool,
}
