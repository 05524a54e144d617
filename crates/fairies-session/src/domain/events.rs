//! Journal events for a session.

use chrono::{DateTime, Utc};
use fairies_core::{Actor, Item};
use fairies_narrative::application::sequencer::SequencerEvent;
use fairies_narrative::domain::phase::PhaseKey;
use fairies_requests::domain::request::{DeliveryOutcome, RequestState};
use serde::Serialize;
use uuid::Uuid;

/// Metadata attached to every journal event.
#[derive(Debug, Clone, Serialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Type name, e.g. `session.phase_entered`.
    pub event_type: &'static str,
    /// The session this event belongs to.
    pub session_id: Uuid,
    /// Monotonically increasing position within the session journal.
    pub sequence_number: i64,
    /// Simulated seconds since the session started.
    pub at_secs: f64,
    /// Wall-clock timestamp of event creation.
    pub occurred_at: DateTime<Utc>,
}

/// Event type identifier for [`SessionEventKind::PhaseEntered`].
pub const PHASE_ENTERED_EVENT_TYPE: &str = "session.phase_entered";

/// Event type identifier for [`SessionEventKind::StoryCuePlayed`].
pub const STORY_CUE_PLAYED_EVENT_TYPE: &str = "session.story_cue_played";

/// Event type identifier for [`SessionEventKind::StoryCueSkipped`].
pub const STORY_CUE_SKIPPED_EVENT_TYPE: &str = "session.story_cue_skipped";

/// Event type identifier for [`SessionEventKind::RequestSpawned`].
pub const REQUEST_SPAWNED_EVENT_TYPE: &str = "session.request_spawned";

/// Event type identifier for [`SessionEventKind::DeliveryResolved`].
pub const DELIVERY_RESOLVED_EVENT_TYPE: &str = "session.delivery_resolved";

/// Event type identifier for [`SessionEventKind::DeliveryIgnored`].
pub const DELIVERY_IGNORED_EVENT_TYPE: &str = "session.delivery_ignored";

/// Event type identifier for [`SessionEventKind::RequestReaped`].
pub const REQUEST_REAPED_EVENT_TYPE: &str = "session.request_reaped";

/// Event type identifier for [`SessionEventKind::PhaseCompleted`].
pub const PHASE_COMPLETED_EVENT_TYPE: &str = "session.phase_completed";

/// Event type identifier for [`SessionEventKind::SessionRestarted`].
pub const SESSION_RESTARTED_EVENT_TYPE: &str = "session.restarted";

/// Event type identifier for [`SessionEventKind::SessionFinished`].
pub const SESSION_FINISHED_EVENT_TYPE: &str = "session.finished";

/// Event type identifier for [`SessionEventKind::PauseChanged`].
pub const PAUSE_CHANGED_EVENT_TYPE: &str = "session.pause_changed";

/// Event type identifier for [`SessionEventKind::PauseReset`].
pub const PAUSE_RESET_EVENT_TYPE: &str = "session.pause_reset";

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEventKind {
    /// A phase started.
    PhaseEntered { phase: PhaseKey },
    /// A story cue was dispatched.
    StoryCuePlayed {
        phase: PhaseKey,
        name: String,
        speaker: Actor,
        blocking: bool,
    },
    /// A story cue's branch condition did not hold.
    StoryCueSkipped { phase: PhaseKey, name: String },
    /// A request was registered.
    RequestSpawned {
        phase: PhaseKey,
        actor: Actor,
        key: String,
    },
    /// A delivery was classified.
    DeliveryResolved {
        actor: Actor,
        item: Item,
        outcome: DeliveryOutcome,
        cancelled: Vec<Actor>,
    },
    /// A delivery was refused without any state change.
    DeliveryIgnored {
        receiver: String,
        item: String,
        reason: String,
    },
    /// A timed-out or impossible request was removed.
    RequestReaped { actor: Actor, state: RequestState },
    /// Every request ended and the phase's cues were unloaded.
    PhaseCompleted { phase: PhaseKey },
    /// The last phase ended and the session started over.
    SessionRestarted,
    /// The last phase ended.
    SessionFinished,
    /// The pause toggle changed.
    PauseChanged { paused: bool },
    /// The pause was held past the threshold and the reset hook fired.
    PauseReset { paused_secs: f64 },
}

impl SessionEventKind {
    /// The event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEventKind::PhaseEntered { .. } => PHASE_ENTERED_EVENT_TYPE,
            SessionEventKind::StoryCuePlayed { .. } => STORY_CUE_PLAYED_EVENT_TYPE,
            SessionEventKind::StoryCueSkipped { .. } => STORY_CUE_SKIPPED_EVENT_TYPE,
            SessionEventKind::RequestSpawned { .. } => REQUEST_SPAWNED_EVENT_TYPE,
            SessionEventKind::DeliveryResolved { .. } => DELIVERY_RESOLVED_EVENT_TYPE,
            SessionEventKind::DeliveryIgnored { .. } => DELIVERY_IGNORED_EVENT_TYPE,
            SessionEventKind::RequestReaped { .. } => REQUEST_REAPED_EVENT_TYPE,
            SessionEventKind::PhaseCompleted { .. } => PHASE_COMPLETED_EVENT_TYPE,
            SessionEventKind::SessionRestarted => SESSION_RESTARTED_EVENT_TYPE,
            SessionEventKind::SessionFinished => SESSION_FINISHED_EVENT_TYPE,
            SessionEventKind::PauseChanged { .. } => PAUSE_CHANGED_EVENT_TYPE,
            SessionEventKind::PauseReset { .. } => PAUSE_RESET_EVENT_TYPE,
        }
    }
}

impl From<SequencerEvent> for SessionEventKind {
    fn from(event: SequencerEvent) -> Self {
        match event {
            SequencerEvent::PhaseEntered { phase } => SessionEventKind::PhaseEntered { phase },
            SequencerEvent::StoryCuePlayed {
                phase,
                name,
                speaker,
                blocking,
            } => SessionEventKind::StoryCuePlayed {
                phase,
                name,
                speaker,
                blocking,
            },
            SequencerEvent::StoryCueSkipped { phase, name } => {
                SessionEventKind::StoryCueSkipped { phase, name }
            }
            SequencerEvent::RequestSpawned { phase, actor, key } => {
                SessionEventKind::RequestSpawned { phase, actor, key }
            }
            SequencerEvent::PhaseCompleted { phase } => SessionEventKind::PhaseCompleted { phase },
            SequencerEvent::Restarted => SessionEventKind::SessionRestarted,
            SequencerEvent::Finished => SessionEventKind::SessionFinished,
        }
    }
}

/// Journal event envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: SessionEventKind,
}

impl SessionEvent {
    /// Serializes the whole envelope as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
