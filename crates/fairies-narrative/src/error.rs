//! Error types for the narrative bounded context.

use thiserror::Error;

/// A story clip whose name cannot be played.
///
/// Both variants are configuration errors: the sequencer logs them and skips
/// the clip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoryCueError {
    /// The name does not follow `<index>_[<tag>_]<actor>`.
    #[error("malformed story cue name: {0}")]
    Malformed(String),

    /// The trailing token is not an actor.
    #[error("story cue {name} names unknown speaker {speaker}")]
    UnknownSpeaker {
        /// The full clip name.
        name: String,
        /// The offending token.
        speaker: String,
    },

    /// The middle token is not a known branch tag.
    #[error("story cue {name} has unknown branch tag {tag}")]
    UnknownBranchTag {
        /// The full clip name.
        name: String,
        /// The offending token.
        tag: String,
    },
}

/// Errors raised while setting up the narrative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrativeError {
    /// A phase key that is not part of the table.
    #[error("unknown phase: {0}")]
    UnknownPhase(String),
}
