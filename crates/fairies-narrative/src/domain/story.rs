//! Story cues: clip naming, branch tags, ordering.

use std::fmt;

use fairies_core::ports::StoryClip;
use fairies_core::{Actor, ActorSet, AssetHandle};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::StoryCueError;

/// Playback condition carried in a story clip name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "branch", content = "actor", rename_all = "snake_case")]
pub enum BranchTag {
    /// `<initial>s`: play only if the actor's last request completed.
    Succeeded(Actor),
    /// `<initial>f`: play only if it did not.
    Failed(Actor),
    /// `x`: play without holding up the sequence.
    NonBlocking,
}

impl BranchTag {
    /// Returns `true` if a clip with this tag should play given the actors
    /// that completed their request in the previous phase.
    #[must_use]
    pub fn admits(self, successful: &ActorSet) -> bool {
        match self {
            BranchTag::Succeeded(actor) => successful.contains(actor),
            BranchTag::Failed(actor) => !successful.contains(actor),
            BranchTag::NonBlocking => true,
        }
    }

    /// Reads a tag token such as `ps`, `gf` or `x`.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        if token == "x" {
            return Some(BranchTag::NonBlocking);
        }
        let mut chars = token.chars();
        let (Some(initial), Some(outcome), None) = (chars.next(), chars.next(), chars.next()) else {
            return None;
        };
        let actor = Actor::from_initial(initial)?;
        match outcome {
            's' => Some(BranchTag::Succeeded(actor)),
            'f' => Some(BranchTag::Failed(actor)),
            _ => None,
        }
    }
}

impl fmt::Display for BranchTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchTag::Succeeded(actor) => write!(f, "{}s", actor.initial()),
            BranchTag::Failed(actor) => write!(f, "{}f", actor.initial()),
            BranchTag::NonBlocking => f.write_str("x"),
        }
    }
}

/// A parsed, playable story clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryCue {
    /// Position within the phase.
    pub index: u32,
    /// Optional playback condition.
    pub tag: Option<BranchTag>,
    /// Who speaks it.
    pub speaker: Actor,
    /// The clip name, for logs.
    pub name: String,
    /// The loaded asset.
    pub handle: AssetHandle,
}

impl StoryCue {
    /// Parses a clip named `<index>_[<tag>_]<actor>`.
    ///
    /// # Errors
    ///
    /// Returns a `StoryCueError` if the name has the wrong shape, names an
    /// unknown speaker or carries an unknown branch tag.
    pub fn parse(clip: StoryClip) -> Result<Self, StoryCueError> {
        let parts: Vec<&str> = clip.name.split('_').collect();
        let (index, tag, speaker) = match parts.as_slice() {
            [index, speaker] => (*index, None, *speaker),
            [index, tag, speaker] => (*index, Some(*tag), *speaker),
            _ => return Err(StoryCueError::Malformed(clip.name)),
        };

        let Ok(index) = index.parse::<u32>() else {
            return Err(StoryCueError::Malformed(clip.name));
        };

        let Ok(speaker) = speaker.parse::<Actor>() else {
            return Err(StoryCueError::UnknownSpeaker {
                speaker: speaker.to_owned(),
                name: clip.name,
            });
        };

        let tag = match tag {
            None => None,
            Some(raw) => match BranchTag::from_token(raw) {
                Some(tag) => Some(tag),
                None => {
                    return Err(StoryCueError::UnknownBranchTag {
                        tag: raw.to_owned(),
                        name: clip.name,
                    });
                }
            },
        };

        Ok(Self {
            index,
            tag,
            speaker,
            name: clip.name,
            handle: clip.handle,
        })
    }

    /// Returns `false` for `x`-tagged clips.
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.tag != Some(BranchTag::NonBlocking)
    }

    /// Returns `true` if the branch condition (if any) holds.
    #[must_use]
    pub fn admits(&self, successful: &ActorSet) -> bool {
        self.tag.is_none_or(|tag| tag.admits(successful))
    }
}

/// Parses a phase's clips and orders them by index. Unparseable clips are
/// logged and dropped.
#[must_use]
pub fn arrange(clips: Vec<StoryClip>) -> Vec<StoryCue> {
    let mut cues: Vec<StoryCue> = clips
        .into_iter()
        .filter_map(|clip| {
            StoryCue::parse(clip)
                .inspect_err(|e| error!(error = %e, "skipping story cue"))
                .ok()
        })
        .collect();
    cues.sort_by_key(|cue| cue.index);

    for pair in cues.windows(2) {
        if pair[0].index == pair[1].index {
            warn!(first = %pair[0].name, second = %pair[1].name, "story cues share an index");
        }
    }
    cues
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str) -> StoryClip {
        StoryClip {
            name: name.to_owned(),
            handle: AssetHandle(1),
        }
    }

    #[test]
    fn test_parse_untagged_cue() {
        let cue = StoryCue::parse(clip("03_grandma")).unwrap();

        assert_eq!(cue.index, 3);
        assert_eq!(cue.speaker, Actor::Grandma);
        assert_eq!(cue.tag, None);
        assert!(cue.is_blocking());
    }

    #[test]
    fn test_parse_branch_tags() {
        assert_eq!(
            StoryCue::parse(clip("04_ps_priest")).unwrap().tag,
            Some(BranchTag::Succeeded(Actor::Priest))
        );
        assert_eq!(
            StoryCue::parse(clip("05_df_grandma")).unwrap().tag,
            Some(BranchTag::Failed(Actor::Doctor))
        );
        let ambient = StoryCue::parse(clip("06_x_doctor")).unwrap();
        assert_eq!(ambient.tag, Some(BranchTag::NonBlocking));
        assert!(!ambient.is_blocking());
    }

    #[test]
    fn test_unknown_branch_tag_is_a_configuration_error() {
        let result = StoryCue::parse(clip("07_zz_doctor"));

        assert_eq!(
            result,
            Err(StoryCueError::UnknownBranchTag {
                name: "07_zz_doctor".to_owned(),
                tag: "zz".to_owned()
            })
        );
    }

    #[test]
    fn test_malformed_names_are_rejected() {
        assert!(matches!(
            StoryCue::parse(clip("grandma")),
            Err(StoryCueError::Malformed(_))
        ));
        assert!(matches!(
            StoryCue::parse(clip("one_grandma")),
            Err(StoryCueError::Malformed(_))
        ));
        assert!(matches!(
            StoryCue::parse(clip("01_ps_x_priest")),
            Err(StoryCueError::Malformed(_))
        ));
        assert!(matches!(
            StoryCue::parse(clip("01_grandpa")),
            Err(StoryCueError::UnknownSpeaker { .. })
        ));
    }

    #[test]
    fn test_branch_selection_uses_successful_set() {
        let successful: ActorSet = [Actor::Priest].into_iter().collect();

        assert!(BranchTag::Succeeded(Actor::Priest).admits(&successful));
        assert!(!BranchTag::Failed(Actor::Priest).admits(&successful));
        assert!(!BranchTag::Succeeded(Actor::Doctor).admits(&successful));
        assert!(BranchTag::Failed(Actor::Doctor).admits(&successful));
    }

    #[test]
    fn test_arrange_orders_by_index_and_drops_bad_clips() {
        let cues = arrange(vec![
            clip("10_doctor"),
            clip("02_gs_grandma"),
            clip("bad"),
            clip("01_priest"),
        ]);

        let names: Vec<&str> = cues.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["01_priest", "02_gs_grandma", "10_doctor"]);
    }
}
