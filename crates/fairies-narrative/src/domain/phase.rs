//! The authored phase table.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use fairies_core::{Actor, Item};
use fairies_requests::domain::obligation::RequestSpec;
use serde::{Deserialize, Serialize};

use crate::error::NarrativeError;

/// Identity of a phase. Also names the phase's story-beat directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKey {
    /// Grandma welcomes the player and walks through one request.
    Tutorial,
    /// Each character asks for something simple.
    Intro,
    /// The fever sets in; low-pressure requests.
    Fever,
    /// One urgent request each; not all can be met.
    Seizure,
    /// Two-item requests that compete for ingredients.
    Delirium,
    /// The final urgent two-item requests.
    Climax,
    /// Closing scene.
    Outro,
}

impl PhaseKey {
    /// Every phase, in play order.
    pub const ALL: [PhaseKey; 7] = [
        PhaseKey::Tutorial,
        PhaseKey::Intro,
        PhaseKey::Fever,
        PhaseKey::Seizure,
        PhaseKey::Delirium,
        PhaseKey::Climax,
        PhaseKey::Outro,
    ];

    /// The lowercase key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKey::Tutorial => "tutorial",
            PhaseKey::Intro => "intro",
            PhaseKey::Fever => "fever",
            PhaseKey::Seizure => "seizure",
            PhaseKey::Delirium => "delirium",
            PhaseKey::Climax => "climax",
            PhaseKey::Outro => "outro",
        }
    }

    /// The directory holding this phase's story clips.
    #[must_use]
    pub fn story_directory(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseKey {
    type Err = NarrativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| NarrativeError::UnknownPhase(s.to_owned()))
    }
}

/// One narrative segment: its story beats are discovered on disk, its
/// requests are authored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Phase {
    /// The phase identity.
    pub key: PhaseKey,
    /// Requests announced once the story lines are done, in spawn order.
    pub requests: &'static [RequestSpec],
}

const fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

/// The full game, in play order.
pub static PHASES: [Phase; 7] = [
    Phase {
        key: PhaseKey::Tutorial,
        requests: &[RequestSpec::single(Actor::Grandma, Item::Sideritis, secs(30)).restarting()],
    },
    Phase {
        key: PhaseKey::Intro,
        requests: &[
            RequestSpec::single(Actor::Doctor, Item::Chamomile, secs(60)),
            RequestSpec::single(Actor::Priest, Item::Honey, secs(60)),
            RequestSpec::single(Actor::Grandma, Item::Eucalyptus, secs(60)),
        ],
    },
    Phase {
        key: PhaseKey::Fever,
        requests: &[
            RequestSpec::single(Actor::Doctor, Item::Alcohol, secs(45)),
            RequestSpec::single(Actor::Priest, Item::Basil, secs(45)),
            RequestSpec::single(Actor::Grandma, Item::Apiganos, secs(45)),
        ],
    },
    Phase {
        key: PhaseKey::Seizure,
        requests: &[
            RequestSpec::single(Actor::Doctor, Item::Glass, secs(30)),
            RequestSpec::single(Actor::Priest, Item::Oil, secs(30)),
            RequestSpec::single(Actor::Grandma, Item::Salt, secs(30)),
        ],
    },
    Phase {
        key: PhaseKey::Delirium,
        requests: &[
            RequestSpec::dual(Actor::Doctor, Item::Vitriol, Item::Soda, secs(75)),
            RequestSpec::dual(Actor::Priest, Item::Gunpowder, Item::Garlic, secs(75)),
            RequestSpec::dual(Actor::Grandma, Item::Mint, Item::Garlic, secs(75)),
        ],
    },
    Phase {
        key: PhaseKey::Climax,
        requests: &[
            RequestSpec::dual(Actor::Doctor, Item::Artemisian, Item::Turtle, secs(45)),
            RequestSpec::dual(Actor::Priest, Item::Turtle, Item::Hay, secs(45)),
            RequestSpec::dual(Actor::Grandma, Item::Artemisian, Item::Hay, secs(45)),
        ],
    },
    Phase {
        key: PhaseKey::Outro,
        requests: &[],
    },
];

/// Looks up the authored phase for `key`.
#[must_use]
pub fn phase(key: PhaseKey) -> &'static Phase {
    // The table lists every key in `PhaseKey::ALL` order.
    &PHASES[key as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_in_play_order() {
        let keys: Vec<PhaseKey> = PHASES.iter().map(|p| p.key).collect();
        assert_eq!(keys, PhaseKey::ALL.to_vec());
        assert_eq!(phase(PhaseKey::Seizure).key, PhaseKey::Seizure);
    }

    #[test]
    fn test_every_authored_request_is_valid() {
        for phase in &PHASES {
            for spec in phase.requests {
                assert!(spec.validate().is_ok(), "{} {:?}", phase.key, spec);
            }
        }
    }

    #[test]
    fn test_at_most_one_request_per_actor_per_phase() {
        for phase in &PHASES {
            for actor in Actor::ALL {
                let count = phase.requests.iter().filter(|s| s.requester == actor).count();
                assert!(count <= 1, "{} has {count} requests for {actor}", phase.key);
            }
        }
    }

    #[test]
    fn test_only_tutorial_restarts() {
        assert!(phase(PhaseKey::Tutorial).requests[0].restart_on_timeout);
        let restarting = PHASES
            .iter()
            .flat_map(|p| p.requests)
            .filter(|s| s.restart_on_timeout)
            .count();
        assert_eq!(restarting, 1);
    }

    #[test]
    fn test_phase_key_round_trips_through_name() {
        assert_eq!("delirium".parse::<PhaseKey>(), Ok(PhaseKey::Delirium));
        assert_eq!(
            "epilogue".parse::<PhaseKey>(),
            Err(NarrativeError::UnknownPhase("epilogue".to_owned()))
        );
        assert_eq!(serde_json::to_string(&PhaseKey::Outro).unwrap(), "\"outro\"");
    }
}
