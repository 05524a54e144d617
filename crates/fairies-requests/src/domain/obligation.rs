//! What a request asks for, and the cue vocabulary that follows from it.

use std::time::Duration;

use fairies_core::{Actor, Item};
use serde::Serialize;

use crate::error::RequestError;

/// The item(s) a request obliges the player to deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum Obligation {
    /// Exactly one item.
    Single(Item),
    /// Two distinct items, deliverable in either order.
    Dual(Item, Item),
}

impl Obligation {
    /// The request key used as the cue directory: `<a>` or `<a>_<b>`.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Obligation::Single(item) => item.to_string(),
            Obligation::Dual(a, b) => format!("{a}_{b}"),
        }
    }
}

/// How deliveries are classified against a single-item obligation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Exact item identity. Supports single and dual obligations.
    #[default]
    Identity,
    /// Single obligations only: distinguishes a wrong item type from the
    /// right type in the wrong quantity.
    ItemType,
}

/// Authored, immutable description of a request to spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSpec {
    /// The actor asking.
    pub requester: Actor,
    /// The item(s) asked for.
    pub obligation: Obligation,
    /// Deadline measured from the first tick.
    pub max_duration: Duration,
    /// Whether the timer restarts instead of timing out.
    pub restart_on_timeout: bool,
    /// Delivery classification policy.
    pub policy: MatchPolicy,
}

impl RequestSpec {
    /// A single-item request with the identity policy.
    #[must_use]
    pub const fn single(requester: Actor, item: Item, max_duration: Duration) -> Self {
        Self {
            requester,
            obligation: Obligation::Single(item),
            max_duration,
            restart_on_timeout: false,
            policy: MatchPolicy::Identity,
        }
    }

    /// A two-item request.
    #[must_use]
    pub const fn dual(requester: Actor, a: Item, b: Item, max_duration: Duration) -> Self {
        Self {
            requester,
            obligation: Obligation::Dual(a, b),
            max_duration,
            restart_on_timeout: false,
            policy: MatchPolicy::Identity,
        }
    }

    /// Makes the request restart its timer on timeout.
    #[must_use]
    pub const fn restarting(mut self) -> Self {
        self.restart_on_timeout = true;
        self
    }

    /// Switches to the item-type policy.
    #[must_use]
    pub const fn by_item_type(mut self) -> Self {
        self.policy = MatchPolicy::ItemType;
        self
    }

    /// Checks that the spec describes a satisfiable request.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidObligation` for a dual obligation with
    /// identical halves, a dual obligation under the item-type policy, or a
    /// zero deadline.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.max_duration.is_zero() {
            return Err(RequestError::InvalidObligation(format!(
                "{} request for {} has a zero deadline",
                self.requester,
                self.obligation.key()
            )));
        }
        match (self.obligation, self.policy) {
            (Obligation::Dual(a, b), _) if a == b => Err(RequestError::InvalidObligation(
                format!("dual obligation repeats {a}"),
            )),
            (Obligation::Dual(a, b), MatchPolicy::ItemType) => {
                Err(RequestError::InvalidObligation(format!(
                    "item-type policy cannot classify dual obligation {a}_{b}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// The cue kinds this request owns. The count is fixed by arity and
    /// policy: 6 (single, identity), 7 (single, item type) or 16 (dual).
    #[must_use]
    pub fn cue_kinds(&self) -> &'static [CueKind] {
        match (self.obligation, self.policy) {
            (Obligation::Single(_), MatchPolicy::Identity) => CueKind::SINGLE,
            (Obligation::Single(_), MatchPolicy::ItemType) => CueKind::SINGLE_BY_TYPE,
            (Obligation::Dual(..), _) => CueKind::DUAL,
        }
    }
}

/// One utterance slot of a request. `A`/`B` variants refer to the obligated
/// item that is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CueKind {
    Initial,
    Reminder1,
    Reminder1A,
    Reminder1B,
    Reminder2,
    Reminder2A,
    Reminder2B,
    Wrong,
    WrongA,
    WrongB,
    WrongType,
    WrongQuantity,
    Success,
    SuccessA,
    SuccessB,
    Timeout,
    TimeoutA,
    TimeoutB,
}

impl CueKind {
    const SINGLE: &'static [CueKind] = &[
        CueKind::Initial,
        CueKind::Reminder1,
        CueKind::Reminder2,
        CueKind::Wrong,
        CueKind::Success,
        CueKind::Timeout,
    ];

    const SINGLE_BY_TYPE: &'static [CueKind] = &[
        CueKind::Initial,
        CueKind::Reminder1,
        CueKind::Reminder2,
        CueKind::WrongType,
        CueKind::WrongQuantity,
        CueKind::Success,
        CueKind::Timeout,
    ];

    const DUAL: &'static [CueKind] = &[
        CueKind::Initial,
        CueKind::Reminder1,
        CueKind::Reminder1A,
        CueKind::Reminder1B,
        CueKind::Reminder2,
        CueKind::Reminder2A,
        CueKind::Reminder2B,
        CueKind::Wrong,
        CueKind::WrongA,
        CueKind::WrongB,
        CueKind::Success,
        CueKind::SuccessA,
        CueKind::SuccessB,
        CueKind::Timeout,
        CueKind::TimeoutA,
        CueKind::TimeoutB,
    ];

    /// The file-name suffix under the request key directory.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            CueKind::Initial => "r0",
            CueKind::Reminder1 => "r1",
            CueKind::Reminder1A => "r1_a",
            CueKind::Reminder1B => "r1_b",
            CueKind::Reminder2 => "r2",
            CueKind::Reminder2A => "r2_a",
            CueKind::Reminder2B => "r2_b",
            CueKind::Wrong => "w",
            CueKind::WrongA => "w_a",
            CueKind::WrongB => "w_b",
            CueKind::WrongType => "wt",
            CueKind::WrongQuantity => "wq",
            CueKind::Success => "s",
            CueKind::SuccessA => "s_a",
            CueKind::SuccessB => "s_b",
            CueKind::Timeout => "t",
            CueKind::TimeoutA => "t_a",
            CueKind::TimeoutB => "t_b",
        }
    }
}
