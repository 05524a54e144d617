//! The closed set of speaking characters and containers keyed by them.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;

/// One of the characters that can speak and hold a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    /// The grandmother, who also runs the tutorial.
    Grandma,
    /// The village doctor.
    Doctor,
    /// The village priest.
    Priest,
}

impl Actor {
    /// Every actor, in slot order.
    pub const ALL: [Actor; 3] = [Actor::Grandma, Actor::Doctor, Actor::Priest];

    /// Number of actors.
    pub const COUNT: usize = Self::ALL.len();

    /// Returns the lowercase identity used in asset paths and cue names.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Actor::Grandma => "grandma",
            Actor::Doctor => "doctor",
            Actor::Priest => "priest",
        }
    }

    /// Returns the single-letter initial used by story branch tags.
    #[must_use]
    pub fn initial(self) -> char {
        match self {
            Actor::Grandma => 'g',
            Actor::Doctor => 'd',
            Actor::Priest => 'p',
        }
    }

    /// Looks an actor up by its branch-tag initial.
    #[must_use]
    pub fn from_initial(initial: char) -> Option<Self> {
        Self::ALL.into_iter().find(|actor| actor.initial() == initial)
    }

    fn slot(self) -> usize {
        match self {
            Actor::Grandma => 0,
            Actor::Doctor => 1,
            Actor::Priest => 2,
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Actor {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|actor| actor.as_str() == s)
            .ok_or_else(|| CoreError::UnknownActor(s.to_owned()))
    }
}

/// A total mapping from every [`Actor`] to a value.
///
/// Backed by a fixed array so that adding an actor forces every
/// construction site to supply a value for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorMap<T> {
    slots: [T; Actor::COUNT],
}

impl<T> ActorMap<T> {
    /// Builds a map by calling `f` once per actor, in slot order.
    pub fn from_fn(mut f: impl FnMut(Actor) -> T) -> Self {
        Self {
            slots: Actor::ALL.map(&mut f),
        }
    }

    /// Iterates over `(actor, value)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Actor, &T)> {
        Actor::ALL.into_iter().zip(self.slots.iter())
    }

    /// Iterates mutably over `(actor, value)` pairs in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Actor, &mut T)> {
        Actor::ALL.into_iter().zip(self.slots.iter_mut())
    }

    /// Iterates over the values in slot order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }

    /// Iterates mutably over the values in slot order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut()
    }

    /// Consumes the map, yielding the values in slot order.
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.slots.into_iter()
    }
}

impl<T> ActorMap<Option<T>> {
    /// Unwraps every slot.
    ///
    /// # Errors
    ///
    /// Returns the first actor (in slot order) whose slot is empty.
    pub fn complete(self) -> Result<ActorMap<T>, Actor> {
        match self.slots {
            [Some(grandma), Some(doctor), Some(priest)] => Ok(ActorMap {
                slots: [grandma, doctor, priest],
            }),
            [None, _, _] => Err(Actor::Grandma),
            [_, None, _] => Err(Actor::Doctor),
            [_, _, None] => Err(Actor::Priest),
        }
    }
}

impl<T> Index<Actor> for ActorMap<T> {
    type Output = T;

    fn index(&self, actor: Actor) -> &T {
        &self.slots[actor.slot()]
    }
}

impl<T> IndexMut<Actor> for ActorMap<T> {
    fn index_mut(&mut self, actor: Actor) -> &mut T {
        &mut self.slots[actor.slot()]
    }
}

/// A set of actors, e.g. those whose request completed this phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorSet {
    members: [bool; Actor::COUNT],
}

impl ActorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `actor`. Returns `false` if it was already present.
    pub fn insert(&mut self, actor: Actor) -> bool {
        let was_present = self.members[actor.slot()];
        self.members[actor.slot()] = true;
        !was_present
    }

    /// Removes `actor`. Returns `false` if it was absent.
    pub fn remove(&mut self, actor: Actor) -> bool {
        let was_present = self.members[actor.slot()];
        self.members[actor.slot()] = false;
        was_present
    }

    /// Returns `true` if `actor` is a member.
    #[must_use]
    pub fn contains(&self, actor: Actor) -> bool {
        self.members[actor.slot()]
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.members = [false; Actor::COUNT];
    }

    /// Iterates over members in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Actor> + '_ {
        Actor::ALL
            .into_iter()
            .filter(|actor| self.members[actor.slot()])
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.iter().filter(|member| **member).count()
    }

    /// Returns `true` if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Actor> for ActorSet {
    fn from_iter<I: IntoIterator<Item = Actor>>(iter: I) -> Self {
        let mut set = Self::new();
        for actor in iter {
            set.insert(actor);
        }
        set
    }
}

impl Serialize for ActorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_reports_first_missing_actor() {
        let mut partial: ActorMap<Option<u8>> = ActorMap::default();
        partial[Actor::Grandma] = Some(1);
        partial[Actor::Priest] = Some(3);
        assert_eq!(partial.clone().complete(), Err(Actor::Doctor));

        partial[Actor::Doctor] = Some(2);
        let full = partial.complete().unwrap();
        assert_eq!(full.values().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_actor_round_trips_through_str() {
        for actor in Actor::ALL {
            assert_eq!(actor.as_str().parse::<Actor>().unwrap(), actor);
        }
    }

    #[test]
    fn test_unknown_actor_name_is_rejected() {
        match "grandpa".parse::<Actor>() {
            Err(CoreError::UnknownActor(name)) => assert_eq!(name, "grandpa"),
            other => panic!("expected UnknownActor, got {other:?}"),
        }
    }

    #[test]
    fn test_initials_are_unique_and_resolvable() {
        for actor in Actor::ALL {
            assert_eq!(Actor::from_initial(actor.initial()), Some(actor));
        }
        assert_eq!(Actor::from_initial('x'), None);
    }

    #[test]
    fn test_actor_map_indexes_by_actor() {
        let mut map = ActorMap::from_fn(|actor| actor.as_str().len());
        map[Actor::Priest] += 10;

        assert_eq!(map[Actor::Grandma], 7);
        assert_eq!(map[Actor::Doctor], 6);
        assert_eq!(map[Actor::Priest], 16);
        assert_eq!(map.iter().count(), Actor::COUNT);
    }

    #[test]
    fn test_actor_set_insert_remove_clear() {
        let mut set = ActorSet::new();
        assert!(set.insert(Actor::Doctor));
        assert!(!set.insert(Actor::Doctor));
        assert!(set.insert(Actor::Grandma));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Actor::Grandma, Actor::Doctor]);

        assert!(set.remove(Actor::Grandma));
        assert!(!set.contains(Actor::Grandma));
        assert_eq!(set.len(), 1);

        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_actor_set_serializes_as_name_list() {
        let set: ActorSet = [Actor::Priest, Actor::Grandma].into_iter().collect();
        let json = serde_json::to_value(set).unwrap();
        assert_eq!(json, serde_json::json!(["grandma", "priest"]));
    }
}
