//! Registry of live requests, at most one per actor.

use std::sync::Arc;
use std::time::Duration;

use fairies_core::Actor;
use fairies_core::ActorMap;
use fairies_core::Item;
use fairies_core::ports::{ActorMotion, MotionSink};
use fairies_core::speech_queue::SpeechQueue;
use tracing::{error, info};

use crate::domain::request::{Request, RequestState, RequestView};
use crate::error::{RegistryError, RequestError};

/// A request removed from the registry during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    /// The requester.
    pub actor: Actor,
    /// The terminal state that caused the removal.
    pub state: RequestState,
}

/// The set of live requests.
///
/// Owns each request's subscription to the speech queue: a request is
/// subscribed when added and unsubscribed exactly once when removed.
/// Removed requests are parked in a retired list until the phase hands
/// them back for cue unloading.
pub struct ActiveRequestRegistry {
    entries: ActorMap<Option<Request>>,
    speech: SpeechQueue,
    motion: Option<Arc<dyn MotionSink>>,
    retired: Vec<Request>,
}

impl ActiveRequestRegistry {
    /// Creates an empty registry that subscribes requests to `speech` and
    /// reports appear/disappear motions to `motion`.
    #[must_use]
    pub fn new(speech: SpeechQueue, motion: Option<Arc<dyn MotionSink>>) -> Self {
        Self {
            entries: ActorMap::default(),
            speech,
            motion,
            retired: Vec::new(),
        }
    }

    /// Registers `request` under its requester.
    ///
    /// An existing entry for the same actor is replaced (and retired); this
    /// is logged as a likely caller bug. Returns `true` for a fresh insert,
    /// which is also the only case that fires an `Appear` motion.
    pub fn add(&mut self, mut request: Request) -> bool {
        let actor = request.requester();
        request.subscribe(self.speech.clone());

        if let Some(mut previous) = self.entries[actor].replace(request) {
            error!(
                actor = %actor,
                active = self.len(),
                replaced = %previous,
                "actor already had an active request; replacing it"
            );
            previous.unsubscribe();
            self.retired.push(previous);
            return false;
        }

        info!(actor = %actor, "request registered");
        self.notify(actor, ActorMotion::Appear);
        true
    }

    /// Removes the request for `actor`, unsubscribing it and firing a
    /// `Disappear` motion. Cues are not unloaded here.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotRegistered` (after logging) if the actor
    /// has no entry.
    pub fn remove(&mut self, actor: Actor) -> Result<(), RegistryError> {
        let Some(mut request) = self.entries[actor].take() else {
            error!(
                actor = %actor,
                active = self.len(),
                "asked to remove a request that is not active"
            );
            return Err(RegistryError::NotRegistered(actor));
        };

        request.unsubscribe();
        info!(request = %request, state = ?request.state(), "request removed");
        self.retired.push(request);
        self.notify(actor, ActorMotion::Disappear);
        Ok(())
    }

    /// Ticks every live request, then removes those that timed out or became
    /// impossible. Removal happens only after the full pass.
    pub fn sweep_tick(&mut self, dt: Duration) -> Vec<Reaped> {
        let mut reaped = Vec::new();

        for (actor, slot) in self.entries.iter_mut() {
            let Some(request) = slot.as_mut() else {
                continue;
            };
            match request.tick(dt) {
                Ok(state) if state.must_be_reaped() => reaped.push(Reaped { actor, state }),
                Ok(_) => {}
                Err(RequestError::CuesNotLoaded) => {
                    error!(request = %request, "request's cues have not been loaded");
                }
                Err(e) => error!(request = %request, error = %e, "request tick failed"),
            }
        }

        for entry in &reaped {
            // Presence is guaranteed: nothing else mutates the map mid-sweep.
            let _ = self.remove(entry.actor);
        }
        reaped
    }

    /// Marks every live request still waiting on `item` as impossible and
    /// returns the affected actors.
    pub fn cancel_wanting(&mut self, item: Item) -> Vec<Actor> {
        let mut cancelled = Vec::new();
        for (actor, slot) in self.entries.iter_mut() {
            if let Some(request) = slot.as_mut()
                && request.wants_item(item)
                && request.mark_impossible()
            {
                cancelled.push(actor);
            }
        }
        cancelled
    }

    /// The live request for `actor`.
    #[must_use]
    pub fn get(&self, actor: Actor) -> Option<&Request> {
        self.entries[actor].as_ref()
    }

    /// The live request for `actor`, mutably.
    pub fn get_mut(&mut self, actor: Actor) -> Option<&mut Request> {
        self.entries[actor].as_mut()
    }

    /// Returns `true` if `actor` has a live request.
    #[must_use]
    pub fn contains(&self, actor: Actor) -> bool {
        self.entries[actor].is_some()
    }

    /// Number of live requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if no request is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Views of the live requests, in actor order.
    #[must_use]
    pub fn views(&self) -> Vec<RequestView> {
        self.entries.values().flatten().map(Request::view).collect()
    }

    /// Hands back every removed or replaced request since the last call.
    pub fn take_retired(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.retired)
    }

    /// Sends `motion` for `actor` to the motion sink, if one is bound.
    pub fn notify(&self, actor: Actor, motion: ActorMotion) {
        match &self.motion {
            Some(sink) => sink.handle_actor_motion(actor, motion),
            None => error!(actor = %actor, ?motion, "no motion sink bound; notification dropped"),
        }
    }
}

impl std::fmt::Debug for ActiveRequestRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRequestRegistry")
            .field("entries", &self.entries)
            .field("retired", &self.retired.len())
            .field("motion_bound", &self.motion.is_some())
            .finish_non_exhaustive()
    }
}
