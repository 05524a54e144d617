//! Delivery resolution: turns "item handed to actor" events into request
//! transitions and cross-request cancellation.

use fairies_core::ports::ActorMotion;
use fairies_core::{Actor, ActorSet, Item};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::application::registry::ActiveRequestRegistry;
use crate::domain::request::DeliveryOutcome;
use crate::error::DeliveryError;

/// An item handed to an actor, as reported by the interaction layer.
///
/// Identities arrive unvalidated; resolution rejects unknown ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryEvent {
    /// Name of the receiving actor.
    pub receiver: String,
    /// Name of the delivered item.
    pub item: String,
}

impl DeliveryEvent {
    /// Builds an event from already-typed identities.
    #[must_use]
    pub fn new(receiver: Actor, item: Item) -> Self {
        Self {
            receiver: receiver.to_string(),
            item: item.to_string(),
        }
    }
}

/// What a successful resolution did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// The receiver.
    pub actor: Actor,
    /// The delivered item.
    pub item: Item,
    /// Classification by the receiver's request.
    pub outcome: DeliveryOutcome,
    /// Other actors whose requests became impossible as a result.
    pub cancelled: Vec<Actor>,
}

/// Resolves one delivery against the registry.
///
/// On `Complete` the receiver's request is removed (which fires the single
/// `Disappear` motion) and the receiver joins `successful`. Afterwards every
/// live request still waiting on the delivered item is marked impossible,
/// within this same call.
///
/// # Errors
///
/// Returns a `DeliveryError` for an unknown actor or item, a receiver with
/// no active request, or a request that no longer accepts deliveries. In
/// every error case no state is mutated.
pub fn handle_delivery(
    event: &DeliveryEvent,
    registry: &mut ActiveRequestRegistry,
    successful: &mut ActorSet,
) -> Result<DeliveryReport, DeliveryError> {
    info!(receiver = %event.receiver, item = %event.item, "try to deliver");

    let actor: Actor = event.receiver.parse().map_err(|_| {
        error!(receiver = %event.receiver, "tried delivering to an invalid actor");
        DeliveryError::UnknownActor(event.receiver.clone())
    })?;

    let item: Item = event.item.parse().map_err(|_| {
        error!(actor = %actor, item = %event.item, "tried delivering an invalid item");
        DeliveryError::UnknownItem {
            actor,
            item: event.item.clone(),
        }
    })?;

    let Some(request) = registry.get_mut(actor) else {
        error!(actor = %actor, item = %item, "delivery to an actor with no active request");
        return Err(DeliveryError::NoActiveRequest(actor));
    };

    let outcome = request.resolve(item).inspect_err(|e| {
        warn!(actor = %actor, item = %item, error = %e, "delivery refused");
    })?;

    match outcome {
        DeliveryOutcome::Reject => {
            warn!(actor = %actor, item = %item, "delivered item was wrong");
            registry.notify(actor, ActorMotion::Reject);
        }
        DeliveryOutcome::Partial => {
            info!(actor = %actor, item = %item, "delivered; partially complete");
            registry.notify(actor, ActorMotion::Partial);
        }
        DeliveryOutcome::Complete => {
            info!(actor = %actor, item = %item, "delivered; request complete");
            // Removal fires the one Disappear motion for this actor.
            let _ = registry.remove(actor);
            successful.insert(actor);
        }
    }

    let cancelled = registry.cancel_wanting(item);
    if !cancelled.is_empty() {
        info!(item = %item, ?cancelled, "item consumed; sibling requests now impossible");
    }

    Ok(DeliveryReport {
        actor,
        item,
        outcome,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use fairies_core::speech_queue::SpeechQueue;
    use fairies_test_support::{InMemoryCueLoader, RecordingMotionSink};

    use super::*;
    use crate::domain::obligation::RequestSpec;
    use crate::domain::request::{Request, RequestState};

    struct Fixture {
        registry: ActiveRequestRegistry,
        successful: ActorSet,
        queue: SpeechQueue,
        sink: Arc<RecordingMotionSink>,
    }

    fn fixture(specs: &[RequestSpec]) -> Fixture {
        let queue = SpeechQueue::new();
        let sink = Arc::new(RecordingMotionSink::new());
        let mut registry = ActiveRequestRegistry::new(queue.clone(), Some(sink.clone()));
        let loader = InMemoryCueLoader::permissive();
        for spec in specs {
            let mut request = Request::new(*spec).unwrap();
            request.load_cues(&loader);
            registry.add(request);
        }
        sink.clear();
        Fixture {
            registry,
            successful: ActorSet::new(),
            queue,
            sink,
        }
    }

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn test_complete_removes_request_and_records_success() {
        // Arrange
        let mut f = fixture(&[RequestSpec::single(Actor::Doctor, Item::Honey, MINUTE)]);

        // Act
        let report = handle_delivery(
            &DeliveryEvent::new(Actor::Doctor, Item::Honey),
            &mut f.registry,
            &mut f.successful,
        )
        .unwrap();

        // Assert
        assert_eq!(report.outcome, DeliveryOutcome::Complete);
        assert!(f.registry.is_empty());
        assert!(f.successful.contains(Actor::Doctor));
        assert_eq!(f.sink.motions(), vec![(Actor::Doctor, ActorMotion::Disappear)]);
        assert_eq!(f.queue.drain()[0].path(), "honey/s");
    }

    #[test]
    fn test_reject_and_partial_notify_sink() {
        let mut f = fixture(&[RequestSpec::dual(
            Actor::Grandma,
            Item::Mint,
            Item::Garlic,
            MINUTE,
        )]);

        let reject = handle_delivery(
            &DeliveryEvent::new(Actor::Grandma, Item::Salt),
            &mut f.registry,
            &mut f.successful,
        )
        .unwrap();
        let partial = handle_delivery(
            &DeliveryEvent::new(Actor::Grandma, Item::Mint),
            &mut f.registry,
            &mut f.successful,
        )
        .unwrap();

        assert_eq!(reject.outcome, DeliveryOutcome::Reject);
        assert_eq!(partial.outcome, DeliveryOutcome::Partial);
        assert_eq!(
            f.sink.motions(),
            vec![
                (Actor::Grandma, ActorMotion::Reject),
                (Actor::Grandma, ActorMotion::Partial)
            ]
        );
        assert!(f.successful.is_empty());
    }

    #[test]
    fn test_completing_one_request_cancels_sibling_wanting_same_item() {
        // Arrange
        let mut f = fixture(&[
            RequestSpec::single(Actor::Doctor, Item::Garlic, MINUTE),
            RequestSpec::dual(Actor::Priest, Item::Gunpowder, Item::Garlic, MINUTE),
            RequestSpec::single(Actor::Grandma, Item::Sage, MINUTE),
        ]);

        // Act
        let report = handle_delivery(
            &DeliveryEvent::new(Actor::Doctor, Item::Garlic),
            &mut f.registry,
            &mut f.successful,
        )
        .unwrap();

        // Assert: cancelled within the same call, before any sweep.
        assert_eq!(report.cancelled, vec![Actor::Priest]);
        assert_eq!(
            f.registry.get(Actor::Priest).unwrap().state(),
            RequestState::Impossible
        );
        assert_eq!(
            f.registry.get(Actor::Grandma).unwrap().state(),
            RequestState::Running
        );

        let reaped = f.registry.sweep_tick(Duration::ZERO);
        assert_eq!(reaped.len(), 1);
        assert_eq!(reaped[0].actor, Actor::Priest);
    }

    #[test]
    fn test_fulfilled_half_is_not_cancelled_by_sibling_delivery() {
        let mut f = fixture(&[
            RequestSpec::dual(Actor::Priest, Item::Gunpowder, Item::Garlic, MINUTE),
            RequestSpec::dual(Actor::Grandma, Item::Mint, Item::Garlic, MINUTE),
        ]);
        handle_delivery(
            &DeliveryEvent::new(Actor::Priest, Item::Garlic),
            &mut f.registry,
            &mut f.successful,
        )
        .unwrap();

        assert_eq!(
            f.registry.get(Actor::Grandma).unwrap().state(),
            RequestState::Impossible
        );
        assert_eq!(
            f.registry.get(Actor::Priest).unwrap().state(),
            RequestState::Running
        );
    }

    #[test]
    fn test_unknown_actor_is_ignored() {
        let mut f = fixture(&[RequestSpec::single(Actor::Doctor, Item::Honey, MINUTE)]);
        let event = DeliveryEvent {
            receiver: "grandpa".to_owned(),
            item: "honey".to_owned(),
        };

        let result = handle_delivery(&event, &mut f.registry, &mut f.successful);

        assert_eq!(result, Err(DeliveryError::UnknownActor("grandpa".to_owned())));
        assert_eq!(
            f.registry.get(Actor::Doctor).unwrap().state(),
            RequestState::Running
        );
        assert!(f.queue.is_empty());
    }

    #[test]
    fn test_unknown_item_is_ignored() {
        let mut f = fixture(&[RequestSpec::single(Actor::Doctor, Item::Honey, MINUTE)]);
        let event = DeliveryEvent {
            receiver: "doctor".to_owned(),
            item: "nothing".to_owned(),
        };

        let result = handle_delivery(&event, &mut f.registry, &mut f.successful);

        assert!(matches!(result, Err(DeliveryError::UnknownItem { .. })));
        assert!(f.sink.motions().is_empty());
    }

    #[test]
    fn test_delivery_without_active_request_is_ignored() {
        let mut f = fixture(&[RequestSpec::single(Actor::Doctor, Item::Honey, MINUTE)]);

        let result = handle_delivery(
            &DeliveryEvent::new(Actor::Priest, Item::Honey),
            &mut f.registry,
            &mut f.successful,
        );

        assert_eq!(result, Err(DeliveryError::NoActiveRequest(Actor::Priest)));
        assert_eq!(
            f.registry.get(Actor::Doctor).unwrap().state(),
            RequestState::Running
        );
    }
}
