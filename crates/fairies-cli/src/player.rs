//! A simulated player that hands items to actors at random.

use std::time::Duration;

use fairies_core::rng::DeterministicRng;
use fairies_core::{Actor, Item};
use fairies_requests::application::delivery::DeliveryEvent;
use fairies_requests::application::registry::ActiveRequestRegistry;
use fairies_requests::domain::obligation::Obligation;
use fairies_requests::domain::request::{Request, RequestState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Chance that a delivery carries an item the receiver is waiting on.
const ACCURACY: f64 = 0.75;

/// Seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct SeededRng(StdRng);

impl SeededRng {
    /// A generator that yields the same sequence for the same `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl DeterministicRng for SeededRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.random()
    }
}

/// Delivers one item every `interval` to an actor with a running request.
///
/// Usually the item is one the actor is still waiting on; otherwise it is
/// any item at all.
pub struct RandomPlayer {
    rng: Box<dyn DeterministicRng>,
    interval: Duration,
    waited: Duration,
}

impl RandomPlayer {
    /// A player acting once per `interval` of simulated time.
    #[must_use]
    pub fn new(rng: Box<dyn DeterministicRng>, interval: Duration) -> Self {
        Self {
            rng,
            interval,
            waited: Duration::ZERO,
        }
    }

    /// Advances the player by `dt` and returns its next delivery, if due.
    pub fn poll(&mut self, dt: Duration, registry: &ActiveRequestRegistry) -> Option<DeliveryEvent> {
        self.waited += dt;
        if self.waited < self.interval {
            return None;
        }
        self.waited = Duration::ZERO;

        let running: Vec<&Request> = Actor::ALL
            .into_iter()
            .filter_map(|actor| registry.get(actor))
            .filter(|request| request.state() == RequestState::Running)
            .collect();
        let request = *self.pick(&running)?;

        let item = match outstanding(request) {
            Some(item) if self.rng.next_f64() < ACCURACY => item,
            _ => self.pick(&Item::ALL).copied()?,
        };
        Some(DeliveryEvent::new(request.requester(), item))
    }

    fn pick<'a, T>(&mut self, choices: &'a [T]) -> Option<&'a T> {
        let last = u32::try_from(choices.len().checked_sub(1)?).unwrap_or(u32::MAX);
        let index = usize::try_from(self.rng.next_u32_range(0, last)).ok()?;
        choices.get(index)
    }
}

impl std::fmt::Debug for RandomPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomPlayer")
            .field("interval", &self.interval)
            .field("waited", &self.waited)
            .finish_non_exhaustive()
    }
}

fn outstanding(request: &Request) -> Option<Item> {
    let view = request.view();
    match request.obligation() {
        Obligation::Single(item) => Some(item),
        Obligation::Dual(a, _) if !view.fulfilled_a => Some(a),
        Obligation::Dual(_, b) if !view.fulfilled_b => Some(b),
        Obligation::Dual(..) => None,
    }
}
