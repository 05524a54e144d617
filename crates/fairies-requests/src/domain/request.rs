//! The request state machine: one actor's timed obligation.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use fairies_core::ports::CueLoader;
use fairies_core::speech_queue::SpeechQueue;
use fairies_core::{Actor, Cue, Item};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::obligation::{CueKind, MatchPolicy, Obligation, RequestSpec};
use crate::error::RequestError;

/// Fraction of the deadline after which the first reminder is due.
const FIRST_REMINDER_AT: f64 = 0.33;
/// Fraction of the deadline after which the last call is due.
const SECOND_REMINDER_AT: f64 = 0.67;

/// Lifecycle state of a request.
///
/// `Completed`, `TimedOut` and `Impossible` are terminal: once entered, no
/// operation leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Unloaded,
    Running,
    TimedOut,
    Impossible,
    Completed,
}

impl RequestState {
    /// Returns `true` for states no operation can leave.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestState::TimedOut | RequestState::Impossible | RequestState::Completed
        )
    }

    /// Returns `true` for the outcomes the registry must reap on its own.
    #[must_use]
    pub fn must_be_reaped(self) -> bool {
        matches!(self, RequestState::TimedOut | RequestState::Impossible)
    }
}

/// Classification of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// Wrong item; nothing changed.
    Reject,
    /// One of two items accepted.
    Partial,
    /// The obligation is satisfied.
    Complete,
}

/// Read-only view of a request for snapshots and debug display.
#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    /// The actor asking.
    pub requester: Actor,
    /// The request key (`<a>` or `<a>_<b>`).
    pub key: String,
    /// Current lifecycle state.
    pub state: RequestState,
    /// Seconds accumulated on the deadline timer.
    pub elapsed_secs: f64,
    /// The deadline in seconds.
    pub max_duration_secs: f64,
    /// Whether the first item has been delivered.
    pub fulfilled_a: bool,
    /// Whether the second item has been delivered.
    pub fulfilled_b: bool,
}

/// One actor's live obligation.
#[derive(Debug)]
pub struct Request {
    spec: RequestSpec,
    key: String,
    state: RequestState,
    elapsed: Duration,
    fulfilled_a: bool,
    fulfilled_b: bool,
    initial_sent: bool,
    first_reminder_sent: bool,
    second_reminder_sent: bool,
    cues: BTreeMap<CueKind, Cue>,
    cues_loaded: bool,
    /// Emission channel, present while the registry holds the request.
    outbox: Option<SpeechQueue>,
}

impl Request {
    /// Builds an unloaded request from its authored spec.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::InvalidObligation` if the spec is unsatisfiable.
    pub fn new(spec: RequestSpec) -> Result<Self, RequestError> {
        spec.validate()?;
        let key = spec.obligation.key();
        let cues = spec
            .cue_kinds()
            .iter()
            .map(|kind| {
                let path = format!("{key}/{}", kind.suffix());
                (*kind, Cue::new(spec.requester, path))
            })
            .collect();

        Ok(Self {
            spec,
            key,
            state: RequestState::Unloaded,
            elapsed: Duration::ZERO,
            fulfilled_a: false,
            fulfilled_b: false,
            initial_sent: false,
            first_reminder_sent: false,
            second_reminder_sent: false,
            cues,
            cues_loaded: false,
            outbox: None,
        })
    }

    /// The actor asking.
    #[must_use]
    pub fn requester(&self) -> Actor {
        self.spec.requester
    }

    /// The obligation.
    #[must_use]
    pub fn obligation(&self) -> Obligation {
        self.spec.obligation
    }

    /// The request key, also the cue directory.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Time accumulated on the deadline timer.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The deadline.
    #[must_use]
    pub fn max_duration(&self) -> Duration {
        self.spec.max_duration
    }

    /// Number of cues this request owns.
    #[must_use]
    pub fn cue_count(&self) -> usize {
        self.cues.len()
    }

    /// The cue for `kind`, if this request's arity has one.
    #[must_use]
    pub fn cue(&self, kind: CueKind) -> Option<&Cue> {
        self.cues.get(&kind)
    }

    /// Returns `true` once cues have been loaded (and not yet unloaded).
    #[must_use]
    pub fn cues_loaded(&self) -> bool {
        self.cues_loaded
    }

    /// Returns `true` while an emission channel is attached.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.outbox.is_some()
    }

    /// Resolves every cue and moves an unloaded request to `Running`.
    /// Returns `false` if any cue asset was missing; the request still runs
    /// and the missing cues are skipped at dispatch.
    pub fn load_cues(&mut self, loader: &dyn CueLoader) -> bool {
        let mut all_found = true;
        for cue in self.cues.values_mut() {
            all_found &= cue.load(loader);
        }
        self.cues_loaded = true;
        if self.state == RequestState::Unloaded {
            self.state = RequestState::Running;
        }
        info!(request = %self, "loaded cues");
        all_found
    }

    /// Releases every cue asset. Subsequent ticks report `CuesNotLoaded`.
    pub fn unload_cues(&mut self, loader: &dyn CueLoader) {
        for cue in self.cues.values_mut() {
            cue.unload(loader);
        }
        self.cues_loaded = false;
        info!(request = %self, "unloaded cues");
    }

    /// Attaches the emission channel cues are pushed onto.
    pub fn subscribe(&mut self, queue: SpeechQueue) {
        self.outbox = Some(queue);
    }

    /// Detaches the emission channel. Returns `false` if none was attached.
    pub fn unsubscribe(&mut self) -> bool {
        self.outbox.take().is_some()
    }

    /// Advances the deadline timer by `dt`, emitting initial, reminder and
    /// timeout cues as they fall due.
    ///
    /// Terminal requests are left untouched and report their state.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::CuesNotLoaded` if called before `load_cues`.
    pub fn tick(&mut self, dt: Duration) -> Result<RequestState, RequestError> {
        if !self.cues_loaded {
            return Err(RequestError::CuesNotLoaded);
        }
        if self.state != RequestState::Running {
            return Ok(self.state);
        }

        self.elapsed += dt;

        if self.elapsed >= self.spec.max_duration {
            let timeout = self.by_outstanding(CueKind::Timeout, CueKind::TimeoutA, CueKind::TimeoutB);
            self.emit(timeout);

            if self.spec.restart_on_timeout {
                info!(request = %self, "timed out, restarting");
                self.restart();
                return Ok(RequestState::Running);
            }

            info!(request = %self, "timed out, ending");
            self.state = RequestState::TimedOut;
            return Ok(self.state);
        }

        if !self.initial_sent {
            self.emit(CueKind::Initial);
            self.initial_sent = true;
        }

        if !self.first_reminder_sent
            && self.elapsed > self.spec.max_duration.mul_f64(FIRST_REMINDER_AT)
        {
            let reminder =
                self.by_outstanding(CueKind::Reminder1, CueKind::Reminder1A, CueKind::Reminder1B);
            self.emit(reminder);
            self.first_reminder_sent = true;
        }

        if !self.second_reminder_sent
            && self.elapsed > self.spec.max_duration.mul_f64(SECOND_REMINDER_AT)
        {
            let reminder =
                self.by_outstanding(CueKind::Reminder2, CueKind::Reminder2A, CueKind::Reminder2B);
            self.emit(reminder);
            self.second_reminder_sent = true;
        }

        Ok(RequestState::Running)
    }

    /// Classifies a delivered `candidate` against the obligation, emitting the
    /// matching success, partial or wrong-item cue.
    ///
    /// # Errors
    ///
    /// Returns `RequestError::NotRunning` if the request is not `Running`.
    pub fn resolve(&mut self, candidate: Item) -> Result<DeliveryOutcome, RequestError> {
        if self.state != RequestState::Running {
            return Err(RequestError::NotRunning(self.state));
        }

        let outcome = match (self.spec.obligation, self.spec.policy) {
            (Obligation::Single(item), MatchPolicy::Identity) => {
                if candidate == item {
                    self.emit(CueKind::Success);
                    DeliveryOutcome::Complete
                } else {
                    self.emit(CueKind::Wrong);
                    DeliveryOutcome::Reject
                }
            }
            (Obligation::Single(item), MatchPolicy::ItemType) => {
                if candidate == item {
                    self.emit(CueKind::Success);
                    DeliveryOutcome::Complete
                } else if candidate.is_same_type_as(item) {
                    self.emit(CueKind::WrongQuantity);
                    DeliveryOutcome::Reject
                } else {
                    self.emit(CueKind::WrongType);
                    DeliveryOutcome::Reject
                }
            }
            (Obligation::Dual(a, b), _) => self.resolve_dual(a, b, candidate),
        };

        if outcome == DeliveryOutcome::Complete {
            self.state = RequestState::Completed;
        }
        debug!(request = %self, item = %candidate, ?outcome, "resolved delivery");
        Ok(outcome)
    }

    fn resolve_dual(&mut self, a: Item, b: Item, candidate: Item) -> DeliveryOutcome {
        if candidate == a {
            self.fulfilled_a = true;
            if self.fulfilled_b {
                self.emit(CueKind::Success);
                return DeliveryOutcome::Complete;
            }
            self.emit(CueKind::SuccessA);
            return DeliveryOutcome::Partial;
        }

        if candidate == b {
            self.fulfilled_b = true;
            if self.fulfilled_a {
                self.emit(CueKind::Success);
                return DeliveryOutcome::Complete;
            }
            self.emit(CueKind::SuccessB);
            return DeliveryOutcome::Partial;
        }

        let wrong = if !self.fulfilled_a && !self.fulfilled_b {
            CueKind::Wrong
        } else if !self.fulfilled_a {
            CueKind::WrongB
        } else {
            CueKind::WrongA
        };
        self.emit(wrong);
        DeliveryOutcome::Reject
    }

    /// Returns `true` if the request is running and still waiting on `item`.
    #[must_use]
    pub fn wants_item(&self, item: Item) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match self.spec.obligation {
            Obligation::Single(wanted) => wanted == item,
            Obligation::Dual(a, b) => {
                (a == item && !self.fulfilled_a) || (b == item && !self.fulfilled_b)
            }
        }
    }

    /// Forces the request into `Impossible`. Returns `false` (and changes
    /// nothing) if it was already terminal.
    pub fn mark_impossible(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        info!(request = %self, "marked impossible");
        self.state = RequestState::Impossible;
        true
    }

    /// Read-only view for snapshots.
    #[must_use]
    pub fn view(&self) -> RequestView {
        RequestView {
            requester: self.spec.requester,
            key: self.key.clone(),
            state: self.state,
            elapsed_secs: self.elapsed.as_secs_f64(),
            max_duration_secs: self.spec.max_duration.as_secs_f64(),
            fulfilled_a: self.fulfilled_a,
            fulfilled_b: self.fulfilled_b,
        }
    }

    /// Picks the full, only-A-outstanding or only-B-outstanding variant.
    fn by_outstanding(&self, full: CueKind, only_a: CueKind, only_b: CueKind) -> CueKind {
        if !matches!(self.spec.obligation, Obligation::Dual(..)) {
            return full;
        }
        match (self.fulfilled_a, self.fulfilled_b) {
            (false, true) => only_a,
            (true, false) => only_b,
            _ => full,
        }
    }

    fn restart(&mut self) {
        self.elapsed = Duration::ZERO;
        self.fulfilled_a = false;
        self.fulfilled_b = false;
        self.initial_sent = false;
        self.first_reminder_sent = false;
        self.second_reminder_sent = false;
    }

    fn emit(&self, kind: CueKind) {
        let Some(cue) = self.cues.get(&kind) else {
            warn!(request = %self, ?kind, "request has no cue of this kind");
            return;
        };
        match &self.outbox {
            Some(queue) => {
                debug!(cue = %cue, "queued for play");
                queue.push(cue.clone());
            }
            None => warn!(request = %self, cue = %cue, "no subscriber; cue dropped"),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.cues_loaded { "LOADED" } else { "UNLOADED" };
        write!(
            f,
            "{}_{}_{}_{status}",
            self.spec.requester,
            self.key,
            self.spec.max_duration.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairies_test_support::InMemoryCueLoader;

    const STEP: Duration = Duration::from_millis(200);

    fn paths(queue: &SpeechQueue) -> Vec<String> {
        queue.drain().iter().map(|cue| cue.path().to_owned()).collect()
    }

    fn running(spec: RequestSpec) -> (Request, SpeechQueue) {
        let loader = InMemoryCueLoader::permissive();
        let queue = SpeechQueue::new();
        let mut request = Request::new(spec).unwrap();
        request.load_cues(&loader);
        request.subscribe(queue.clone());
        (request, queue)
    }

    fn dual() -> (Request, SpeechQueue) {
        running(RequestSpec::dual(
            Actor::Priest,
            Item::Gunpowder,
            Item::Garlic,
            Duration::from_secs(60),
        ))
    }

    #[test]
    fn test_new_request_owns_cues_under_its_key() {
        let request = Request::new(RequestSpec::single(
            Actor::Doctor,
            Item::Chamomile,
            Duration::from_secs(60),
        ))
        .unwrap();

        assert_eq!(request.state(), RequestState::Unloaded);
        assert_eq!(request.cue_count(), 6);
        assert_eq!(
            request.cue(CueKind::Initial).unwrap().resource_path(),
            "doctor/chamomile/r0"
        );
        assert!(request.cue(CueKind::SuccessA).is_none());
    }

    #[test]
    fn test_tick_before_load_reports_cues_not_loaded() {
        let mut request = Request::new(RequestSpec::single(
            Actor::Doctor,
            Item::Oil,
            Duration::from_secs(30),
        ))
        .unwrap();

        assert_eq!(request.tick(STEP), Err(RequestError::CuesNotLoaded));
        assert_eq!(request.elapsed(), Duration::ZERO);
    }

    #[test]
    fn test_initial_cue_fires_once_on_first_tick() {
        let (mut request, queue) = dual();

        request.tick(STEP).unwrap();
        request.tick(STEP).unwrap();

        assert_eq!(paths(&queue), vec!["gunpowder_garlic/r0"]);
    }

    #[test]
    fn test_reminders_fire_once_strictly_past_thresholds() {
        // Arrange
        let (mut request, queue) = dual();
        let _ = queue.drain();

        // Act / Assert: 99 steps of 0.2s land exactly on 19.8s.
        for _ in 0..99 {
            request.tick(STEP).unwrap();
        }
        let _ = queue.drain();
        assert_eq!(request.elapsed(), Duration::from_millis(19_800));

        request.tick(STEP).unwrap();
        assert_eq!(paths(&queue), vec!["gunpowder_garlic/r1"]);

        // 40.2s is reached after 201 steps; the next step crosses it.
        for _ in 100..201 {
            request.tick(STEP).unwrap();
        }
        assert!(paths(&queue).is_empty());
        request.tick(STEP).unwrap();
        assert_eq!(paths(&queue), vec!["gunpowder_garlic/r2"]);

        for _ in 0..50 {
            request.tick(STEP).unwrap();
        }
        assert!(paths(&queue).is_empty());
    }

    #[test]
    fn test_reminder_variant_follows_outstanding_item() {
        let (mut request, queue) = dual();
        request.tick(STEP).unwrap();
        request.resolve(Item::Garlic).unwrap();
        let _ = queue.drain();

        request.tick(Duration::from_secs(21)).unwrap();

        assert_eq!(paths(&queue), vec!["gunpowder_garlic/r1_a"]);
    }

    #[test]
    fn test_timeout_emits_cue_and_becomes_terminal() {
        let (mut request, queue) = running(RequestSpec::single(
            Actor::Doctor,
            Item::Honey,
            Duration::from_secs(30),
        ));

        for _ in 0..29 {
            assert_eq!(request.tick(Duration::from_secs(1)).unwrap(), RequestState::Running);
        }
        let _ = queue.drain();
        assert_eq!(
            request.tick(Duration::from_secs(1)).unwrap(),
            RequestState::TimedOut
        );
        assert_eq!(paths(&queue), vec!["honey/t"]);

        assert_eq!(
            request.tick(Duration::from_secs(1)).unwrap(),
            RequestState::TimedOut
        );
        assert!(paths(&queue).is_empty());
    }

    #[test]
    fn test_timeout_variant_names_missing_item() {
        let (mut request, queue) = dual();
        request.tick(STEP).unwrap();
        request.resolve(Item::Gunpowder).unwrap();
        let _ = queue.drain();

        request.tick(Duration::from_secs(60)).unwrap();

        assert_eq!(paths(&queue), vec!["gunpowder_garlic/t_b"]);
        assert_eq!(request.state(), RequestState::TimedOut);
    }

    #[test]
    fn test_restarting_request_resets_timer_and_flags() {
        let (mut request, queue) = running(
            RequestSpec::single(Actor::Grandma, Item::Sideritis, Duration::from_secs(30))
                .restarting(),
        );

        request.tick(Duration::from_secs(25)).unwrap();
        let _ = queue.drain();

        assert_eq!(
            request.tick(Duration::from_secs(5)).unwrap(),
            RequestState::Running
        );
        assert_eq!(paths(&queue), vec!["sideritis/t"]);
        assert_eq!(request.elapsed(), Duration::ZERO);

        request.tick(STEP).unwrap();
        assert_eq!(paths(&queue), vec!["sideritis/r0"]);
    }

    #[test]
    fn test_single_identity_resolution() {
        let (mut request, queue) = running(RequestSpec::single(
            Actor::Doctor,
            Item::Chamomile,
            Duration::from_secs(60),
        ));

        assert_eq!(request.resolve(Item::Honey).unwrap(), DeliveryOutcome::Reject);
        assert_eq!(request.state(), RequestState::Running);
        assert_eq!(
            request.resolve(Item::Chamomile).unwrap(),
            DeliveryOutcome::Complete
        );
        assert_eq!(request.state(), RequestState::Completed);
        assert_eq!(paths(&queue), vec!["chamomile/w", "chamomile/s"]);
    }

    #[test]
    fn test_dual_partial_then_complete() {
        let (mut request, queue) = dual();

        assert_eq!(
            request.resolve(Item::Gunpowder).unwrap(),
            DeliveryOutcome::Partial
        );
        assert_eq!(
            request.resolve(Item::Garlic).unwrap(),
            DeliveryOutcome::Complete
        );
        assert_eq!(
            paths(&queue),
            vec!["gunpowder_garlic/s_a", "gunpowder_garlic/s"]
        );
    }

    #[test]
    fn test_dual_repeated_half_stays_partial() {
        let (mut request, _queue) = dual();

        assert_eq!(
            request.resolve(Item::Gunpowder).unwrap(),
            DeliveryOutcome::Partial
        );
        assert_eq!(
            request.resolve(Item::Gunpowder).unwrap(),
            DeliveryOutcome::Partial
        );
        assert_eq!(request.state(), RequestState::Running);
        assert!(!request.wants_item(Item::Gunpowder));
        assert!(request.wants_item(Item::Garlic));
    }

    #[test]
    fn test_dual_wrong_item_variants() {
        let (mut request, queue) = dual();

        request.resolve(Item::Hay).unwrap();
        request.resolve(Item::Garlic).unwrap();
        request.resolve(Item::Hay).unwrap();

        let (mut other, other_queue) = dual();
        other.resolve(Item::Gunpowder).unwrap();
        other.resolve(Item::Hay).unwrap();

        assert_eq!(
            paths(&queue),
            vec![
                "gunpowder_garlic/w",
                "gunpowder_garlic/s_b",
                "gunpowder_garlic/w_b"
            ]
        );
        assert_eq!(
            paths(&other_queue),
            vec!["gunpowder_garlic/s_a", "gunpowder_garlic/w_a"]
        );
    }

    #[test]
    fn test_item_type_policy_distinguishes_quantity_from_type() {
        let (mut request, queue) = running(
            RequestSpec::single(Actor::Priest, Item::Oil, Duration::from_secs(45)).by_item_type(),
        );

        assert_eq!(request.cue_count(), 7);
        assert_eq!(request.resolve(Item::Salt).unwrap(), DeliveryOutcome::Reject);
        assert_eq!(request.resolve(Item::Basil).unwrap(), DeliveryOutcome::Reject);
        assert_eq!(request.resolve(Item::Oil).unwrap(), DeliveryOutcome::Complete);
        assert_eq!(paths(&queue), vec!["oil/wq", "oil/wt", "oil/s"]);
    }

    #[test]
    fn test_terminal_states_are_never_left() {
        let (mut request, queue) = dual();
        assert!(request.mark_impossible());
        let _ = queue.drain();

        assert!(!request.mark_impossible());
        assert_eq!(request.tick(Duration::from_secs(120)).unwrap(), RequestState::Impossible);
        assert_eq!(
            request.resolve(Item::Garlic),
            Err(RequestError::NotRunning(RequestState::Impossible))
        );
        assert!(!request.wants_item(Item::Garlic));
        assert!(paths(&queue).is_empty());
    }

    #[test]
    fn test_unsubscribed_request_drops_cues() {
        let (mut request, queue) = dual();
        assert!(request.unsubscribe());
        assert!(!request.unsubscribe());

        request.tick(STEP).unwrap();

        assert!(queue.is_empty());
    }

    #[test]
    fn test_unload_releases_assets_and_blocks_ticks() {
        let loader = InMemoryCueLoader::permissive();
        let mut request = Request::new(RequestSpec::dual(
            Actor::Grandma,
            Item::Mint,
            Item::Garlic,
            Duration::from_secs(60),
        ))
        .unwrap();
        request.load_cues(&loader);
        assert_eq!(loader.loaded_count(), 16);

        request.unload_cues(&loader);

        assert_eq!(loader.loaded_count(), 0);
        assert_eq!(request.tick(STEP), Err(RequestError::CuesNotLoaded));
        assert_eq!(request.state(), RequestState::Running);
    }

    #[test]
    fn test_display_describes_request() {
        let (request, _queue) = dual();
        assert_eq!(request.to_string(), "priest_gunpowder_garlic_60_LOADED");
    }
}
