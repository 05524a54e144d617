//! Session composition: one deterministic tick loop over every process.

use std::sync::Arc;
use std::time::Duration;

use fairies_core::clock::{Clock, SystemClock};
use fairies_core::ports::{AudioChannel, CueLoader, MotionSink, ResetHook};
use fairies_core::speech_queue::SpeechQueue;
use fairies_core::{Actor, ActorMap, ActorSet};
use fairies_narrative::application::sequencer::{PhaseContext, PhaseSequencer, SequencerState};
use fairies_narrative::domain::phase::{PHASES, Phase, PhaseKey};
use fairies_requests::application::delivery::{DeliveryEvent, DeliveryReport, handle_delivery};
use fairies_requests::application::registry::ActiveRequestRegistry;
use fairies_requests::error::DeliveryError;
use fairies_speech::application::arbitrator::SpeechArbitrator;
use tracing::{Span, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::domain::events::{EventMetadata, SessionEvent, SessionEventKind};
use crate::domain::snapshot::SessionSnapshot;
use crate::domain::watchdog::PauseWatchdog;
use crate::error::SessionError;

/// A running game.
///
/// Each [`Session::tick`] re-enters every process once, always in the same
/// order: registry sweep, speech dispatch and silence tracking, phase
/// sequencer, pause watchdog. Deliveries are resolved synchronously between
/// ticks.
pub struct Session {
    id: Uuid,
    span: Span,
    clock: Arc<dyn Clock>,
    loader: Arc<dyn CueLoader>,
    reset_hook: Option<Arc<dyn ResetHook>>,
    registry: ActiveRequestRegistry,
    speech: SpeechArbitrator,
    sequencer: PhaseSequencer,
    successful: ActorSet,
    watchdog: PauseWatchdog,
    paused: bool,
    elapsed: Duration,
    journal: Vec<SessionEvent>,
    next_sequence: i64,
}

impl Session {
    /// Starts building a session with `config`.
    #[must_use]
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
    }

    /// The session identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Advances every process by `dt` (or by nothing while paused) and
    /// returns where the sequencer ended up.
    pub fn tick(&mut self, dt: Duration) -> SequencerState {
        let span = self.span.clone();
        let _entered = span.enter();

        let dt = if self.paused { Duration::ZERO } else { dt };
        self.elapsed += dt;

        for reaped in self.registry.sweep_tick(dt) {
            self.record(SessionEventKind::RequestReaped {
                actor: reaped.actor,
                state: reaped.state,
            });
        }

        self.speech.update(dt);

        let events = self.sequencer.step(
            dt,
            &mut PhaseContext {
                registry: &mut self.registry,
                speech: &self.speech,
                loader: self.loader.as_ref(),
                successful: &mut self.successful,
            },
        );
        for event in events {
            self.record(event.into());
        }

        if let Some(held) = self.watchdog.poll(self.clock.now()) {
            warn!(paused_secs = held.as_secs_f64(), "pause held too long; resetting session");
            match &self.reset_hook {
                Some(hook) => hook.reset(),
                None => error!("no reset hook bound; reset dropped"),
            }
            self.record(SessionEventKind::PauseReset {
                paused_secs: held.as_secs_f64(),
            });
        }

        self.sequencer.state()
    }

    /// Resolves one delivery against the live requests.
    ///
    /// # Errors
    ///
    /// Returns the `DeliveryError` from resolution; the refusal is journaled
    /// and no state changes.
    pub fn deliver(&mut self, event: &DeliveryEvent) -> Result<DeliveryReport, DeliveryError> {
        let span = self.span.clone();
        let _entered = span.enter();

        match handle_delivery(event, &mut self.registry, &mut self.successful) {
            Ok(report) => {
                self.record(SessionEventKind::DeliveryResolved {
                    actor: report.actor,
                    item: report.item,
                    outcome: report.outcome,
                    cancelled: report.cancelled.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                self.record(SessionEventKind::DeliveryIgnored {
                    receiver: event.receiver.clone(),
                    item: event.item.clone(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Freezes or unfreezes simulated time.
    pub fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.watchdog.pause(self.clock.now());
        } else {
            self.watchdog.resume();
        }
        info!(session_id = %self.id, paused, "pause toggled");
        self.record(SessionEventKind::PauseChanged { paused });
    }

    /// Returns `true` while simulated time is frozen.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Returns `true` once the last phase ended in terminate mode.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.sequencer.is_finished()
    }

    /// The phase being played.
    #[must_use]
    pub fn current_phase(&self) -> Option<PhaseKey> {
        self.sequencer.current_phase()
    }

    /// Where the sequencer is within the phase.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.sequencer.state()
    }

    /// Simulated time since the session started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The live requests.
    #[must_use]
    pub fn registry(&self) -> &ActiveRequestRegistry {
        &self.registry
    }

    /// Actors whose request completed in the current cycle.
    #[must_use]
    pub fn successful(&self) -> ActorSet {
        self.successful
    }

    /// Captures the observable state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            elapsed_secs: self.elapsed.as_secs_f64(),
            phase: self.sequencer.current_phase(),
            state: self.sequencer.state(),
            requests: self.registry.views(),
            pending_speech: self.speech.pending(),
            speech: self.speech.status(),
            silence_secs: self.speech.silence().as_secs_f64(),
            successful: self.successful,
            paused: self.paused,
        }
    }

    /// Hands over every journal event recorded since the last call.
    pub fn drain_journal(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.journal)
    }

    fn record(&mut self, kind: SessionEventKind) {
        let metadata = EventMetadata {
            event_id: Uuid::new_v4(),
            event_type: kind.event_type(),
            session_id: self.id,
            sequence_number: self.next_sequence,
            at_secs: self.elapsed.as_secs_f64(),
            occurred_at: self.clock.now(),
        };
        self.next_sequence += 1;
        self.journal.push(SessionEvent { metadata, kind });
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("registry", &self.registry)
            .field("speech", &self.speech)
            .field("sequencer", &self.sequencer)
            .field("successful", &self.successful)
            .field("paused", &self.paused)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// Collects a session's collaborators.
///
/// The cue loader, all three speakers and the motion sink are required;
/// the clock defaults to the system clock and the reset hook is optional.
pub struct SessionBuilder {
    config: SessionConfig,
    phases: &'static [Phase],
    loader: Option<Arc<dyn CueLoader>>,
    speakers: ActorMap<Option<Box<dyn AudioChannel>>>,
    motion: Option<Arc<dyn MotionSink>>,
    reset_hook: Option<Arc<dyn ResetHook>>,
    clock: Option<Arc<dyn Clock>>,
}

impl SessionBuilder {
    /// A builder for the authored phase table.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            phases: &PHASES,
            loader: None,
            speakers: ActorMap::default(),
            motion: None,
            reset_hook: None,
            clock: None,
        }
    }

    /// Plays `phases` instead of the authored table.
    #[must_use]
    pub fn phases(mut self, phases: &'static [Phase]) -> Self {
        self.phases = phases;
        self
    }

    /// Sets the cue loader.
    #[must_use]
    pub fn loader(mut self, loader: Arc<dyn CueLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Sets one actor's speaker.
    #[must_use]
    pub fn speaker(mut self, actor: Actor, channel: Box<dyn AudioChannel>) -> Self {
        self.speakers[actor] = Some(channel);
        self
    }

    /// Sets every actor's speaker.
    #[must_use]
    pub fn speakers(mut self, channels: ActorMap<Box<dyn AudioChannel>>) -> Self {
        for (actor, channel) in Actor::ALL.into_iter().zip(channels.into_values()) {
            self.speakers[actor] = Some(channel);
        }
        self
    }

    /// Sets the actor motion sink.
    #[must_use]
    pub fn motion_sink(mut self, sink: Arc<dyn MotionSink>) -> Self {
        self.motion = Some(sink);
        self
    }

    /// Sets the hook fired when a pause is held too long.
    #[must_use]
    pub fn reset_hook(mut self, hook: Arc<dyn ResetHook>) -> Self {
        self.reset_hook = Some(hook);
        self
    }

    /// Sets the wall clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Wires everything together.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::MissingCollaborator` if the loader, a speaker
    /// or the motion sink was not supplied, `SessionError::InvalidConfig`
    /// for out-of-range configuration and `SessionError::Narrative` for an
    /// unknown start phase.
    pub fn build(self) -> Result<Session, SessionError> {
        self.config.validate()?;

        let loader = self
            .loader
            .ok_or_else(|| SessionError::MissingCollaborator("cue loader".to_owned()))?;
        let channels = self.speakers.complete().map_err(|actor| {
            SessionError::MissingCollaborator(format!("speaker for {actor}"))
        })?;
        let motion = self
            .motion
            .ok_or_else(|| SessionError::MissingCollaborator("actor motion sink".to_owned()))?;
        if self.reset_hook.is_none() {
            warn!("no reset hook bound; long pauses will only be logged");
        }
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let mut sequencer = PhaseSequencer::new(
            self.phases,
            self.config.timing(),
            self.config.deployment_mode,
        );
        if let Some(start) = self.config.start_phase {
            sequencer = sequencer.start_at(start)?;
        }

        let queue = SpeechQueue::new();
        let registry = ActiveRequestRegistry::new(queue.clone(), Some(motion));
        let speech =
            SpeechArbitrator::new(queue, channels, self.config.min_time_between_speaking());

        let id = Uuid::new_v4();
        info!(session_id = %id, mode = ?self.config.deployment_mode, "session created");

        Ok(Session {
            id,
            span: info_span!("session", session_id = %id),
            clock,
            loader,
            reset_hook: self.reset_hook,
            registry,
            speech,
            sequencer,
            successful: ActorSet::new(),
            watchdog: PauseWatchdog::new(self.config.pause_reset_threshold()),
            paused: false,
            elapsed: Duration::ZERO,
            journal: Vec::new(),
            next_sequence: 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use fairies_core::Item;
    use fairies_test_support::{
        FakeSpeakers, FixedClock, InMemoryCueLoader, ManualClock, RecordingMotionSink,
        RecordingResetHook,
    };

    use super::*;

    const TICK: Duration = Duration::from_millis(100);

    static EMPTY_PHASE: [Phase; 1] = [Phase {
        key: PhaseKey::Outro,
        requests: &[],
    }];

    fn wired(config: SessionConfig) -> SessionBuilder {
        SessionBuilder::new(config)
            .phases(&EMPTY_PHASE)
            .loader(Arc::new(InMemoryCueLoader::permissive()))
            .speakers(FakeSpeakers::new(Duration::from_secs(1)).channels())
            .motion_sink(Arc::new(RecordingMotionSink::new()))
            .clock(Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
            )))
    }

    #[test]
    fn test_build_requires_loader_speakers_and_motion_sink() {
        // Arrange
        let speakers = FakeSpeakers::new(Duration::from_secs(1));
        let no_loader = SessionBuilder::new(SessionConfig::default())
            .speakers(speakers.channels())
            .motion_sink(Arc::new(RecordingMotionSink::new()));
        let no_priest = SessionBuilder::new(SessionConfig::default())
            .loader(Arc::new(InMemoryCueLoader::permissive()))
            .speaker(Actor::Grandma, Box::new(speakers.channel(Actor::Grandma)))
            .speaker(Actor::Doctor, Box::new(speakers.channel(Actor::Doctor)))
            .motion_sink(Arc::new(RecordingMotionSink::new()));
        let no_sink = SessionBuilder::new(SessionConfig::default())
            .loader(Arc::new(InMemoryCueLoader::permissive()))
            .speakers(speakers.channels());

        // Act
        let results = [no_loader.build(), no_priest.build(), no_sink.build()];

        // Assert
        let messages: Vec<String> = results
            .into_iter()
            .map(|result| match result {
                Err(SessionError::MissingCollaborator(what)) => what,
                other => panic!("expected MissingCollaborator, got {other:?}"),
            })
            .collect();
        assert_eq!(
            messages,
            vec!["cue loader", "speaker for priest", "actor motion sink"]
        );
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let config = SessionConfig {
            min_time_between_speaking_secs: f64::NAN,
            ..SessionConfig::default()
        };

        let result = wired(config).build();

        assert!(matches!(result, Err(SessionError::InvalidConfig(_))));
    }

    #[test]
    fn test_paused_tick_freezes_simulated_time() {
        // Arrange
        let mut session = wired(SessionConfig::default()).build().unwrap();
        session.tick(TICK);

        // Act
        session.set_paused(true);
        for _ in 0..10 {
            session.tick(TICK);
        }
        let frozen = session.elapsed();
        session.set_paused(false);
        session.tick(TICK);

        // Assert
        assert_eq!(frozen, TICK);
        assert_eq!(session.elapsed(), TICK * 2);
        let toggles: Vec<bool> = session
            .drain_journal()
            .into_iter()
            .filter_map(|event| match event.kind {
                SessionEventKind::PauseChanged { paused } => Some(paused),
                _ => None,
            })
            .collect();
        assert_eq!(toggles, vec![true, false]);
    }

    #[test]
    fn test_long_pause_fires_reset_hook_once() {
        // Arrange
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
        ));
        let hook = Arc::new(RecordingResetHook::new());
        let mut session = wired(SessionConfig::default())
            .clock(clock.clone())
            .reset_hook(hook.clone())
            .build()
            .unwrap();

        // Act
        session.set_paused(true);
        clock.advance(TimeDelta::seconds(60));
        session.tick(TICK);
        let at_threshold = hook.resets();
        clock.advance(TimeDelta::seconds(1));
        session.tick(TICK);
        session.tick(TICK);

        // Assert
        assert_eq!(at_threshold, 0);
        assert_eq!(hook.resets(), 1);
        let resets = session
            .drain_journal()
            .into_iter()
            .filter(|event| matches!(event.kind, SessionEventKind::PauseReset { .. }))
            .count();
        assert_eq!(resets, 1);
    }

    #[test]
    fn test_refused_delivery_is_journaled_and_changes_nothing() {
        // Arrange
        let mut session = wired(SessionConfig::default()).build().unwrap();
        session.drain_journal();

        // Act
        let unknown = session.deliver(&DeliveryEvent {
            receiver: "grandpa".to_owned(),
            item: "honey".to_owned(),
        });
        let idle = session.deliver(&DeliveryEvent::new(Actor::Doctor, Item::Honey));

        // Assert
        assert!(matches!(unknown, Err(DeliveryError::UnknownActor(_))));
        assert!(matches!(idle, Err(DeliveryError::NoActiveRequest(Actor::Doctor))));
        assert!(session.successful().is_empty());
        let journal = session.drain_journal();
        assert_eq!(journal.len(), 2);
        assert!(matches!(
            &journal[0].kind,
            SessionEventKind::DeliveryIgnored { receiver, .. } if receiver == "grandpa"
        ));
    }

    #[test]
    fn test_journal_sequence_numbers_increase_from_one() {
        let mut session = wired(SessionConfig::default()).build().unwrap();

        for _ in 0..5 {
            session.tick(TICK);
        }
        let journal = session.drain_journal();

        assert!(session.is_finished());
        let numbers: Vec<i64> = journal.iter().map(|e| e.metadata.sequence_number).collect();
        let expected: Vec<i64> = (1..=i64::try_from(numbers.len()).unwrap()).collect();
        assert_eq!(numbers, expected);
        assert!(journal.iter().all(|e| e.metadata.session_id == session.id()));
        assert_eq!(
            journal.last().map(|e| &e.kind),
            Some(&SessionEventKind::SessionFinished)
        );
    }
}
