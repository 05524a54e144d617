//! Shared rig for session integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use fairies_narrative::domain::phase::Phase;
use fairies_session::domain::events::{SessionEvent, SessionEventKind};
use fairies_session::{Session, SessionBuilder, SessionConfig};
use fairies_test_support::{FakeSpeakers, FixedClock, InMemoryCueLoader, RecordingMotionSink};

/// A session wired to in-memory fakes, with every journal event kept.
pub struct Rig {
    pub session: Session,
    pub loader: Arc<InMemoryCueLoader>,
    pub speakers: FakeSpeakers,
    pub sink: Arc<RecordingMotionSink>,
    pub journal: Vec<SessionEvent>,
}

impl Rig {
    pub fn new(
        config: SessionConfig,
        phases: &'static [Phase],
        loader: InMemoryCueLoader,
        clip_length: Duration,
    ) -> Self {
        let loader = Arc::new(loader);
        let speakers = FakeSpeakers::new(clip_length);
        let sink = Arc::new(RecordingMotionSink::new());
        let session = SessionBuilder::new(config)
            .phases(phases)
            .loader(loader.clone())
            .speakers(speakers.channels())
            .motion_sink(sink.clone())
            .clock(Arc::new(FixedClock(
                Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, 0).unwrap(),
            )))
            .build()
            .unwrap();
        Self {
            session,
            loader,
            speakers,
            sink,
            journal: Vec::new(),
        }
    }

    /// Lets the speakers play for `dt`, then ticks the session.
    pub fn step(&mut self, dt: Duration) {
        self.speakers.advance(dt);
        self.session.tick(dt);
        self.journal.extend(self.session.drain_journal());
    }

    /// Steps until `done` holds or `limit` ticks have run.
    pub fn run_until(&mut self, dt: Duration, limit: usize, mut done: impl FnMut(&Self) -> bool) {
        for _ in 0..limit {
            if done(self) {
                return;
            }
            self.step(dt);
        }
        assert!(done(self), "condition not reached within {limit} ticks");
    }

    /// Journal payloads in order.
    pub fn kinds(&self) -> Vec<&SessionEventKind> {
        self.journal.iter().map(|event| &event.kind).collect()
    }

    /// The first journal event matching `predicate`.
    pub fn find(&self, predicate: impl Fn(&SessionEventKind) -> bool) -> Option<&SessionEvent> {
        self.journal.iter().find(|event| predicate(&event.kind))
    }

    /// Loader paths of every clip played so far, in play order.
    pub fn played_paths(&self) -> Vec<String> {
        self.speakers
            .played()
            .into_iter()
            .filter_map(|(_, handle)| self.loader.path_of(handle))
            .collect()
    }
}
