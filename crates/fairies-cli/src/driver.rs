//! The headless tick loop.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use fairies_narrative::domain::phase::PhaseKey;
use fairies_session::{Session, SessionBuilder, SessionConfig};
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::loader::FsCueLoader;
use crate::player::{RandomPlayer, SeededRng};
use crate::settings::Settings;
use crate::stage::{SimulatedSpeakers, TracingMotionSink, TracingResetHook};

/// Simulated time between two player deliveries.
const PLAYER_INTERVAL: Duration = Duration::from_secs(3);

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Ticks executed.
    pub ticks: u64,
    /// Simulated time covered.
    pub elapsed: Duration,
    /// The phase the session was in at the end.
    pub phase: Option<PhaseKey>,
    /// The session reached its end.
    pub finished: bool,
    /// The run was stopped with ctrl-c.
    pub interrupted: bool,
    /// Journal lines written.
    pub journal_lines: usize,
}

/// One session plus the simulated world around it.
#[derive(Debug)]
pub struct Driver {
    session: Session,
    speakers: SimulatedSpeakers,
    player: RandomPlayer,
    tick: Duration,
    max_duration: Duration,
    ticks: u64,
    journal_lines: usize,
}

impl Driver {
    /// Wires a session to the filesystem loader and the simulated stage.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session cannot be brought up.
    pub fn assemble(settings: &Settings, config: SessionConfig) -> Result<Self, AppError> {
        let speakers = SimulatedSpeakers::new(settings.clip_length);
        let session = SessionBuilder::new(config)
            .loader(Arc::new(FsCueLoader::new(&settings.asset_root)))
            .speakers(speakers.channels())
            .motion_sink(Arc::new(TracingMotionSink))
            .reset_hook(Arc::new(TracingResetHook::default()))
            .build()?;

        info!(
            session_id = %session.id(),
            assets = %settings.asset_root.display(),
            seed = settings.seed,
            "session assembled"
        );

        Ok(Self {
            session,
            speakers,
            player: RandomPlayer::new(Box::new(SeededRng::new(settings.seed)), PLAYER_INTERVAL),
            tick: settings.tick,
            max_duration: settings.max_duration,
            ticks: 0,
            journal_lines: 0,
        })
    }

    /// The driven session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Runs one tick and writes the journal events it produced to `out`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` or `AppError::Journal` if a line cannot be
    /// written.
    pub fn step(&mut self, out: &mut impl Write) -> Result<(), AppError> {
        self.speakers.advance(self.tick);
        self.session.tick(self.tick);
        if let Some(delivery) = self.player.poll(self.tick, self.session.registry())
            && let Err(e) = self.session.deliver(&delivery)
        {
            debug!(receiver = %delivery.receiver, item = %delivery.item, error = %e, "delivery refused");
        }
        self.ticks += 1;

        for event in self.session.drain_journal() {
            writeln!(out, "{}", event.to_json_line()?)?;
            self.journal_lines += 1;
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.session.is_finished() || self.session.elapsed() >= self.max_duration
    }

    /// Steps until the session finishes, the time cap is reached or, in
    /// realtime mode, ctrl-c is pressed.
    ///
    /// # Errors
    ///
    /// Returns the first error from [`Driver::step`] or from installing the
    /// ctrl-c handler.
    pub async fn run(mut self, out: &mut impl Write, realtime: bool) -> Result<RunSummary, AppError> {
        let mut interrupted = false;

        if realtime {
            let mut ticker = tokio::time::interval(self.tick);
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);
            while !self.is_done() {
                tokio::select! {
                    _ = ticker.tick() => self.step(out)?,
                    result = &mut ctrl_c => {
                        result?;
                        warn!("interrupted");
                        interrupted = true;
                        break;
                    }
                }
            }
        } else {
            while !self.is_done() {
                self.step(out)?;
            }
        }
        out.flush()?;

        let summary = RunSummary {
            ticks: self.ticks,
            elapsed: self.session.elapsed(),
            phase: self.session.current_phase(),
            finished: self.session.is_finished(),
            interrupted,
            journal_lines: self.journal_lines,
        };
        info!(
            ticks = summary.ticks,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            phase = ?summary.phase,
            finished = summary.finished,
            "run ended"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn settings(max_secs: u64) -> Settings {
        Settings {
            config_path: None,
            asset_root: PathBuf::from("/nonexistent/fairies-assets"),
            tick: Duration::from_millis(100),
            seed: 3,
            realtime: false,
            max_duration: Duration::from_secs(max_secs),
            clip_length: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_fast_run_stops_at_time_cap() {
        // Arrange
        let driver = Driver::assemble(&settings(20), SessionConfig::default()).unwrap();
        let mut out = Vec::new();

        // Act
        let summary = driver.run(&mut out, false).await.unwrap();

        // Assert
        assert!(!summary.finished);
        assert!(!summary.interrupted);
        assert_eq!(summary.elapsed, Duration::from_secs(20));
        assert_eq!(summary.ticks, 200);
        assert!(summary.phase.is_some());

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), summary.journal_lines);
        assert_eq!(lines[0]["metadata"]["event_type"], "session.phase_entered");
        assert_eq!(lines[0]["kind"]["phase"], "tutorial");
    }

    #[tokio::test]
    async fn test_fast_run_finishes_from_last_phase() {
        let config = SessionConfig::from_yaml_str("start_phase: outro").unwrap();
        let driver = Driver::assemble(&settings(60), config).unwrap();
        let mut out = Vec::new();

        let summary = driver.run(&mut out, false).await.unwrap();

        assert!(summary.finished);
        assert_eq!(summary.phase, Some(PhaseKey::Outro));
        assert!(summary.elapsed < Duration::from_secs(1));
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().last().unwrap().contains("session.finished"));
    }
}
