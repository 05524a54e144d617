//! The phase sequencer: walks the phase table one tick at a time.
//!
//! Every wait in a phase (a story line still playing, a configured pause,
//! the requests settling) is a stored field polled once per `step`. A step
//! runs until something has to wait, so zero-length pauses cost no ticks.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use fairies_core::ports::CueLoader;
use fairies_core::{Actor, ActorSet, AssetHandle};
use fairies_requests::application::registry::ActiveRequestRegistry;
use fairies_requests::domain::obligation::RequestSpec;
use fairies_requests::domain::request::Request;
use fairies_speech::application::arbitrator::SpeechArbitrator;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::domain::phase::{Phase, PhaseKey};
use crate::domain::story::{StoryCue, arrange};
use crate::error::NarrativeError;

/// Where the sequencer is within the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    /// Playing the phase's story cues.
    StoryLines,
    /// Pausing between the story and the requests.
    LinesToRequests,
    /// Spawning the phase's requests one by one.
    RequestAnnouncement,
    /// Waiting for every request to end and every utterance to finish.
    RequestWaiting,
    /// Pausing before the next phase.
    PhaseEnd,
    /// The last phase ended and the session does not loop.
    Finished,
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SequencerState::StoryLines => "story_lines",
            SequencerState::LinesToRequests => "lines_to_requests",
            SequencerState::RequestAnnouncement => "request_announcement",
            SequencerState::RequestWaiting => "request_waiting",
            SequencerState::PhaseEnd => "phase_end",
            SequencerState::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// What happens after the last phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    /// Stop in `Finished`.
    #[default]
    Terminate,
    /// Start over from the first phase.
    Loop,
}

/// Pauses between the sequencer's steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTiming {
    /// After each blocking story line.
    pub inter_line_pause: Duration,
    /// Between the last story line and the first request.
    pub lines_to_requests_pause: Duration,
    /// After each spawned request.
    pub inter_request_pause: Duration,
    /// After a phase settles, before the next one starts.
    pub inter_phase_pause: Duration,
}

impl Default for SequencerTiming {
    fn default() -> Self {
        Self {
            inter_line_pause: Duration::from_millis(500),
            lines_to_requests_pause: Duration::ZERO,
            inter_request_pause: Duration::from_secs(2),
            inter_phase_pause: Duration::ZERO,
        }
    }
}

/// Something the sequencer did during a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencerEvent {
    /// A phase started.
    PhaseEntered { phase: PhaseKey },
    /// A story cue was dispatched.
    StoryCuePlayed {
        phase: PhaseKey,
        name: String,
        speaker: Actor,
        blocking: bool,
    },
    /// A story cue's branch condition did not hold.
    StoryCueSkipped { phase: PhaseKey, name: String },
    /// A request was loaded and registered.
    RequestSpawned {
        phase: PhaseKey,
        actor: Actor,
        key: String,
    },
    /// Every request ended and the phase's cues were unloaded.
    PhaseCompleted { phase: PhaseKey },
    /// The last phase ended; starting over.
    Restarted,
    /// The last phase ended; nothing more to do.
    Finished,
}

/// Everything outside the sequencer that a step touches.
pub struct PhaseContext<'a> {
    /// Live requests; the sequencer adds to it.
    pub registry: &'a mut ActiveRequestRegistry,
    /// Plays story cues and reports silence.
    pub speech: &'a SpeechArbitrator,
    /// Loads story clips and request cues.
    pub loader: &'a dyn CueLoader,
    /// Actors whose request completed in the current cycle.
    pub successful: &'a mut ActorSet,
}

#[derive(Debug, Clone, Copy)]
struct Pause {
    length: Duration,
    waited: Duration,
    fresh: bool,
}

impl Pause {
    fn new(length: Duration) -> Self {
        Self {
            length,
            waited: Duration::ZERO,
            fresh: true,
        }
    }

    // The tick that starts a pause contributes no time to it.
    fn poll(&mut self, dt: Duration) -> bool {
        if self.fresh {
            self.fresh = false;
        } else {
            self.waited += dt;
        }
        self.waited >= self.length
    }
}

#[derive(Debug, Clone, Copy)]
struct LineInFlight {
    speaker: Actor,
    fresh: bool,
}

impl LineInFlight {
    // A channel is only checked from the tick after `play`.
    fn poll(&mut self, speech: &SpeechArbitrator) -> bool {
        if self.fresh {
            self.fresh = false;
            return false;
        }
        !speech.is_playing(self.speaker)
    }
}

/// Drives the phase table.
#[derive(Debug)]
pub struct PhaseSequencer {
    phases: &'static [Phase],
    index: usize,
    state: SequencerState,
    mode: DeploymentMode,
    timing: SequencerTiming,
    needs_entry: bool,
    story: VecDeque<StoryCue>,
    story_handles: Vec<AssetHandle>,
    line: Option<LineInFlight>,
    pause: Option<Pause>,
    to_spawn: VecDeque<RequestSpec>,
    retired: Vec<Request>,
    settle_grace: bool,
}

impl PhaseSequencer {
    /// A sequencer at the start of `phases`.
    #[must_use]
    pub fn new(phases: &'static [Phase], timing: SequencerTiming, mode: DeploymentMode) -> Self {
        Self {
            phases,
            index: 0,
            state: if phases.is_empty() {
                SequencerState::Finished
            } else {
                SequencerState::StoryLines
            },
            mode,
            timing,
            needs_entry: !phases.is_empty(),
            story: VecDeque::new(),
            story_handles: Vec::new(),
            line: None,
            pause: None,
            to_spawn: VecDeque::new(),
            retired: Vec::new(),
            settle_grace: false,
        }
    }

    /// Skips every phase before `key`.
    ///
    /// # Errors
    ///
    /// Returns `NarrativeError::UnknownPhase` if `key` is not in the table.
    pub fn start_at(mut self, key: PhaseKey) -> Result<Self, NarrativeError> {
        let index = self
            .phases
            .iter()
            .position(|phase| phase.key == key)
            .ok_or_else(|| NarrativeError::UnknownPhase(key.to_string()))?;
        for skipped in &self.phases[..index] {
            warn!(phase = %skipped.key, "skipping phase");
        }
        self.index = index;
        Ok(self)
    }

    /// The phase being played, or the last one once finished.
    #[must_use]
    pub fn current_phase(&self) -> Option<PhaseKey> {
        self.phases.get(self.index).map(|phase| phase.key)
    }

    /// Where the sequencer is within the current phase.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Returns `true` once the last phase ended in terminate mode.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.state == SequencerState::Finished
    }

    /// Advances by one tick.
    pub fn step(&mut self, dt: Duration, ctx: &mut PhaseContext<'_>) -> Vec<SequencerEvent> {
        let mut events = Vec::new();
        loop {
            if self.needs_entry {
                self.enter_phase(ctx, &mut events);
            }
            let progressed = match self.state {
                SequencerState::StoryLines => self.step_story(dt, ctx, &mut events),
                SequencerState::LinesToRequests => self.step_lines_to_requests(dt, ctx),
                SequencerState::RequestAnnouncement => self.step_announcement(dt, ctx, &mut events),
                SequencerState::RequestWaiting => self.step_waiting(ctx, &mut events),
                SequencerState::PhaseEnd => self.step_phase_end(dt, ctx, &mut events),
                SequencerState::Finished => false,
            };
            if !progressed {
                return events;
            }
        }
    }

    fn phase_key(&self) -> PhaseKey {
        // `index` only ever points into `phases` once entered.
        self.phases[self.index].key
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(phase = ?self.current_phase(), from = %self.state, to = %next, "sequencer state change");
        self.state = next;
    }

    fn poll_pause(&mut self, dt: Duration) -> bool {
        let Some(pause) = self.pause.as_mut() else {
            return true;
        };
        if pause.poll(dt) {
            self.pause = None;
            true
        } else {
            false
        }
    }

    fn enter_phase(&mut self, ctx: &PhaseContext<'_>, events: &mut Vec<SequencerEvent>) {
        self.needs_entry = false;
        let phases = self.phases;
        let Some(phase) = phases.get(self.index) else {
            self.transition(SequencerState::Finished);
            return;
        };

        let clips = ctx.loader.load_story_clips(phase.key.story_directory());
        self.story_handles = clips.iter().map(|clip| clip.handle).collect();
        self.story = arrange(clips).into();
        info!(phase = %phase.key, story_cues = self.story.len(), "entering phase");

        self.transition(SequencerState::StoryLines);
        events.push(SequencerEvent::PhaseEntered { phase: phase.key });
    }

    fn step_story(
        &mut self,
        dt: Duration,
        ctx: &PhaseContext<'_>,
        events: &mut Vec<SequencerEvent>,
    ) -> bool {
        if let Some(line) = self.line.as_mut() {
            if !line.poll(ctx.speech) {
                return false;
            }
            self.line = None;
            self.pause = Some(Pause::new(self.timing.inter_line_pause));
        }
        if !self.poll_pause(dt) {
            return false;
        }

        let phase = self.phase_key();
        let Some(cue) = self.story.pop_front() else {
            self.transition(SequencerState::LinesToRequests);
            self.pause = Some(Pause::new(self.timing.lines_to_requests_pause));
            return true;
        };

        if !cue.admits(ctx.successful) {
            warn!(phase = %phase, cue = %cue.name, "skipping story cue; branch conditions not met");
            events.push(SequencerEvent::StoryCueSkipped {
                phase,
                name: cue.name,
            });
            return true;
        }

        if let Some(tag) = cue.tag {
            info!(phase = %phase, cue = %cue.name, branch = %tag, "using branch");
        }
        info!(phase = %phase, speaker = %cue.speaker, cue = %cue.name, "playing story cue");
        ctx.speech.play_now(cue.speaker, cue.handle);
        let blocking = cue.is_blocking();
        if blocking {
            self.line = Some(LineInFlight {
                speaker: cue.speaker,
                fresh: true,
            });
        }
        events.push(SequencerEvent::StoryCuePlayed {
            phase,
            name: cue.name,
            speaker: cue.speaker,
            blocking,
        });
        true
    }

    fn step_lines_to_requests(&mut self, dt: Duration, ctx: &mut PhaseContext<'_>) -> bool {
        if !self.poll_pause(dt) {
            return false;
        }
        self.transition(SequencerState::RequestAnnouncement);
        ctx.successful.clear();
        self.to_spawn = self.phases[self.index].requests.iter().copied().collect();
        true
    }

    fn step_announcement(
        &mut self,
        dt: Duration,
        ctx: &mut PhaseContext<'_>,
        events: &mut Vec<SequencerEvent>,
    ) -> bool {
        if !self.poll_pause(dt) {
            return false;
        }

        let phase = self.phase_key();
        let Some(spec) = self.to_spawn.pop_front() else {
            self.transition(SequencerState::RequestWaiting);
            self.settle_grace = false;
            return true;
        };

        let mut request = match Request::new(spec) {
            Ok(request) => request,
            Err(e) => {
                error!(phase = %phase, actor = %spec.requester, error = %e, "skipping invalid request");
                return true;
            }
        };
        if !request.load_cues(ctx.loader) {
            warn!(phase = %phase, request = %request, "request is missing cue assets");
        }
        let actor = request.requester();
        let key = request.key().to_owned();
        ctx.registry.add(request);
        events.push(SequencerEvent::RequestSpawned { phase, actor, key });

        self.pause = Some(Pause::new(self.timing.inter_request_pause));
        true
    }

    fn step_waiting(&mut self, ctx: &mut PhaseContext<'_>, events: &mut Vec<SequencerEvent>) -> bool {
        self.retired.extend(ctx.registry.take_retired());
        if !ctx.registry.is_empty() || !ctx.speech.is_idle() {
            return false;
        }
        // One extra tick lets a final outcome cue reach the queue.
        if !self.settle_grace {
            self.settle_grace = true;
            return false;
        }
        if ctx.speech.silence().is_zero() {
            return false;
        }

        let phase = self.phase_key();
        for mut request in self.retired.drain(..) {
            request.unload_cues(ctx.loader);
        }
        for handle in self.story_handles.drain(..) {
            ctx.loader.unload(handle);
        }
        info!(phase = %phase, "phase settled");
        events.push(SequencerEvent::PhaseCompleted { phase });

        self.transition(SequencerState::PhaseEnd);
        self.pause = Some(Pause::new(self.timing.inter_phase_pause));
        true
    }

    fn step_phase_end(
        &mut self,
        dt: Duration,
        ctx: &mut PhaseContext<'_>,
        events: &mut Vec<SequencerEvent>,
    ) -> bool {
        if !self.poll_pause(dt) {
            return false;
        }

        if self.index + 1 < self.phases.len() {
            self.index += 1;
            self.needs_entry = true;
            return true;
        }

        match self.mode {
            DeploymentMode::Terminate => {
                info!("last phase ended");
                self.transition(SequencerState::Finished);
                events.push(SequencerEvent::Finished);
                false
            }
            DeploymentMode::Loop => {
                info!("last phase ended; starting over");
                self.index = 0;
                ctx.successful.clear();
                self.needs_entry = true;
                events.push(SequencerEvent::Restarted);
                true
            }
        }
    }
}
