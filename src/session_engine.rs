use crate::catalog::RoutineCatalog;
use crate::clock::{Clock, SystemClock};
use crate::history::CompletionSink;
use crate::models::{CompletionRecord, Phase, Progress, Routine, RoutineStep, SessionSnapshot};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of an operation that may move the session forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    NoChange,
    StepAdvanced { step_index: usize },
    Completed,
}

type CompletionCallback = Box<dyn FnMut(&CompletionRecord) + Send>;

/// The session state machine. Owns the active routine, the step cursor
/// and all pause accounting; emits exactly one `CompletionRecord` per
/// fully-completed session.
///
/// Invalid calls (pausing while idle, rewinding at the first step, and
/// so on) are no-ops rather than errors.
///
/// Time semantics:
/// - total elapsed is floored to whole seconds and excludes paused time;
/// - step remaining is ceiled, so it never shows zero before the step is
///   truly finished and reaches exactly zero to trigger auto-advance;
/// - while paused, "now" is frozen at the instant the pause began.
pub struct SessionEngine<C: Clock = SystemClock> {
    clock: C,
    catalog: RoutineCatalog,
    routine: Routine,
    step_index: usize,
    phase: Phase,
    session_started_at: Option<Instant>,
    step_started_at: Option<Instant>,
    pause_started_at: Option<Instant>,
    accumulated_pause: Duration,
    final_elapsed: Option<u64>,
    sink: Box<dyn CompletionSink + Send>,
    on_complete: Option<CompletionCallback>,
}

impl SessionEngine<SystemClock> {
    pub fn new(catalog: RoutineCatalog, sink: Box<dyn CompletionSink + Send>) -> Self {
        Self::with_clock(catalog, sink, SystemClock)
    }
}

impl<C: Clock> SessionEngine<C> {
    pub fn with_clock(
        catalog: RoutineCatalog,
        sink: Box<dyn CompletionSink + Send>,
        clock: C,
    ) -> Self {
        let routine = catalog.default_routine().clone();
        Self {
            clock,
            catalog,
            routine,
            step_index: 0,
            phase: Phase::Idle,
            session_started_at: None,
            step_started_at: None,
            pause_started_at: None,
            accumulated_pause: Duration::ZERO,
            final_elapsed: None,
            sink,
            on_complete: None,
        }
    }

    /// Registers a callback invoked synchronously once per completed
    /// session, after the record has been handed to the sink.
    pub fn on_complete(&mut self, callback: impl FnMut(&CompletionRecord) + Send + 'static) {
        self.on_complete = Some(Box::new(callback));
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    // Invariant: 0 <= step_index < steps.len(), maintained by every
    // transition, and the catalog rejects empty routines.
    pub fn current_step(&self) -> &RoutineStep {
        &self.routine.steps[self.step_index]
    }

    /// Replaces the active routine, falling back to the catalog default
    /// when the id is unknown. Applies `reset()` semantics.
    pub fn select_routine(&mut self, id: &str) {
        let routine = self.catalog.resolve(id).clone();
        if routine.id != id {
            debug!(requested = id, fallback = %routine.id, "unknown routine id, using default");
        }
        self.routine = routine;
        self.reset();
    }

    /// Idle -> Running, or Paused -> Running with the pause interval
    /// folded into the accounting so step remaining time is preserved
    /// exactly. No-op while Running or Completed.
    pub fn start(&mut self) {
        let now = self.clock.now();
        match self.phase {
            Phase::Idle => {
                self.session_started_at = Some(now);
                self.step_started_at = Some(now);
                self.accumulated_pause = Duration::ZERO;
                self.phase = Phase::Running;
            }
            Phase::Paused => {
                if let Some(paused_at) = self.pause_started_at.take() {
                    let paused_for = now.duration_since(paused_at);
                    self.accumulated_pause = self.accumulated_pause.saturating_add(paused_for);
                    // Shift the step anchor forward by the pause length
                    // so remaining time picks up where it left off.
                    if let Some(step_started) = self.step_started_at {
                        self.step_started_at = Some(step_started + paused_for);
                    }
                }
                self.phase = Phase::Running;
            }
            Phase::Running | Phase::Completed => {}
        }
    }

    /// Running -> Paused. No-op otherwise.
    pub fn pause(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.pause_started_at = Some(self.clock.now());
        self.phase = Phase::Paused;
    }

    /// One scheduler beat. Only acts while Running, so a tick delivered
    /// after `pause()` or `reset()` can never advance a step.
    pub fn tick(&mut self) -> StepOutcome {
        if self.phase != Phase::Running {
            return StepOutcome::NoChange;
        }
        let now = self.clock.now();
        if self.step_remaining_at(now) == 0 {
            self.advance_step(now)
        } else {
            StepOutcome::NoChange
        }
    }

    /// Manual advance; shares the auto-advance path, so calling it at
    /// the last step completes the session. Permitted while paused (the
    /// pause is preserved). After completion it re-reports `Completed`
    /// without side effects.
    pub fn next_step(&mut self) -> StepOutcome {
        match self.phase {
            Phase::Running | Phase::Paused => {
                let now = self.effective_now();
                self.advance_step(now)
            }
            Phase::Completed => StepOutcome::Completed,
            Phase::Idle => StepOutcome::NoChange,
        }
    }

    /// Rewinds one step and restarts that step's timer at full duration.
    /// No-op at the first step or outside an active session.
    pub fn previous_step(&mut self) {
        if !matches!(self.phase, Phase::Running | Phase::Paused) {
            return;
        }
        if self.step_index == 0 {
            return;
        }
        self.step_index -= 1;
        self.step_started_at = Some(self.effective_now());
    }

    /// Returns to Idle and clears all derived state. Always succeeds.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.step_index = 0;
        self.session_started_at = None;
        self.step_started_at = None;
        self.pause_started_at = None;
        self.accumulated_pause = Duration::ZERO;
        self.final_elapsed = None;
    }

    /// Whole seconds left in the current step (full duration before the
    /// session starts, zero after completion).
    pub fn step_remaining_seconds(&self) -> u64 {
        if self.phase == Phase::Completed {
            return 0;
        }
        self.step_remaining_at(self.effective_now())
    }

    /// Whole seconds of running time so far, paused time excluded.
    /// Frozen while paused and after completion.
    pub fn total_elapsed_seconds(&self) -> u64 {
        if let Some(elapsed) = self.final_elapsed {
            return elapsed;
        }
        self.total_elapsed_at(self.effective_now())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            step_index: self.step_index,
            step_remaining_seconds: self.step_remaining_seconds(),
            total_elapsed_seconds: self.total_elapsed_seconds(),
        }
    }

    pub fn progress(&self) -> Progress {
        let total = self.routine.steps.len();
        let current = self.step_index + 1;
        Progress {
            current,
            total,
            percentage: current as f32 / total as f32 * 100.0,
        }
    }

    fn effective_now(&self) -> Instant {
        self.pause_started_at.unwrap_or_else(|| self.clock.now())
    }

    fn step_remaining_at(&self, now: Instant) -> u64 {
        let duration = Duration::from_secs(u64::from(self.current_step().duration_seconds));
        let Some(started_at) = self.step_started_at else {
            return duration.as_secs();
        };
        let remaining = duration.saturating_sub(now.duration_since(started_at));
        // Ceil to whole seconds.
        if remaining.subsec_nanos() > 0 {
            remaining.as_secs() + 1
        } else {
            remaining.as_secs()
        }
    }

    fn total_elapsed_at(&self, now: Instant) -> u64 {
        let Some(started_at) = self.session_started_at else {
            return 0;
        };
        now.duration_since(started_at)
            .saturating_sub(self.accumulated_pause)
            .as_secs()
    }

    fn advance_step(&mut self, now: Instant) -> StepOutcome {
        if self.step_index + 1 < self.routine.steps.len() {
            self.step_index += 1;
            self.step_started_at = Some(now);
            StepOutcome::StepAdvanced {
                step_index: self.step_index,
            }
        } else {
            self.complete(now);
            StepOutcome::Completed
        }
    }

    fn complete(&mut self, now: Instant) {
        let record = CompletionRecord {
            routine_id: self.routine.id.clone(),
            duration_seconds: self.total_elapsed_at(now),
            completed_at: Utc::now().to_rfc3339(),
            step_count: self.routine.steps.len(),
        };
        debug!(routine = %record.routine_id, duration = record.duration_seconds, "session completed");
        if let Err(err) = self.sink.append(&record) {
            // Persistence failures are the sink's concern; the session
            // still completes.
            warn!("failed to append completion record: {err}");
        }
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete(&record);
        }
        self.final_elapsed = Some(record.duration_seconds);
        self.phase = Phase::Completed;
        self.step_started_at = None;
        self.pause_started_at = None;
    }
}

impl<C: Clock + std::fmt::Debug> std::fmt::Debug for SessionEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("clock", &self.clock)
            .field("routine", &self.routine.id)
            .field("step_index", &self.step_index)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
