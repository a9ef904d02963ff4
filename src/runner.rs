use crate::clock::{Clock, SystemClock};
use crate::models::{Phase, SessionSnapshot};
use crate::session_engine::{SessionEngine, StepOutcome};
use crate::ticker::{TickFlow, Ticker};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Drives a `SessionEngine` with a real periodic tick. At most one
/// ticker exists at a time: every transition that suspends the session
/// cancels the ticker before any new one is armed, and the engine's
/// phase guard under the mutex makes any tick already in flight a
/// no-op.
pub struct SessionRunner<C: Clock + Send + 'static = SystemClock> {
    engine: Arc<Mutex<SessionEngine<C>>>,
    ticker: Option<Ticker>,
    tick_interval: Duration,
}

impl<C: Clock + Send + 'static> SessionRunner<C> {
    pub fn new(engine: SessionEngine<C>) -> Self {
        Self::with_tick_interval(engine, DEFAULT_TICK_INTERVAL)
    }

    pub fn with_tick_interval(engine: SessionEngine<C>, tick_interval: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            ticker: None,
            tick_interval,
        }
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn start(&mut self) {
        // Re-arm from scratch so two tickers can never coexist.
        self.disarm();
        let running = self.with_engine(|engine| {
            engine.start();
            engine.is_running()
        });
        if running == Some(true) {
            self.arm();
        }
    }

    pub fn pause(&mut self) {
        self.disarm();
        self.with_engine(|engine| engine.pause());
    }

    pub fn next_step(&mut self) -> StepOutcome {
        let outcome = self
            .with_engine(|engine| engine.next_step())
            .unwrap_or(StepOutcome::NoChange);
        if outcome == StepOutcome::Completed {
            self.disarm();
        }
        outcome
    }

    pub fn previous_step(&mut self) {
        self.with_engine(|engine| engine.previous_step());
    }

    pub fn reset(&mut self) {
        self.disarm();
        self.with_engine(|engine| engine.reset());
    }

    pub fn select_routine(&mut self, id: &str) {
        self.disarm();
        self.with_engine(|engine| engine.select_routine(id));
    }

    pub fn phase(&self) -> Phase {
        self.with_engine(|engine| engine.phase()).unwrap_or_default()
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        self.with_engine(|engine| engine.snapshot())
    }

    fn arm(&mut self) {
        let engine = self.engine.clone();
        self.ticker = Some(Ticker::spawn(self.tick_interval, move || {
            let Ok(mut engine) = engine.lock() else {
                warn!("session engine lock failed, stopping ticker");
                return TickFlow::Stop;
            };
            match engine.tick() {
                StepOutcome::Completed => TickFlow::Stop,
                _ => TickFlow::Continue,
            }
        }));
    }

    fn disarm(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
    }

    fn with_engine<T>(&self, action: impl FnOnce(&mut SessionEngine<C>) -> T) -> Option<T> {
        match self.engine.lock() {
            Ok(mut engine) => Some(action(&mut engine)),
            Err(_) => {
                warn!("session engine lock failed");
                None
            }
        }
    }
}

impl<C: Clock + Send + 'static> Drop for SessionRunner<C> {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::SessionRunner;
    use crate::catalog::RoutineCatalog;
    use crate::clock::ManualClock;
    use crate::history::MemorySink;
    use crate::models::{Phase, Routine, RoutineStep, StepCategory};
    use crate::session_engine::{SessionEngine, StepOutcome};
    use std::sync::Arc;
    use std::thread::sleep;
    use std::time::Duration;

    fn two_step_routine() -> Routine {
        let step = |id: &str, duration_seconds| RoutineStep {
            id: id.to_string(),
            duration_seconds,
            category: StepCategory::Activation,
        };
        Routine {
            id: "drill".to_string(),
            display_name: "Drill".to_string(),
            total_minutes_hint: 4,
            description: String::new(),
            steps: vec![step("step-0", 60), step("step-1", 180)],
        }
    }

    fn runner() -> (SessionRunner<ManualClock>, ManualClock, Arc<MemorySink>) {
        let catalog = RoutineCatalog::new(vec![two_step_routine()], "drill").expect("catalog");
        let clock = ManualClock::new();
        let sink = Arc::new(MemorySink::new());
        let engine = SessionEngine::with_clock(catalog, Box::new(sink.clone()), clock.clone());
        let runner = SessionRunner::with_tick_interval(engine, Duration::from_millis(10));
        (runner, clock, sink)
    }

    #[test]
    fn start_arms_exactly_one_ticker() {
        let (mut runner, _clock, _sink) = runner();
        assert!(!runner.is_ticking());
        runner.start();
        assert!(runner.is_ticking());
        assert_eq!(runner.phase(), Phase::Running);
        runner.start();
        assert!(runner.is_ticking());
        runner.reset();
    }

    #[test]
    fn pause_cancels_pending_ticks() {
        let (mut runner, clock, _sink) = runner();
        runner.start();
        clock.advance_secs(10);
        runner.pause();
        assert!(!runner.is_ticking());
        assert_eq!(runner.phase(), Phase::Paused);

        // No tick thread is left to advance the step while paused.
        clock.advance_secs(500);
        sleep(Duration::from_millis(50));
        let snapshot = runner.snapshot().expect("snapshot");
        assert_eq!(snapshot.step_index, 0);
        assert_eq!(snapshot.step_remaining_seconds, 50);
    }

    #[test]
    fn ticker_drives_auto_advance() {
        let (mut runner, clock, _sink) = runner();
        runner.start();
        clock.advance_secs(60);
        sleep(Duration::from_millis(80));
        let snapshot = runner.snapshot().expect("snapshot");
        assert_eq!(snapshot.step_index, 1);
        runner.reset();
    }

    #[test]
    fn completion_stops_the_ticker_and_appends_once() {
        let (mut runner, clock, sink) = runner();
        runner.start();
        clock.advance_secs(60);
        sleep(Duration::from_millis(50));
        clock.advance_secs(180);
        sleep(Duration::from_millis(50));

        assert_eq!(runner.phase(), Phase::Completed);
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].duration_seconds, 240);
    }

    #[test]
    fn manual_completion_disarms_ticker() {
        let (mut runner, _clock, sink) = runner();
        runner.start();
        assert_eq!(
            runner.next_step(),
            StepOutcome::StepAdvanced { step_index: 1 }
        );
        assert_eq!(runner.next_step(), StepOutcome::Completed);
        assert!(!runner.is_ticking());
        assert_eq!(sink.records().len(), 1);
    }

    #[test]
    fn reset_and_select_routine_cancel_the_ticker() {
        let (mut runner, _clock, _sink) = runner();
        runner.start();
        runner.reset();
        assert!(!runner.is_ticking());
        assert_eq!(runner.phase(), Phase::Idle);

        runner.start();
        runner.select_routine("drill");
        assert!(!runner.is_ticking());
        assert_eq!(runner.phase(), Phase::Idle);
    }

    #[test]
    fn previous_step_keeps_ticker_running() {
        let (mut runner, _clock, _sink) = runner();
        runner.start();
        runner.next_step();
        runner.previous_step();
        assert!(runner.is_ticking());
        assert_eq!(runner.snapshot().expect("snapshot").step_index, 0);
        runner.reset();
    }
}
