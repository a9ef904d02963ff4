//! Guided multi-step timed exercise sessions.
//!
//! [`SessionEngine`] is the core: a four-phase state machine (idle,
//! running, paused, completed) that walks an ordered routine of timed
//! steps, auto-advances on expiry and appends one [`CompletionRecord`]
//! per finished session to a [`CompletionSink`]. Time comes from an
//! injectable [`Clock`], so the whole machine is testable against a
//! virtual clock. [`SessionRunner`] adds the real one-second tick on
//! top for embedding in an application.

pub mod catalog;
pub mod clock;
pub mod format;
pub mod history;
pub mod models;
pub mod runner;
pub mod session_engine;
pub mod stats;
pub mod ticker;

pub use catalog::{CatalogError, RoutineCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use format::format_clock;
pub use history::{CompletionSink, HistoryStore, MemorySink, StoreError, StoreResult};
pub use models::{
    CompletionRecord, Phase, Progress, Routine, RoutineStep, SessionSnapshot, StepCategory,
};
pub use runner::{SessionRunner, DEFAULT_TICK_INTERVAL};
pub use session_engine::{SessionEngine, StepOutcome};
pub use stats::{calculate_history_stats, HistoryStats};
pub use ticker::{TickFlow, Ticker};
