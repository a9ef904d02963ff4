use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;

/// Whether the tick thread should keep firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickFlow {
    Continue,
    Stop,
}

/// Cancellable periodic timer: one thread firing a callback at a fixed
/// interval. `cancel()` joins the thread, so after it returns no further
/// tick can fire.
#[derive(Debug)]
pub struct Ticker {
    stop_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn spawn(
        interval: Duration,
        mut on_tick: impl FnMut() -> TickFlow + Send + 'static,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {
                    if on_tick() == TickFlow::Stop {
                        break;
                    }
                }
                // Sender dropped or explicit stop message.
                _ => break,
            }
        });
        debug!(interval_ms = interval.as_millis() as u64, "ticker armed");
        Self { stop_tx, handle }
    }

    /// Stops the tick thread and waits for it to finish.
    pub fn cancel(self) {
        drop(self.stop_tx);
        let _ = self.handle.join();
        debug!("ticker cancelled");
    }
}
