//! Fake-async fetch simulator.
//!
//! Development aid for exercising loading and error UI states: wraps a value
//! in a pending/failed/ready lifecycle with a random delay and a configured
//! failure probability. There is no real I/O here, and if a genuine backend
//! ever replaces the static record source this module should be deleted, not
//! adapted.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::store_bridge::lock;

/// Delay window and failure probability for simulated fetches.
#[derive(Debug, Clone, Copy)]
pub struct SimulatorConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Probability in `[0.0, 1.0]` that an attempt resolves to `Failed`.
    pub failure_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> SimulatorConfig {
        SimulatorConfig {
            min_delay_ms: 300,
            max_delay_ms: 1500,
            failure_rate: 0.25,
        }
    }
}

/// Observable result of a simulated fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Pending,
    Failed(String),
    Ready(T),
}

impl<T> FetchOutcome<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, FetchOutcome::Pending)
    }
}

/// A cancellable simulated fetch of a single value.
///
/// Each attempt runs on its own timer thread. Dropping the simulator, or
/// starting a new attempt with [`retry`](FetchSimulator::retry), cancels the
/// in-flight timer so it can never resolve into a stale outcome.
pub struct FetchSimulator<T> {
    value: T,
    config: SimulatorConfig,
    outcome: Arc<Mutex<FetchOutcome<T>>>,
    // Dropping the sender wakes the in-flight timer and cancels it.
    cancel: Option<Sender<()>>,
}

impl<T> FetchSimulator<T>
where
    T: Clone + Send + 'static,
{
    /// Starts the first attempt immediately.
    pub fn start(value: T, config: SimulatorConfig) -> FetchSimulator<T> {
        let mut simulator = FetchSimulator {
            value,
            config,
            outcome: Arc::new(Mutex::new(FetchOutcome::Pending)),
            cancel: None,
        };
        simulator.spawn_attempt();
        simulator
    }

    /// Cancels any in-flight attempt and starts a fresh one. Retrying is
    /// always explicit; a failed attempt is never retried automatically.
    pub fn retry(&mut self) {
        self.spawn_attempt();
    }

    /// Cancels the in-flight attempt, leaving the outcome as it was.
    pub fn cancel(&mut self) {
        if let Some(cancel_tx) = self.cancel.take() {
            drop(cancel_tx);
        }
    }

    /// Snapshot of the current outcome.
    pub fn outcome(&self) -> FetchOutcome<T> {
        lock(&self.outcome).clone()
    }

    fn spawn_attempt(&mut self) {
        // A fresh outcome cell per attempt: a previously cancelled timer that
        // already passed its cancellation check can only write into the
        // orphaned cell, never into this attempt's state.
        let outcome = Arc::new(Mutex::new(FetchOutcome::Pending));
        self.outcome = outcome.clone();

        let (cancel_tx, cancel_rx) = mpsc::channel::<()>();
        self.cancel = Some(cancel_tx);

        let value = self.value.clone();
        let config = self.config;

        thread::spawn(move || {
            let delay = pick_delay_ms(&config);
            match cancel_rx.recv_timeout(Duration::from_millis(delay)) {
                Err(RecvTimeoutError::Timeout) => {
                    let failure_rate = config.failure_rate.clamp(0.0, 1.0);
                    let resolved = if rand::thread_rng().gen_bool(failure_rate) {
                        FetchOutcome::Failed("Simulated fetch failure".to_string())
                    } else {
                        FetchOutcome::Ready(value)
                    };
                    *lock(&outcome) = resolved;
                }
                // Sender dropped or explicit signal: attempt cancelled.
                _ => {}
            }
        });
    }
}

fn pick_delay_ms(config: &SimulatorConfig) -> u64 {
    let (lo, hi) = if config.min_delay_ms <= config.max_delay_ms {
        (config.min_delay_ms, config.max_delay_ms)
    } else {
        (config.max_delay_ms, config.min_delay_ms)
    };
    if lo == hi {
        return lo;
    }
    rand::thread_rng().gen_range(lo..=hi)
}
