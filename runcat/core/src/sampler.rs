//! CPU Load Sampler
//!
//! Periodically measures system-wide CPU utilization and hands each reading
//! to a callback.
//!
//! # Design
//!
//! Each `start` creates a fresh *run*: a tokio task plus a `live` flag and a
//! reentrant gate owned by that run alone. The task holds the gate while it
//! checks `live` and invokes the callback. `stop` clears `live` and then
//! takes the gate, so it returns only after any in-flight callback has
//! finished, and no callback of that run can start afterwards. Because the
//! gate is reentrant, calling `stop` from inside the callback does not
//! deadlock.
//!
//! ```text
//!   start ──▶ discard first reading ──▶ spawn run
//!                                         │
//!             ┌──── tick (≥ 1s) ◀─────────┘
//!             ▼
//!          sample ─ error ─▶ warn, skip
//!             │ ok
//!             ▼
//!      gate.lock() ─▶ live? ─ no ─▶ exit
//!             │ yes
//!             ▼
//!      on_sample(clamped)
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};
use sysinfo::System;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

/// Shortest sampling period accepted by [`LoadSampler::start`]
pub const MIN_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Errors from a single CPU measurement
#[derive(Debug, Error)]
pub enum SampleError {
    /// The measurement could not be taken
    #[error("CPU sample unavailable: {0}")]
    Unavailable(String),
}

/// Source of instantaneous CPU utilization readings
pub trait CpuProbe: Send {
    /// Utilization in percent across all cores
    ///
    /// # Errors
    ///
    /// Returns `SampleError` when no reading can be produced right now.
    fn sample(&mut self) -> Result<f64, SampleError>;
}

/// [`CpuProbe`] backed by `sysinfo`
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    /// Create a probe with its baseline refresh already taken
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        Self { system }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuProbe for SysinfoProbe {
    fn sample(&mut self) -> Result<f64, SampleError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(SampleError::Unavailable(
                "CPU statistics not supported on this OS".to_string(),
            ));
        }
        self.system.refresh_cpu();
        let usage = f64::from(self.system.global_cpu_info().cpu_usage());
        if usage.is_finite() {
            Ok(usage)
        } else {
            Err(SampleError::Unavailable(format!("bogus reading {usage}")))
        }
    }
}

/// Callback receiving each reading, in percent within `[0, 100]`
pub type SampleCallback = Arc<dyn Fn(f64) + Send + Sync>;

struct Run {
    live: Arc<AtomicBool>,
    gate: Arc<ReentrantMutex<()>>,
    task: JoinHandle<()>,
}

/// Periodic CPU sampler
pub struct LoadSampler {
    probe: Arc<Mutex<Box<dyn CpuProbe>>>,
    run: Mutex<Option<Run>>,
}

impl LoadSampler {
    /// Create a stopped sampler around a probe
    #[must_use]
    pub fn new(probe: Box<dyn CpuProbe>) -> Self {
        Self {
            probe: Arc::new(Mutex::new(probe)),
            run: Mutex::new(None),
        }
    }

    /// Sampler using the OS CPU counters
    #[must_use]
    pub fn system() -> Self {
        Self::new(Box::new(SysinfoProbe::new()))
    }

    /// Begin sampling every `max(interval, 1s)`
    ///
    /// The reading taken right away is discarded; the first callback comes
    /// one period later. Returns `false` without doing anything if the
    /// sampler is already running or there is no tokio runtime to run on.
    pub fn start<F>(&self, interval: Duration, on_sample: F) -> bool
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        let mut run = self.run.lock();
        if run.is_some() {
            debug!("Sampler already running");
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Sampler started outside a tokio runtime, ignoring");
            return false;
        };

        let period = interval.max(MIN_SAMPLE_INTERVAL);

        // First readings from most counters are meaningless
        if let Err(e) = self.probe.lock().sample() {
            debug!(error = %e, "Priming sample failed");
        }

        let live = Arc::new(AtomicBool::new(true));
        let gate = Arc::new(ReentrantMutex::new(()));
        let task = runtime.spawn(sample_loop(
            Arc::clone(&self.probe),
            period,
            Arc::clone(&live),
            Arc::clone(&gate),
            Arc::new(on_sample),
        ));

        *run = Some(Run { live, gate, task });
        info!(period_ms = period.as_millis(), "Load sampler started");
        true
    }

    /// Stop sampling
    ///
    /// Safe when never started. Once this returns, the callback passed to
    /// the stopped run is never invoked again.
    pub fn stop(&self) {
        let Some(run) = self.run.lock().take() else {
            return;
        };

        run.live.store(false, Ordering::SeqCst);
        // Wait out a callback in flight on another thread. Re-entrant when
        // stop is called from inside the callback itself.
        drop(run.gate.lock());
        run.task.abort();
        info!("Load sampler stopped");
    }

    /// Whether a run is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run.lock().is_some()
    }
}

impl Drop for LoadSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for LoadSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadSampler")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn sample_loop(
    probe: Arc<Mutex<Box<dyn CpuProbe>>>,
    period: Duration,
    live: Arc<AtomicBool>,
    gate: Arc<ReentrantMutex<()>>,
    on_sample: SampleCallback,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let reading = probe.lock().sample();
        match reading {
            Ok(percent) => {
                if !deliver(&gate, &live, &on_sample, clamp_percent(percent)) {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "CPU sample failed, keeping previous reading"),
        }
    }
    trace!("Sample loop exited");
}

/// Invoke the callback under the run gate. Returns `false` once the run is dead.
fn deliver(
    gate: &ReentrantMutex<()>,
    live: &AtomicBool,
    on_sample: &SampleCallback,
    percent: f64,
) -> bool {
    let _gate = gate.lock();
    if !live.load(Ordering::SeqCst) {
        return false;
    }
    trace!(percent, "CPU sample");
    on_sample(percent);
    true
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}
