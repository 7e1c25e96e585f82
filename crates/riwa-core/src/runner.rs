//! Simulation loop runner.
//!
//! This module provides [`run_simulation`], the top-level async function
//! that drives the tick loop with support for:
//!
//! - **Bounded simulation**: stop after `max_ticks` ticks in this run
//! - **Fixed tick rate**: a tokio interval paces the ticks
//! - **Auto-save**: a snapshot every `save_interval_ticks` and at shutdown
//! - **Clean stop**: [`RunControl::request_stop`] (wired to ctrl-c by the
//!   engine) ends the loop between ticks
//! - **Natural end**: the loop stops once every seeker's storyline is over
//!
//! The runner wraps the single-tick [`run_tick`] function and adds the
//! control plane around it.
//!
//! [`run_tick`]: crate::tick::run_tick

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::persist::{self, PersistError};
use crate::tick::{self, SimulationState, TickError, TickSummary};

/// Errors that can occur during the simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// A tick execution failed.
    #[error("tick error: {source}")]
    Tick {
        /// The underlying tick error.
        #[from]
        source: TickError,
    },

    /// Writing a snapshot failed.
    #[error("persist error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: PersistError,
    },
}

/// Reason why the simulation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEndReason {
    /// Reached the configured `max_ticks` limit.
    MaxTicksReached,
    /// A stop was requested.
    StopRequested,
    /// Every seeker escaped or gave up.
    StorylineComplete,
}

/// Result of the simulation run.
#[derive(Debug)]
pub struct SimulationResult {
    /// The reason the simulation ended.
    pub end_reason: SimulationEndReason,
    /// The last tick summary, if any tick completed.
    pub final_summary: Option<TickSummary>,
    /// Number of ticks executed in this run.
    pub total_ticks: u64,
}

/// Callback invoked after each tick completes.
pub trait TickCallback: Send {
    /// Called after a tick completes successfully.
    fn on_tick(&mut self, summary: &TickSummary, state: &SimulationState);
}

/// A no-op tick callback for testing.
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _summary: &TickSummary, _state: &SimulationState) {}
}

/// Run-loop parameters and the shared stop flag.
///
/// Wrap in [`std::sync::Arc`] to request a stop from another task.
#[derive(Debug)]
pub struct RunControl {
    stop_requested: AtomicBool,
    stop_notify: Notify,
    tick_interval: Duration,
    max_ticks: u64,
    save_path: Option<PathBuf>,
    save_interval_ticks: u64,
}

impl RunControl {
    /// Create run controls.
    ///
    /// A non-finite or negative `tick_rate_secs` runs ticks back to back.
    /// `max_ticks` of 0 means unlimited. Without a `save_path` nothing is
    /// written.
    pub fn new(
        tick_rate_secs: f64,
        max_ticks: u64,
        save_path: Option<PathBuf>,
        save_interval_ticks: u64,
    ) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            tick_interval: Duration::try_from_secs_f64(tick_rate_secs).unwrap_or(Duration::ZERO),
            max_ticks,
            save_path,
            save_interval_ticks,
        }
    }

    /// Request a clean stop.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        self.stop_notify.notify_one();
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }

    /// Time between ticks.
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Tick limit (0 = unlimited).
    pub const fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    /// Returns `true` if `max_ticks > 0` and `ticks_run >= max_ticks`.
    pub const fn tick_limit_reached(&self, ticks_run: u64) -> bool {
        self.max_ticks > 0 && ticks_run >= self.max_ticks
    }

    /// Whether an auto-save is due after `ticks_run` ticks.
    pub const fn save_due(&self, ticks_run: u64) -> bool {
        self.save_path.is_some()
            && self.save_interval_ticks > 0
            && ticks_run > 0
            && matches!(ticks_run.checked_rem(self.save_interval_ticks), Some(0))
    }
}

/// Run the simulation loop until a termination condition is met.
///
/// # Errors
///
/// Returns [`RunnerError`] if a tick fails or a snapshot cannot be
/// written.
pub async fn run_simulation(
    state: &mut SimulationState,
    control: &RunControl,
    callback: &mut dyn TickCallback,
) -> Result<SimulationResult, RunnerError> {
    let mut last_summary: Option<TickSummary> = None;
    let mut total_ticks: u64 = 0;

    let mut interval = (!control.tick_interval.is_zero()).then(|| {
        let mut interval = tokio::time::interval(control.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    info!(
        start_tick = state.clock.tick(),
        max_ticks = control.max_ticks,
        tick_interval = ?control.tick_interval,
        seekers = state.seekers.len(),
        "Simulation starting"
    );

    let end_reason = loop {
        if control.is_stop_requested() {
            info!("Stop requested");
            break SimulationEndReason::StopRequested;
        }

        if let Some(interval) = interval.as_mut() {
            tokio::select! {
                _ = interval.tick() => {}
                () = control.stopped() => continue,
            }
        }

        let summary = tick::run_tick(state)?;
        total_ticks = total_ticks.saturating_add(1);
        callback.on_tick(&summary, state);

        if control.save_due(total_ticks) {
            save(state, control)?;
        }

        if summary.settled {
            info!(tick = summary.tick, "Every seeker's storyline is complete");
            last_summary = Some(summary);
            break SimulationEndReason::StorylineComplete;
        }

        if control.tick_limit_reached(total_ticks) {
            info!(
                tick = summary.tick,
                max_ticks = control.max_ticks,
                "Tick limit reached"
            );
            last_summary = Some(summary);
            break SimulationEndReason::MaxTicksReached;
        }

        last_summary = Some(summary);

        if interval.is_none() {
            // Let the stop task run between back-to-back ticks.
            tokio::task::yield_now().await;
        }
    };

    save(state, control)?;

    Ok(SimulationResult {
        end_reason,
        final_summary: last_summary,
        total_ticks,
    })
}

/// Write a snapshot if a save path is configured.
fn save(state: &SimulationState, control: &RunControl) -> Result<(), PersistError> {
    if let Some(path) = control.save_path.as_deref() {
        persist::save(path, &state.snapshot())?;
        info!(path = %path.display(), tick = state.clock.tick(), "Auto-saved");
    }
    Ok(())
}

/// Log the simulation end sequence.
pub fn log_simulation_end(result: &SimulationResult, state: &SimulationState) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_summary.as_ref().map(|s| s.tick),
        "Simulation ended"
    );

    if result.final_summary.is_some() {
        info!(
            energy_available = state.universe.available_energy(),
            energy_consumed = state.universe.consumed(),
            escaped = state.universe.entities_escaped().len(),
            gateway_active = state.coordinator.gateway().is_active,
            "Final universe state"
        );
        for attempt in state.coordinator.current_attempts() {
            info!(
                entity = %attempt.entity_id,
                status = %attempt.status,
                fragments = attempt.sacred_count(),
                message = %attempt.result_message,
                "Final attempt"
            );
        }
    } else {
        warn!("Simulation ended with no ticks executed");
    }
}
