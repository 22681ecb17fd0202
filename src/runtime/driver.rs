//! Fixed-rate tick driver on a dedicated OS thread.
//!
//! The driver owns the [`Scheduler`] and calls [`Scheduler::step`] once per
//! period. Everything else talks to it through a [`SchedulerHandle`].
//!
//! # Design Principles
//!
//! - **No polling for shutdown**: the tick wait is a `recv_timeout` on a stop
//!   channel, so dropping the sender wakes the thread immediately
//! - **No catch-up bursts**: an overrunning tick resets the schedule instead of
//!   firing the missed ticks back to back
//! - **Clean shutdown**: the thread runs `kill_all` before exiting

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::core::{CommandGroup, CommandHandle, Scheduler, SchedulerError, SchedulerHandle};
use crate::util::clock::now_ms;

/// Dedicated thread stepping a scheduler at a fixed period.
pub struct TickDriver {
    handle: SchedulerHandle,
    stop_tx: Mutex<Option<Sender<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: AtomicBool,
    period: Duration,
}

impl TickDriver {
    /// Move `scheduler` onto a new thread ticking every `tick_period_ms`.
    ///
    /// # Errors
    ///
    /// - `SchedulerError::InvalidConfig` if the configuration is invalid
    /// - `SchedulerError::Driver` if the thread cannot be spawned
    pub fn start(config: &SchedulerConfig, scheduler: Scheduler) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let period = Duration::from_millis(config.tick_period_ms);
        let handle = scheduler.handle();
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || tick_loop(scheduler, period, &stop_rx))
            .map_err(|e| SchedulerError::Driver(format!("failed to spawn driver thread: {e}")))?;

        info!(
            period_ms = config.tick_period_ms,
            thread = %config.thread_name,
            "tick driver started"
        );

        Ok(Self {
            handle,
            stop_tx: Mutex::new(Some(stop_tx)),
            worker: Mutex::new(Some(worker)),
            shutdown: AtomicBool::new(false),
            period,
        })
    }

    /// Handle for submitting and cancelling commands.
    #[must_use]
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Tick period.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Convenience for `self.handle().submit(command)`.
    ///
    /// # Errors
    ///
    /// Same as [`SchedulerHandle::submit`].
    pub fn submit(&self, command: impl Into<CommandGroup>) -> Result<CommandHandle, SchedulerError> {
        self.handle.submit(command)
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop ticking, interrupt every active command and join the thread.
    /// Later submissions fail with `SchedulerError::ShutDown`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Driver` if the driver thread panicked.
    pub fn shutdown(&self) -> Result<(), SchedulerError> {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        info!("shutting down tick driver");
        self.handle.mark_shut_down();

        // dropping the sender wakes the thread out of recv_timeout
        self.stop_tx.lock().take();

        let worker = self.worker.lock().take();
        match worker {
            Some(worker) => worker
                .join()
                .map_err(|_| SchedulerError::Driver("driver thread panicked".into())),
            None => Ok(()),
        }
    }
}

impl Drop for TickDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("tick driver shutdown failed: {e}");
        }
    }
}

fn tick_loop(mut scheduler: Scheduler, period: Duration, stop_rx: &crossbeam_channel::Receiver<()>) {
    let mut next_tick = Instant::now();
    loop {
        scheduler.step(now_ms());

        next_tick += period;
        let now = Instant::now();
        let wait = if next_tick > now {
            next_tick - now
        } else {
            warn!(
                overrun_ms = (now - next_tick).as_millis(),
                "tick overran its period"
            );
            next_tick = now;
            Duration::ZERO
        };

        match stop_rx.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!(active = scheduler.active_len(), "driver loop exiting");
    scheduler.kill_all();
}
