//! Timer state machine and the local one-second tick engine.
//!
//! Timer transitions are confirmation-gated: nothing changes locally until
//! the server returns the fresh activity snapshot. The only local state is
//! the sync anchor - the moment a snapshot was adopted - which lets the
//! display extrapolate elapsed seconds between syncs without drifting from
//! the authoritative recorded time.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::models::{Task, TimerStatus};

/// Why a timer transition was rejected before reaching the network
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is already running")]
    AlreadyRunning,

    #[error("completed task cannot be started")]
    Completed,
}

/// What to do with a pause request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseDisposition {
    /// Timer is running; send the pause action to the server
    Send,
    /// Timer is not running; accept silently without a network call
    Noop,
}

struct Anchor {
    task_id: String,
    recorded_at_sync: u64,
    synced_at: Instant,
}

/// Owns the sync anchor and validates transitions locally.
#[derive(Default)]
pub struct TimerMachine {
    anchor: Option<Anchor>,
}

impl TimerMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local gate for a start request. Completed tasks are terminal and a
    /// running timer must be paused or finished first.
    pub fn check_start(task: &Task) -> Result<(), TimerError> {
        if task.completed {
            return Err(TimerError::Completed);
        }
        if task.timer_status == TimerStatus::Running {
            return Err(TimerError::AlreadyRunning);
        }
        Ok(())
    }

    /// Pausing an already-paused or idle timer is a no-op, never an error:
    /// it must not corrupt the recorded time.
    pub fn check_pause(task: &Task) -> PauseDisposition {
        match task.timer_status {
            TimerStatus::Running => PauseDisposition::Send,
            TimerStatus::Idle | TimerStatus::Paused => PauseDisposition::Noop,
        }
    }

    /// Adopt a fresh authoritative snapshot, resetting the sync anchor.
    pub fn adopt(&mut self, task: &Task) {
        self.adopt_at(task, Instant::now());
    }

    fn adopt_at(&mut self, task: &Task, at: Instant) {
        self.anchor = Some(Anchor {
            task_id: task.id.clone(),
            recorded_at_sync: task.recorded_time,
            synced_at: at,
        });
    }

    pub fn clear(&mut self) {
        self.anchor = None;
    }

    /// Recorded time to show the user: the anchored value plus wall-clock
    /// seconds since the anchor while running, the bare recorded time
    /// otherwise.
    pub fn displayed_time(&self, task: &Task, now: Instant) -> u64 {
        if task.timer_status != TimerStatus::Running {
            return task.recorded_time;
        }
        match &self.anchor {
            Some(anchor) if anchor.task_id == task.id => {
                anchor.recorded_at_sync + now.duration_since(anchor.synced_at).as_secs()
            }
            _ => task.recorded_time,
        }
    }
}

/// Cancellable once-per-second counter publishing through a watch channel.
///
/// The counter is seeded from the authoritative recorded time on every
/// (re)arm and only ever incremented by the tick task; a fresh snapshot
/// resets it rather than adjusting it.
pub struct Ticker {
    seconds: Arc<watch::Sender<u64>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new() -> (Self, watch::Receiver<u64>) {
        let (tx, rx) = watch::channel(0);
        (
            Self {
                seconds: Arc::new(tx),
                handle: None,
            },
            rx,
        )
    }

    /// Arm the ticker, seeding the counter. Any previous tick task is
    /// cancelled first so intervals never accumulate.
    pub fn arm(&mut self, seed: u64) {
        self.disarm();
        self.seconds.send_replace(seed);

        let seconds = Arc::clone(&self.seconds);
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // the first tick of a tokio interval fires immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                seconds.send_modify(|count| *count += 1);
            }
        }));
    }

    /// Cancel the tick task. The last published value stays visible.
    pub fn disarm(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Publish a value without arming, e.g. after adopting a paused snapshot.
    pub fn set(&self, value: u64) {
        self.seconds.send_replace(value);
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.disarm();
    }
}

/// Format seconds as `mm:ss`, growing to `h:mm:ss` past an hour.
pub fn format_elapsed(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
