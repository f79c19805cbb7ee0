//! In-memory task collection and the single entry point for mutations.
//!
//! The store owns the loaded page of tasks, the timer machine, the tick
//! engine, and the persisted selection. Every remote call is confirmation
//! gated: local state changes only after the server has answered, so there
//! is nothing to roll back on failure. Operations resolve to a success
//! indicator rather than propagating errors; the most recent failure
//! message is held until the next attempt.

use chrono::NaiveDate;
use std::cmp::Ordering;
use std::time::Instant;
use tokio::sync::watch;

use crate::api::{ActivityClient, ApiError};
use crate::mapper;
use crate::models::{Task, TaskDraft, TaskPatch, TimerAction, TimerStatus};
use crate::selection::SelectionStore;
use crate::timer::{PauseDisposition, Ticker, TimerMachine};

/// Page size used when an operation needs to re-fetch
pub const DEFAULT_PAGE_SIZE: u32 = 15;

pub struct ActivityStore {
    client: ActivityClient,
    selection: Box<dyn SelectionStore>,
    tasks: Vec<Task>,
    selected: Option<String>,
    tag_filter: Option<String>,
    loading: bool,
    last_error: Option<String>,
    machine: TimerMachine,
    ticker: Ticker,
    ticks: watch::Receiver<u64>,
}

impl ActivityStore {
    pub fn new(client: ActivityClient, selection: Box<dyn SelectionStore>) -> Self {
        let (ticker, ticks) = Ticker::new();
        Self {
            client,
            selection,
            tasks: Vec::new(),
            selected: None,
            tag_filter: None,
            loading: false,
            last_error: None,
            machine: TimerMachine::new(),
            ticker,
            ticks,
        }
    }

    // ---- views ----------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let id = self.selected.as_deref()?;
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn tag_filter(&self) -> Option<&str> {
        self.tag_filter.as_deref()
    }

    /// Receiver of the one-second display counter
    pub fn ticks(&self) -> watch::Receiver<u64> {
        self.ticks.clone()
    }

    /// Display value for the selected task, extrapolated while running
    pub fn displayed_time(&self) -> Option<u64> {
        let task = self.selected_task()?;
        Some(self.machine.displayed_time(task, Instant::now()))
    }

    /// Tasks due on the given date, computed over the loaded page
    pub fn due_on(&self, date: NaiveDate) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.due_date == Some(date))
            .collect()
    }

    /// Display ordering: incomplete with the earliest due date first,
    /// undated after dated, completed last. Ties keep page order.
    pub fn sorted(&self) -> Vec<&Task> {
        fn rank(task: &Task) -> u8 {
            match (task.completed, task.due_date.is_some()) {
                (false, true) => 0,
                (false, false) => 1,
                (true, _) => 2,
            }
        }

        let mut view: Vec<&Task> = self.tasks.iter().collect();
        view.sort_by(|a, b| {
            rank(a).cmp(&rank(b)).then_with(|| {
                if a.completed || b.completed {
                    Ordering::Equal
                } else {
                    match (a.due_date, b.due_date) {
                        (Some(left), Some(right)) => left.cmp(&right),
                        _ => Ordering::Equal,
                    }
                }
            })
        });
        view
    }

    // ---- collection operations ------------------------------------------

    /// Fetch a page of tasks with the current tag filter and replace the
    /// whole collection with it. The persisted selection is reconciled
    /// against the fresh page: a remembered id that is gone clears it.
    pub async fn load(&mut self, skip: u32, limit: u32) -> bool {
        self.begin();
        let result = self
            .client
            .list_activities(skip, limit, self.tag_filter.as_deref())
            .await;
        self.loading = false;

        match result {
            Ok(activities) => {
                self.tasks = activities.iter().map(mapper::to_task).collect();
                tracing::info!(count = self.tasks.len(), "loaded task page");
                self.restore_selection();
                true
            }
            Err(error) => {
                self.fail("Failed to load tasks", &error);
                false
            }
        }
    }

    /// Set the remote tag filter and re-fetch the first page
    pub async fn set_tag_filter(&mut self, tag: Option<String>) -> bool {
        self.tag_filter = tag;
        self.load(0, DEFAULT_PAGE_SIZE).await
    }

    /// Create a task; the confirmed result is inserted at the head.
    pub async fn create(&mut self, draft: &TaskDraft) -> Option<Task> {
        if draft.title.trim().is_empty() {
            self.last_error = Some("Title must not be empty".to_string());
            return None;
        }

        let request = mapper::to_create_request(draft);
        self.begin();
        let result = self.client.create_activity(&request).await;
        self.loading = false;

        match result {
            Ok(activity) => {
                let task = mapper::to_task(&activity);
                tracing::info!(id = %task.id, title = %task.title, "created task");
                self.tasks.insert(0, task.clone());
                Some(task)
            }
            Err(error) => {
                self.fail("Failed to create task", &error);
                None
            }
        }
    }

    /// Update a task that exists in the loaded page. An unknown id is a
    /// local hard stop - it means the client view is stale - and no network
    /// call is made.
    pub async fn update(&mut self, id: &str, patch: TaskPatch) -> Option<Task> {
        let Some(original) = self.tasks.iter().find(|task| task.id == id).cloned() else {
            self.fail_local(format!("Task {id} not found in the loaded page"));
            return None;
        };

        let request = mapper::to_update_request(&patch, &original);
        self.begin();
        let result = self.client.update_activity(id, &request).await;
        self.loading = false;

        match result {
            Ok(activity) => {
                let task = mapper::to_task(&activity);
                self.adopt_snapshot(&task);
                Some(task)
            }
            Err(error) => {
                self.fail(&format!("Failed to update task {id}"), &error);
                None
            }
        }
    }

    /// Delete remotely first; the local copy goes only after the server
    /// confirmed.
    pub async fn delete(&mut self, id: &str) -> bool {
        self.begin();
        let result = self.client.delete_activity(id).await;
        self.loading = false;

        match result {
            Ok(()) => {
                self.tasks.retain(|task| task.id != id);
                tracing::info!(id = %id, "deleted task");
                if self.selected.as_deref() == Some(id) {
                    self.drop_selection();
                }
                true
            }
            Err(error) => {
                self.fail(&format!("Failed to delete task {id}"), &error);
                false
            }
        }
    }

    /// Flip completion - a composition over `update`, not a primitive.
    pub async fn toggle_complete(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter().find(|task| task.id == id) else {
            self.fail_local(format!("Task {id} not found in the loaded page"));
            return false;
        };

        let patch = TaskPatch {
            completed: Some(!task.completed),
            ..Default::default()
        };
        self.update(id, patch).await.is_some()
    }

    // ---- timer operations -----------------------------------------------

    /// Start the timer. Rejected locally, without a network call, when the
    /// task is completed or already running.
    pub async fn start(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter().find(|task| task.id == id) else {
            self.fail_local(format!("Task {id} not found in the loaded page"));
            return false;
        };
        if let Err(error) = TimerMachine::check_start(task) {
            self.fail_local(format!("Cannot start timer: {error}"));
            return false;
        }

        self.begin();
        let result = self.client.timer_action(id, TimerAction::Start).await;
        self.loading = false;

        match result {
            Ok(activity) => {
                let task = mapper::to_task(&activity);
                tracing::info!(id = %id, recorded_time = task.recorded_time, "timer started");
                self.adopt_snapshot(&task);
                true
            }
            Err(error) => {
                self.fail("Failed to start timer", &error);
                false
            }
        }
    }

    /// Pause the timer. Pausing a timer that is not running is accepted
    /// silently and leaves the recorded time untouched.
    pub async fn pause(&mut self, id: &str) -> bool {
        let Some(task) = self.tasks.iter().find(|task| task.id == id) else {
            self.fail_local(format!("Task {id} not found in the loaded page"));
            return false;
        };
        if TimerMachine::check_pause(task) == PauseDisposition::Noop {
            tracing::debug!(id = %id, "pause requested but timer is not running");
            return true;
        }

        self.begin();
        let result = self.client.timer_action(id, TimerAction::Pause).await;
        self.loading = false;

        match result {
            Ok(activity) => {
                let task = mapper::to_task(&activity);
                tracing::info!(id = %id, recorded_time = task.recorded_time, "timer paused");
                self.adopt_snapshot(&task);
                true
            }
            Err(error) => {
                self.fail("Failed to pause timer", &error);
                false
            }
        }
    }

    /// Stop the timer and mark the task completed. Valid from running or
    /// paused. Confirmation is the caller's responsibility; this is not
    /// undoable. Clears the selection afterwards.
    pub async fn finish(&mut self, id: &str) -> bool {
        if !self.tasks.iter().any(|task| task.id == id) {
            self.fail_local(format!("Task {id} not found in the loaded page"));
            return false;
        }

        self.begin();
        let result = self.client.timer_action(id, TimerAction::Stop).await;
        self.loading = false;

        match result {
            Ok(activity) => {
                let task = mapper::to_task(&activity);
                tracing::info!(id = %id, recorded_time = task.recorded_time, "timer stopped");
                self.adopt_snapshot(&task);
            }
            Err(error) => {
                self.fail("Failed to stop timer", &error);
                return false;
            }
        }

        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        if self.update(id, patch).await.is_none() {
            return false;
        }

        if self.selected.as_deref() == Some(id) {
            self.drop_selection();
        }
        true
    }

    // ---- selection ------------------------------------------------------

    /// Change the selected task. Ignored while the currently selected
    /// task's timer is running, so a running timer always has a visible
    /// counter.
    pub fn select(&mut self, id: Option<&str>) -> bool {
        if let Some(current) = self.selected_task()
            && current.timer_status == TimerStatus::Running
        {
            tracing::debug!("selection change ignored while a timer is running");
            return false;
        }

        match id {
            None => {
                self.drop_selection();
                true
            }
            Some(id) => {
                let Some(task) = self.tasks.iter().find(|task| task.id == id).cloned() else {
                    self.fail_local(format!("Task {id} not found in the loaded page"));
                    return false;
                };
                self.selected = Some(id.to_string());
                if let Err(error) = self.selection.set(id) {
                    tracing::warn!(%error, "failed to persist selected task");
                }
                self.anchor_to(&task);
                true
            }
        }
    }

    /// Re-apply the remembered selection against the freshly loaded page.
    fn restore_selection(&mut self) {
        let remembered = self.selected.clone().or_else(|| self.selection.get());
        let Some(id) = remembered else {
            return;
        };

        match self.tasks.iter().find(|task| task.id == id).cloned() {
            Some(task) => {
                self.selected = Some(id);
                self.anchor_to(&task);
            }
            None => {
                tracing::info!(id = %id, "remembered task is gone; clearing selection");
                self.drop_selection();
            }
        }
    }

    // ---- internals ------------------------------------------------------

    fn begin(&mut self) {
        self.loading = true;
        self.last_error = None;
    }

    fn fail(&mut self, what: &str, error: &ApiError) {
        tracing::error!(%error, "{what}");
        self.last_error = Some(format!("{what}: {error}"));
    }

    fn fail_local(&mut self, message: String) {
        tracing::error!("{message}");
        self.last_error = Some(message);
    }

    /// Replace the task in the collection by identity and, if it is the
    /// selected one, reset the sync anchor and re-arm or disarm the ticker
    /// to match the confirmed status.
    fn adopt_snapshot(&mut self, task: &Task) {
        if let Some(slot) = self.tasks.iter_mut().find(|slot| slot.id == task.id) {
            *slot = task.clone();
        }
        if self.selected.as_deref() == Some(task.id.as_str()) {
            self.anchor_to(task);
        }
    }

    fn anchor_to(&mut self, task: &Task) {
        self.machine.adopt(task);
        if task.timer_status == TimerStatus::Running {
            self.ticker.arm(task.recorded_time);
        } else {
            self.ticker.disarm();
            self.ticker.set(task.recorded_time);
        }
    }

    fn drop_selection(&mut self) {
        self.selected = None;
        self.machine.clear();
        self.ticker.disarm();
        if let Err(error) = self.selection.clear() {
            tracing::warn!(%error, "failed to clear persisted selection");
        }
    }
}
