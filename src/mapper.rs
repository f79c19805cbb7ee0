//! Conversion between wire activity DTOs and client tasks.
//!
//! All conversions are pure and infallible: malformed dates coming off the
//! wire are logged and treated as absent, never bubbled up as errors.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::{
    ActivityDto, CreateActivityRequest, Task, TaskDraft, TaskPatch, UpdateActivityRequest,
};

/// Map a wire activity to the client task entity.
///
/// Completion is derived from the presence of `end_time`. The due date comes
/// from `due_date` when set, then from the date part of `end_time`, then
/// falls back to today.
pub fn to_task(dto: &ActivityDto) -> Task {
    let due_date = parse_date(dto.due_date.as_deref())
        .or_else(|| parse_date(dto.end_time.as_deref()))
        .unwrap_or_else(|| Utc::now().date_naive());

    Task {
        id: dto.id.clone(),
        title: dto.title.clone(),
        description: dto.description.clone(),
        tags: dto.tags.iter().map(|tag| tag.name.clone()).collect(),
        due_date: Some(due_date),
        completed: dto.end_time.is_some(),
        recorded_time: dto.recorded_time,
        timer_status: dto.timer_status,
        last_timer_start: parse_timestamp(dto.last_timer_start.as_deref()),
    }
}

/// Build a creation request; the due date defaults to today.
pub fn to_create_request(draft: &TaskDraft) -> CreateActivityRequest {
    CreateActivityRequest {
        title: draft.title.clone(),
        description: draft.description.clone(),
        tags: draft.tags.clone(),
        due_date: draft
            .due_date
            .unwrap_or_else(|| Utc::now().date_naive())
            .to_string(),
    }
}

/// Build a partial update request.
///
/// Title is mandatory on the wire and falls back to the original task's
/// title. `completed: Some(true)` emits a completion timestamp of now;
/// `Some(false)` emits an explicit null to clear it. Everything absent from
/// the patch is omitted from the payload.
pub fn to_update_request(patch: &TaskPatch, original: &Task) -> UpdateActivityRequest {
    UpdateActivityRequest {
        title: patch
            .title
            .clone()
            .unwrap_or_else(|| original.title.clone()),
        tags: patch.tags.clone(),
        due_date: patch.due_date.map(|date| date.to_string()),
        end_time: patch
            .completed
            .map(|done| done.then(|| Utc::now().to_rfc3339())),
        recorded_time: patch.recorded_time,
        timer_status: patch.timer_status,
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?;
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    tracing::warn!(value = raw, "ignoring malformed date from server");
    None
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(error) => {
            tracing::warn!(value = raw, %error, "ignoring malformed timestamp from server");
            None
        }
    }
}
