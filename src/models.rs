//! Wire DTOs for the activity API and the client-visible task entity.
//!
//! Uses String for IDs and RFC 3339 strings for wire timestamps for maximum
//! compatibility with server deployments (some send numeric IDs).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Timer state of a task, as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerStatus::Idle => write!(f, "idle"),
            TimerStatus::Running => write!(f, "running"),
            TimerStatus::Paused => write!(f, "paused"),
        }
    }
}

/// Timer transition requested from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerAction {
    Start,
    Pause,
    Stop,
    Save,
}

/// Activity as the server sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    pub recorded_time: u64,
    pub timer_status: TimerStatus,
    #[serde(default)]
    pub last_timer_start: Option<String>,
    #[serde(default)]
    pub tags: Vec<TagDto>,
}

/// Tag object attached to an activity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagDto {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
}

/// Body for `POST /activities`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateActivityRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub due_date: String,
}

/// Body for `PUT /activities/{id}`
///
/// Partial-update semantics: `None` fields are omitted from the payload
/// entirely. `end_time` is tri-state - omitted, explicit `null` (clears the
/// completion timestamp), or a timestamp. Title is always present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateActivityRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer_status: Option<TimerStatus>,
}

/// Body for `POST /activities/{id}/timer`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerActionRequest {
    pub action: TimerAction,
}

/// A task as the client sees it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    /// Cumulative tracked seconds, authoritative on the server
    pub recorded_time: u64,
    pub timer_status: TimerStatus,
    /// Set iff the timer is currently running
    pub last_timer_start: Option<DateTime<Utc>>,
}

/// Input for creating a task
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDate>,
}

/// Partial update of a task; absent fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub tags: Option<Vec<String>>,
    pub due_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub recorded_time: Option<u64>,
    pub timer_status: Option<TimerStatus>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn activity_dto_accepts_numeric_ids() {
        let dto: ActivityDto = serde_json::from_value(json!({
            "id": 42,
            "title": "Write report",
            "recorded_time": 0,
            "timer_status": "idle",
            "tags": [{"id": 7, "name": "work"}]
        }))
        .unwrap();

        assert_eq!(dto.id, "42");
        assert_eq!(dto.tags[0].id, "7");
    }

    #[test]
    fn update_request_omits_absent_fields() {
        let request = UpdateActivityRequest {
            title: "Write report".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"title": "Write report"}));
    }

    #[test]
    fn update_request_serializes_explicit_null_end_time() {
        let request = UpdateActivityRequest {
            title: "Write report".to_string(),
            end_time: Some(None),
            ..Default::default()
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({"title": "Write report", "end_time": null}));
    }

    #[test]
    fn timer_action_uses_lowercase_wire_form() {
        let body = serde_json::to_value(TimerActionRequest {
            action: TimerAction::Start,
        })
        .unwrap();
        assert_eq!(body, json!({"action": "start"}));
    }
}
