//! Task entity and status model.
//!
//! A [`Task`] is the persisted record of one submitted unit of work. The
//! `result` payload is opaque to this crate: it is stored and returned
//! verbatim ([`RawValue`]), never parsed. Only the work function that
//! produced it and the API client that reads it care about its shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Lifecycle status of a task.
///
/// Transitions are strictly forward: `pending → processing → completed`
/// or `pending → processing → failed`. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse a stored status string. Returns `None` for anything that is not
    /// one of the four lifecycle states.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }

    /// `completed` and `failed` are terminal — no further transitions occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of submitted work, tracked through its status lifecycle.
///
/// JSON shape: `result` and `error` are omitted entirely while empty.
/// At most one of them is ever set, and only in the matching terminal
/// state (`result` ⇒ completed, `error` ⇒ failed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Store-assigned UUID. Immutable once assigned; empty before `create`.
    pub id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Box<RawValue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set by the store on create; never changes afterwards.
    pub created_at: DateTime<Utc>,
    /// Refreshed by the store on every persisted mutation. Non-decreasing.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a fresh pending task with no payload. The store fills in the
    /// id and the real timestamps on `create`.
    pub fn pending() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for s in ["pending", "processing", "completed", "failed"] {
            let status = TaskStatus::parse(s).unwrap();
            assert_eq!(status.as_str(), s);
        }
        assert!(TaskStatus::parse("cancelled").is_none());
        assert!(TaskStatus::parse("").is_none());
    }

    #[test]
    fn terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn pending_task_serializes_without_payload_fields() {
        let task = Task::pending();
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(!json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn completed_task_serializes_result_verbatim() {
        let mut task = Task::pending();
        task.status = TaskStatus::Completed;
        task.result = Some(
            serde_json::value::RawValue::from_string(r#"{"message":"done","count":3}"#.into())
                .unwrap(),
        );
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains(r#""result":{"message":"done","count":3}"#));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn task_json_round_trip() {
        let mut task = Task::pending();
        task.id = "abc".into();
        task.status = TaskStatus::Failed;
        task.error = Some("boom".into());
        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "abc");
        assert_eq!(back.status, TaskStatus::Failed);
        assert_eq!(back.error.as_deref(), Some("boom"));
        assert!(back.result.is_none());
    }
}
