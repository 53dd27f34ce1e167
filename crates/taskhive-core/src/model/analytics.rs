use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HiveError, Result};

/// Services allowed to emit events.
pub const KNOWN_SERVICES: &[&str] = &[
    "user-service",
    "task-service",
    "analytics-service",
    "file-service",
    "frontend-service",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Task,
    User,
    System,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Task => write!(f, "task"),
            Self::User => write!(f, "user"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            _ => Err(format!("unknown event type: {s}")),
        }
    }
}

/// Append-only event record. Never mutated after creation; read back only
/// through aggregate queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub event_name: String,
    pub event_type: EventType,
    pub source_service: String,
    pub user_id: Option<i64>,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub event_type: String,
    /// Emitting service; absent means the browser-facing frontend.
    #[serde(default)]
    pub source_service: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub task_id: Option<i64>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl AnalyticsEvent {
    /// Build an event from the wire input, deriving the name from the
    /// type and folding the task reference into the metadata payload.
    pub fn from_input(input: CreateEventInput, source_service: &str) -> Result<Self> {
        let event_type: EventType = input
            .event_type
            .parse()
            .map_err(HiveError::InvalidInput)?;

        if !KNOWN_SERVICES.contains(&source_service) {
            return Err(HiveError::InvalidInput(format!(
                "unknown source service: {source_service}"
            )));
        }

        Ok(Self {
            id: 0,
            event_name: format!("{event_type}_event"),
            event_type,
            source_service: source_service.to_string(),
            user_id: input.user_id,
            metadata: serde_json::json!({
                "task_id": input.task_id,
                "data": input.data.unwrap_or_else(|| serde_json::json!({})),
            }),
            occurred_at: Utc::now(),
        })
    }
}

/// Aggregates over the event store, returned by the dashboard endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub total_events: usize,
    pub task_events: usize,
    pub user_events: usize,
    pub system_events: usize,
    pub events_last_7_days: usize,
    pub period: String,
    pub generated_at: DateTime<Utc>,
}
