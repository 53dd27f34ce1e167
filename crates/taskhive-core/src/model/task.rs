use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{HiveError, Result};

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;

/// Days ahead of the due date that count as "due soon".
pub const DUE_SOON_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    /// The fixed directed-edge set governing legal status changes.
    /// Creation is not a transition; this only constrains updates to an
    /// already-persisted task.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (InProgress, Pending)
                | (Completed, Pending)
                | (Cancelled, Pending)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown task status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl std::fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("unknown task priority: {s}")),
        }
    }
}

/// An illegal status transition, naming both ends of the attempted edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Cannot transition from {from} to {to}")]
pub struct StatusError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Reference into the User Service; not enforced locally.
    pub user_id: i64,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a new task with default status and priority. An explicit initial status
    /// bypasses transition checks since creation is not a transition.
    pub fn new(user_id: i64, input: CreateTaskInput) -> Self {
        let now = Utc::now();
        let mut task = Self {
            id: 0,
            title: input.title.trim().to_string(),
            description: input.description.trim().to_string(),
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            user_id,
            due_date: input.due_date,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        task.touch_completion();
        task
    }

    /// Validated status transition. On an illegal edge nothing is mutated
    /// and the error names both the current and attempted state.
    pub fn transition_to(&mut self, next: TaskStatus) -> std::result::Result<(), StatusError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusError {
                from: self.status,
                to: next,
            });
        }
        self.set_status_unchecked(next);
        Ok(())
    }

    /// Programmatic status write that skips the legality check. Used by
    /// [`transition_to`](Self::transition_to) after it has validated the
    /// edge, so the check never runs twice.
    pub fn set_status_unchecked(&mut self, next: TaskStatus) {
        self.status = next;
        self.touch_completion();
        self.updated_at = Utc::now();
    }

    /// Apply a generic field update. A status change through this path IS
    /// subject to the legality check.
    pub fn apply_update(&mut self, input: &UpdateTaskInput) -> Result<()> {
        if let Some(next) = input.status {
            if next != self.status && !self.status.can_transition_to(next) {
                return Err(StatusError {
                    from: self.status,
                    to: next,
                }
                .into());
            }
        }

        if let Some(ref title) = input.title {
            self.title = title.trim().to_string();
        }
        if let Some(ref description) = input.description {
            self.description = description.trim().to_string();
        }
        if let Some(priority) = input.priority {
            self.priority = priority;
        }
        if let Some(due_date) = input.due_date {
            self.due_date = due_date;
        }
        if let Some(status) = input.status {
            self.status = status;
        }

        validate_task_fields(&self.title, &self.description)?;
        self.touch_completion();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Completion-timestamp rule, tied to the resulting state rather than
    /// to any particular mutation path: stamp when status is exactly
    /// `completed` and unset, clear whenever status is anything else.
    fn touch_completion(&mut self) {
        if self.status == TaskStatus::Completed {
            if self.completed_at.is_none() {
                self.completed_at = Some(Utc::now());
            }
        } else {
            self.completed_at = None;
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }

    pub fn is_due_soon(&self, today: NaiveDate) -> bool {
        self.due_date
            .is_some_and(|due| due >= today && due <= today + Duration::days(DUE_SOON_DAYS))
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
}

/// Input for the generic update path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` clears the due date.
    #[serde(default, with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

mod double_option {
    use super::*;
    use serde::Deserializer;

    pub fn deserialize<'de, D>(de: D) -> std::result::Result<Option<Option<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<NaiveDate>::deserialize(de).map(Some)
    }
}

pub fn validate_task_fields(title: &str, description: &str) -> Result<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(HiveError::InvalidInput("Title can't be blank".into()));
    }
    if trimmed.len() > MAX_TITLE_LENGTH {
        return Err(HiveError::InvalidInput(format!(
            "Title is too long (maximum is {MAX_TITLE_LENGTH} characters)"
        )));
    }
    if description.len() > MAX_DESCRIPTION_LENGTH {
        return Err(HiveError::InvalidInput(format!(
            "Description is too long (maximum is {MAX_DESCRIPTION_LENGTH} characters)"
        )));
    }
    Ok(())
}

/// Per-user aggregate counts, computed over the user's full task list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatistics {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub pending_tasks: usize,
    pub in_progress_tasks: usize,
    pub cancelled_tasks: usize,
    pub overdue_tasks: usize,
    pub completion_rate: f64,
    pub priority_distribution: PriorityDistribution,
    pub status_distribution: StatusDistribution,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityDistribution {
    pub urgent: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl TaskStatistics {
    pub fn for_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        let count_status =
            |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let count_priority =
            |priority: TaskPriority| tasks.iter().filter(|t| t.priority == priority).count();

        let total = tasks.len();
        let completed = count_status(TaskStatus::Completed);
        let pending = count_status(TaskStatus::Pending);
        let in_progress = count_status(TaskStatus::InProgress);
        let cancelled = count_status(TaskStatus::Cancelled);
        let overdue = tasks
            .iter()
            .filter(|t| t.is_overdue(today) && !t.is_completed())
            .count();

        let completion_rate = if total > 0 {
            (completed as f64 / total as f64 * 10_000.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            total_tasks: total,
            completed_tasks: completed,
            pending_tasks: pending,
            in_progress_tasks: in_progress,
            cancelled_tasks: cancelled,
            overdue_tasks: overdue,
            completion_rate,
            priority_distribution: PriorityDistribution {
                urgent: count_priority(TaskPriority::Urgent),
                high: count_priority(TaskPriority::High),
                medium: count_priority(TaskPriority::Medium),
                low: count_priority(TaskPriority::Low),
            },
            status_distribution: StatusDistribution {
                pending,
                in_progress,
                completed,
                cancelled,
            },
        }
    }
}
