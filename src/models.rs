use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::utils;

/// Duration given to tasks whose duration is missing or not a positive integer
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Category given to tasks the parser could not classify
pub const DEFAULT_CATEGORY: &str = "General";

/// Longest duration a task can carry; larger values are clamped to this
pub const MAX_DURATION_MINUTES: u32 = 7 * 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl TaskStatus {
    /// Checkbox semantics: a pending task becomes completed, anything else
    /// goes back to pending
    pub fn toggled(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            _ => TaskStatus::Pending,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Lenient parse used for parser output and CLI input
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Priority::Low),
            "MEDIUM" | "MED" => Some(Priority::Medium),
            "HIGH" => Some(Priority::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date: String, // YYYY-MM-DD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>, // HH:mm, None = unscheduled
    #[serde(default = "default_duration", deserialize_with = "deserialize_duration")]
    pub duration_minutes: u32,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(title: String, date: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            description: None,
            date,
            start_time: None,
            duration_minutes: DEFAULT_DURATION_MINUTES,
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            category: DEFAULT_CATEGORY.to_string(),
            completed_at: None,
        }
    }

    /// Minutes since midnight of the start time, if the task is scheduled
    pub fn start_minutes(&self) -> Option<u32> {
        self.start_time.as_deref().and_then(utils::parse_clock)
    }

    /// Unwrapped end in minutes since midnight; may exceed a full day
    pub fn end_minutes(&self) -> Option<u32> {
        self.start_minutes().map(|start| start.saturating_add(self.duration_minutes))
    }

    /// End time for display, wrapped onto the clock face
    pub fn end_time(&self) -> Option<String> {
        self.end_minutes().map(utils::format_wall_clock)
    }
}

/// Apply a status transition. `completed_at` is set to `now` on entering
/// `Completed` and cleared on every other transition.
pub fn change_status(task: &Task, status: TaskStatus, now: DateTime<Utc>) -> Task {
    Task {
        status,
        completed_at: (status == TaskStatus::Completed).then_some(now),
        ..task.clone()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("Title must not be empty")]
    EmptyTitle,
    #[error("Invalid start time '{0}', expected HH:mm")]
    InvalidStartTime(String),
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// The editable fields of a task as submitted from an edit form.
/// `title`, `start_time` and `duration` are always replaced; the optional
/// fields keep the current value when absent.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub title: String,
    pub start_time: Option<String>,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl TaskEdit {
    /// An edit that reproduces the task's current values
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            start_time: task.start_time.clone(),
            duration: Some(task.duration_minutes.to_string()),
            description: None,
            date: None,
            priority: None,
            category: None,
        }
    }
}

/// Replace a task's editable fields in one step. Identity and lifecycle
/// fields (`id`, `status`, `completed_at`) are never touched.
pub fn edit_fields(task: &Task, edit: &TaskEdit) -> Result<Task, EditError> {
    let title = edit.title.trim();
    if title.is_empty() {
        return Err(EditError::EmptyTitle);
    }

    let start_time = match edit.start_time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            utils::normalize_clock(raw)
                .ok_or_else(|| EditError::InvalidStartTime(raw.to_string()))?,
        ),
    };

    let date = match edit.date.as_deref() {
        Some(d) if !utils::is_day_key(d) => return Err(EditError::InvalidDate(d.to_string())),
        Some(d) => d.to_string(),
        None => task.date.clone(),
    };

    Ok(Task {
        title: title.to_string(),
        start_time,
        duration_minutes: parse_duration_input(edit.duration.as_deref()),
        description: edit.description.clone().or_else(|| task.description.clone()),
        date,
        priority: edit.priority.unwrap_or(task.priority),
        category: edit.category.clone().unwrap_or_else(|| task.category.clone()),
        ..task.clone()
    })
}

/// Duration from free-form input; anything that is not a positive integer
/// becomes the default, and anything over a week is clamped to a week
pub fn parse_duration_input(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&d| d > 0)
        .map(clamp_duration)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Duration from a JSON value produced by the parser or read from storage
pub fn duration_from_value(value: Option<&serde_json::Value>) -> u32 {
    let minutes = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 1.0).map(|f| f.round() as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    minutes
        .filter(|&m| m > 0)
        .map(clamp_duration)
        .unwrap_or(DEFAULT_DURATION_MINUTES)
}

/// Clamp a positive minute count to `MAX_DURATION_MINUTES`
pub fn clamp_duration(minutes: u64) -> u32 {
    u32::try_from(minutes.min(u64::from(MAX_DURATION_MINUTES))).unwrap_or(MAX_DURATION_MINUTES)
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_MINUTES
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(duration_from_value(value.as_ref()))
}

/// An identity-less task proposal produced by the natural-language parser.
/// Every field except the title may be missing; defaults are applied when the
/// draft is reconciled into the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub duration_minutes: Option<u32>,
    pub priority: Option<Priority>,
    pub category: Option<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDatum {
    pub name: String,
    pub value: i64,
}

/// One productivity snapshot for a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAnalysis {
    pub date: String,
    pub productivity_score: u8,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub mood_emoji: String,
    #[serde(default)]
    pub chart_data: Vec<ChartDatum>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Task {
        let mut task = Task::new("Write report".to_string(), "2025-03-01".to_string());
        task.start_time = Some("09:00".to_string());
        task.duration_minutes = 60;
        task
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn completing_sets_timestamp_and_leaving_clears_it() {
        let done = change_status(&sample(), TaskStatus::Completed, instant());
        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.completed_at, Some(instant()));

        for next in [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Skipped] {
            let moved = change_status(&done, next, instant());
            assert_eq!(moved.status, next);
            assert!(moved.completed_at.is_none());
        }
    }

    #[test]
    fn status_change_keeps_other_fields() {
        let task = sample();
        let started = change_status(&task, TaskStatus::InProgress, instant());
        assert_eq!(started.id, task.id);
        assert_eq!(started.title, task.title);
        assert_eq!(started.start_time, task.start_time);
    }

    #[test]
    fn toggle_follows_checkbox_semantics() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
        assert_eq!(TaskStatus::Skipped.toggled(), TaskStatus::Pending);
        assert_eq!(TaskStatus::InProgress.toggled(), TaskStatus::Pending);
    }

    #[test]
    fn edit_replaces_fields_and_coerces_bad_duration() {
        let task = change_status(&sample(), TaskStatus::Completed, instant());
        let edit = TaskEdit {
            title: "  Write final report ".to_string(),
            start_time: Some("9:30".to_string()),
            duration: Some("abc".to_string()),
            ..Default::default()
        };
        let edited = edit_fields(&task, &edit).unwrap();
        assert_eq!(edited.title, "Write final report");
        assert_eq!(edited.start_time.as_deref(), Some("09:30"));
        assert_eq!(edited.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(edited.id, task.id);
        assert_eq!(edited.status, TaskStatus::Completed);
        assert_eq!(edited.completed_at, task.completed_at);
    }

    #[test]
    fn edit_without_start_time_unschedules() {
        let edit = TaskEdit {
            title: "Write report".to_string(),
            start_time: None,
            duration: Some("45".to_string()),
            ..Default::default()
        };
        let edited = edit_fields(&sample(), &edit).unwrap();
        assert!(edited.start_time.is_none());
        assert_eq!(edited.duration_minutes, 45);
    }

    #[test]
    fn edit_rejects_blank_title_and_bad_clock() {
        let mut edit = TaskEdit::from_task(&sample());
        edit.title = "   ".to_string();
        assert_eq!(edit_fields(&sample(), &edit), Err(EditError::EmptyTitle));

        let mut edit = TaskEdit::from_task(&sample());
        edit.start_time = Some("25:00".to_string());
        assert!(matches!(edit_fields(&sample(), &edit), Err(EditError::InvalidStartTime(_))));
    }

    #[test]
    fn duration_input_coercion() {
        assert_eq!(parse_duration_input(None), 30);
        assert_eq!(parse_duration_input(Some("0")), 30);
        assert_eq!(parse_duration_input(Some("-5")), 30);
        assert_eq!(parse_duration_input(Some(" 90 ")), 90);
        assert_eq!(parse_duration_input(Some("4294967295")), MAX_DURATION_MINUTES);
        assert_eq!(parse_duration_input(Some("99999999999999")), MAX_DURATION_MINUTES);
    }

    #[test]
    fn persisted_json_uses_camel_case_and_tolerates_bad_duration() {
        let json = r#"{"id":"a","title":"Run","date":"2025-03-01","startTime":"07:00",
            "durationMinutes":0,"status":"IN_PROGRESS","priority":"HIGH","category":"Health"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.duration_minutes, DEFAULT_DURATION_MINUTES);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::High);

        let out = serde_json::to_string(&task).unwrap();
        assert!(out.contains("\"startTime\":\"07:00\""));
        assert!(!out.contains("completedAt"));
    }

    #[test]
    fn oversized_persisted_duration_is_clamped() {
        let json = r#"{"id":"a","title":"Sleep","date":"2025-03-01","startTime":"09:00",
            "durationMinutes":4294967295}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.duration_minutes, MAX_DURATION_MINUTES);
        assert_eq!(task.end_minutes(), Some(540 + MAX_DURATION_MINUTES));

        let mut raw = sample();
        raw.duration_minutes = u32::MAX;
        assert_eq!(raw.end_minutes(), Some(u32::MAX));
        assert!(raw.end_time().is_some());
    }

    #[test]
    fn end_time_wraps_for_display_only() {
        let mut task = sample();
        task.start_time = Some("23:30".to_string());
        task.duration_minutes = 90;
        assert_eq!(task.end_minutes(), Some(1500));
        assert_eq!(task.end_time().as_deref(), Some("01:00"));
    }
}
