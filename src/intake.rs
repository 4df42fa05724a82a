use std::fmt::Display;

use crate::models::{clamp_duration, DEFAULT_CATEGORY, DEFAULT_DURATION_MINUTES, Priority, Task, TaskDraft, TaskStatus};
use crate::utils;

/// The tasks produced from one intake request, ready to append as one batch
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub tasks: Vec<Task>,
    /// True when the parser failed or produced nothing usable
    pub used_fallback: bool,
    /// Day the view should move to, if the batch lands on a single other day
    pub switch_to: Option<String>,
}

/// Turn parser output into new pending tasks.
///
/// Drafts are taken in order; each gets a fresh id and `Pending` status, and
/// missing or malformed fields fall back to defaults. If the parser failed, or
/// no draft has a usable title, a single fallback task is built from the raw
/// text so input is never dropped.
pub fn reconcile<E: Display>(
    parsed: Result<Vec<TaskDraft>, E>,
    raw_text: &str,
    today: &str,
    selected_day: &str,
) -> Reconciled {
    let mut used_fallback = false;
    let tasks = match parsed {
        Ok(drafts) => {
            let tasks: Vec<Task> = drafts.into_iter().filter_map(|d| task_from_draft(d, today)).collect();
            if tasks.is_empty() {
                tracing::warn!("parser returned no usable drafts, keeping raw input");
                used_fallback = true;
                vec![fallback_task(raw_text, today)]
            } else {
                tasks
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "task parser failed, keeping raw input");
            used_fallback = true;
            vec![fallback_task(raw_text, today)]
        }
    };

    let switch_to = day_to_show(&tasks, selected_day);
    tracing::debug!(count = tasks.len(), used_fallback, switch_to = ?switch_to, "reconciled intake batch");

    Reconciled { tasks, used_fallback, switch_to }
}

/// The day to navigate to after adding `tasks`: only when they all share one
/// day and it is not the one already selected
pub fn day_to_show(tasks: &[Task], selected_day: &str) -> Option<String> {
    let first = tasks.first()?;
    if tasks.iter().all(|t| t.date == first.date) && first.date != selected_day {
        Some(first.date.clone())
    } else {
        None
    }
}

/// Build a pending task from a draft, or `None` if the draft has no title
pub fn task_from_draft(draft: TaskDraft, today: &str) -> Option<Task> {
    let title = draft.title.trim();
    if title.is_empty() {
        tracing::debug!("skipping draft without a title");
        return None;
    }

    let date = match draft.date.as_deref().map(str::trim) {
        Some(d) if utils::is_day_key(d) => d.to_string(),
        Some(d) => {
            tracing::warn!(date = d, "draft has a malformed date, using today");
            today.to_string()
        }
        None => today.to_string(),
    };

    let start_time = draft.start_time.as_deref().and_then(|raw| {
        let normalized = utils::normalize_clock(raw);
        if normalized.is_none() && !raw.trim().is_empty() {
            tracing::warn!(start_time = raw, "draft has a malformed start time, leaving it unscheduled");
        }
        normalized
    });

    let category = draft
        .category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let mut task = Task::new(title.to_string(), date);
    task.description = draft.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
    task.start_time = start_time;
    task.duration_minutes = draft
        .duration_minutes
        .filter(|&d| d > 0)
        .map(|d| clamp_duration(u64::from(d)))
        .unwrap_or(DEFAULT_DURATION_MINUTES);
    task.priority = draft.priority.unwrap_or(Priority::Medium);
    task.category = category;
    task.status = TaskStatus::Pending;
    Some(task)
}

/// The task kept when the parser cannot help: the raw text as the title,
/// dated today, unscheduled
pub fn fallback_task(raw_text: &str, today: &str) -> Task {
    Task::new(raw_text.trim().to_string(), today.to_string())
}
