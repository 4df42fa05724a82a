use crate::models::{Task, TaskStatus};

/// All tasks whose day key matches, in collection order
pub fn select_day<'a>(tasks: &'a [Task], day: &str) -> Vec<&'a Task> {
    tasks.iter().filter(|t| t.date == day).collect()
}

/// Completion percentage for one day's tasks, rounded half up. An empty day is 0.
pub fn progress(tasks: &[&Task]) -> u8 {
    let total = tasks.len();
    if total == 0 {
        return 0;
    }
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    // round(100 * c / t) in integers
    ((200 * completed + total) / (2 * total)) as u8
}

/// Per-status counts for one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DaySummary {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub skipped: usize,
    pub planned_minutes: u32,
    pub progress: u8,
}

impl DaySummary {
    pub fn of(tasks: &[&Task]) -> Self {
        let mut summary = DaySummary {
            total: tasks.len(),
            progress: progress(tasks),
            ..Default::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => summary.pending += 1,
                TaskStatus::InProgress => summary.in_progress += 1,
                TaskStatus::Completed => summary.completed += 1,
                TaskStatus::Skipped => summary.skipped += 1,
            }
            summary.planned_minutes = summary.planned_minutes.saturating_add(task.duration_minutes);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, date: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(title.to_string(), date.to_string());
        t.status = status;
        t
    }

    #[test]
    fn select_day_keeps_insertion_order_and_is_idempotent() {
        let tasks = vec![
            task("b", "2025-03-01", TaskStatus::Pending),
            task("x", "2025-03-02", TaskStatus::Pending),
            task("a", "2025-03-01", TaskStatus::Pending),
        ];
        let first: Vec<&str> = select_day(&tasks, "2025-03-01").iter().map(|t| t.title.as_str()).collect();
        let second: Vec<&str> = select_day(&tasks, "2025-03-01").iter().map(|t| t.title.as_str()).collect();
        assert_eq!(first, vec!["b", "a"]);
        assert_eq!(first, second);
        assert!(select_day(&tasks, "2025-03-09").is_empty());
    }

    #[test]
    fn progress_of_empty_day_is_zero() {
        assert_eq!(progress(&[]), 0);
    }

    #[test]
    fn progress_rounds_to_nearest() {
        let done = task("d", "2025-03-01", TaskStatus::Completed);
        let open = task("o", "2025-03-01", TaskStatus::Pending);
        let skipped = task("s", "2025-03-01", TaskStatus::Skipped);

        assert_eq!(progress(&[&done, &open, &open]), 33);
        assert_eq!(progress(&[&done, &done, &open]), 67);
        assert_eq!(progress(&[&done, &skipped]), 50);
        assert_eq!(progress(&[&done]), 100);
        assert_eq!(progress(&[&skipped, &open]), 0);
        // 1/8 = 12.5 rounds up
        let eight = [&done, &open, &open, &open, &open, &open, &open, &open];
        assert_eq!(progress(&eight), 13);
    }

    #[test]
    fn summary_counts_each_status() {
        let tasks = vec![
            task("a", "2025-03-01", TaskStatus::Completed),
            task("b", "2025-03-01", TaskStatus::InProgress),
            task("c", "2025-03-01", TaskStatus::Skipped),
            task("d", "2025-03-01", TaskStatus::Pending),
        ];
        let day = select_day(&tasks, "2025-03-01");
        let summary = DaySummary::of(&day);
        assert_eq!(summary.total, 4);
        assert_eq!((summary.pending, summary.in_progress, summary.completed, summary.skipped), (1, 1, 1, 1));
        assert_eq!(summary.planned_minutes, 120);
        assert_eq!(summary.progress, 25);
    }
}
