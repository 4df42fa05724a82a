//! Arranges one day's tasks into a time-ordered timeline with free-time gaps.
//!
//! Scheduled tasks (those with a start time) are stable-sorted by start time
//! and walked in order. Idle stretches of at least [`MIN_GAP_MINUTES`] between
//! the end of one task and the start of the next become gap entries, and a
//! single trailing gap runs to midnight when more than
//! [`MIN_TRAILING_GAP_MINUTES`] remain. Unscheduled tasks form the backlog and
//! never take part in gap detection.

use crate::models::Task;
use crate::utils::{self, MINUTES_PER_DAY};

/// Shortest idle stretch between two tasks that is shown as a gap
pub const MIN_GAP_MINUTES: u32 = 15;

/// The trailing end-of-day gap is only shown when strictly more than this remains
pub const MIN_TRAILING_GAP_MINUTES: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapKind {
    /// Free time between two scheduled tasks
    Idle,
    /// Free time from the last task to midnight
    EndOfDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapEntry {
    pub kind: GapKind,
    pub start_minutes: u32,
    pub end_minutes: u32,
}

impl GapEntry {
    pub fn minutes(&self) -> u32 {
        self.end_minutes - self.start_minutes
    }

    pub fn start_label(&self) -> String {
        utils::format_boundary(self.start_minutes)
    }

    pub fn end_label(&self) -> String {
        utils::format_boundary(self.end_minutes)
    }

    pub fn label(&self) -> String {
        match self.kind {
            GapKind::EndOfDay => "End of planned day".to_string(),
            GapKind::Idle => gap_label(self.minutes()),
        }
    }
}

/// Human phrasing for an idle stretch
pub fn gap_label(minutes: u32) -> String {
    if minutes >= 60 {
        format!("{} h {} min free", minutes / 60, minutes % 60)
    } else {
        format!("{} min break", minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaskEntry<'a> {
    pub task: &'a Task,
    pub start_minutes: u32,
    /// Unwrapped; exceeds a full day when the task runs past midnight
    pub end_minutes: u32,
}

impl TaskEntry<'_> {
    pub fn start_label(&self) -> String {
        utils::format_boundary(self.start_minutes)
    }

    pub fn end_label(&self) -> String {
        utils::format_wall_clock(self.end_minutes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineEntry<'a> {
    Task(TaskEntry<'a>),
    Gap(GapEntry),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Timeline<'a> {
    /// The day has no scheduled tasks
    Empty,
    Entries(Vec<TimelineEntry<'a>>),
}

impl<'a> Timeline<'a> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Timeline::Empty)
    }

    pub fn entries(&self) -> &[TimelineEntry<'a>] {
        match self {
            Timeline::Empty => &[],
            Timeline::Entries(entries) => entries,
        }
    }

    pub fn gaps(&self) -> impl Iterator<Item = &GapEntry> {
        self.entries().iter().filter_map(|entry| match entry {
            TimelineEntry::Gap(gap) => Some(gap),
            TimelineEntry::Task(_) => None,
        })
    }
}

/// A day arranged for display: the backlog strip plus the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct DayPlan<'a> {
    pub backlog: Vec<&'a Task>,
    pub timeline: Timeline<'a>,
}

/// Arrange one day's tasks (already filtered to that day)
pub fn build<'a, I>(tasks: I) -> DayPlan<'a>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut scheduled: Vec<(u32, &'a Task)> = Vec::new();
    let mut backlog = Vec::new();

    for task in tasks {
        match (task.start_time.as_deref(), task.start_minutes()) {
            (_, Some(start)) => scheduled.push((start, task)),
            (None, None) => backlog.push(task),
            (Some(raw), None) => {
                tracing::warn!(id = %task.id, start_time = raw, "unreadable start time, treating task as unscheduled");
                backlog.push(task);
            }
        }
    }

    if scheduled.is_empty() {
        return DayPlan { backlog, timeline: Timeline::Empty };
    }

    // sort_by_key is stable: equal start times keep their input order
    scheduled.sort_by_key(|(start, _)| *start);

    let mut entries = Vec::with_capacity(scheduled.len() * 2 + 1);
    let mut last_end: Option<u32> = None;

    for (start, task) in scheduled {
        let end = start.saturating_add(task.duration_minutes);

        if let Some(previous_end) = last_end {
            if start > previous_end && start - previous_end >= MIN_GAP_MINUTES {
                entries.push(TimelineEntry::Gap(GapEntry {
                    kind: GapKind::Idle,
                    start_minutes: previous_end,
                    end_minutes: start,
                }));
            }
        }

        entries.push(TimelineEntry::Task(TaskEntry {
            task,
            start_minutes: start,
            end_minutes: end,
        }));
        last_end = Some(end);
    }

    if let Some(end) = last_end {
        if end < MINUTES_PER_DAY && MINUTES_PER_DAY - end > MIN_TRAILING_GAP_MINUTES {
            entries.push(TimelineEntry::Gap(GapEntry {
                kind: GapKind::EndOfDay,
                start_minutes: end,
                end_minutes: MINUTES_PER_DAY,
            }));
        }
    }

    tracing::debug!(
        backlog = backlog.len(),
        entries = entries.len(),
        "built day timeline"
    );

    DayPlan { backlog, timeline: Timeline::Entries(entries) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduled(title: &str, start: &str, duration: u32) -> Task {
        let mut t = Task::new(title.to_string(), "2025-03-01".to_string());
        t.start_time = Some(start.to_string());
        t.duration_minutes = duration;
        t
    }

    fn unscheduled(title: &str) -> Task {
        Task::new(title.to_string(), "2025-03-01".to_string())
    }

    fn task_titles<'a>(timeline: &'a Timeline<'a>) -> Vec<&'a str> {
        timeline
            .entries()
            .iter()
            .filter_map(|e| match e {
                TimelineEntry::Task(t) => Some(t.task.title.as_str()),
                TimelineEntry::Gap(_) => None,
            })
            .collect()
    }

    #[test]
    fn morning_scenario_has_one_hour_gap_and_trailing_gap() {
        let tasks = vec![scheduled("standup", "09:00", 60), scheduled("review", "11:00", 30)];
        let plan = build(&tasks);
        let entries = plan.timeline.entries();
        assert_eq!(entries.len(), 4);

        match entries[0] {
            TimelineEntry::Task(t) => {
                assert_eq!(t.task.title, "standup");
                assert_eq!((t.start_label(), t.end_label()), ("09:00".to_string(), "10:00".to_string()));
            }
            other => panic!("expected task, got {other:?}"),
        }
        match entries[1] {
            TimelineEntry::Gap(g) => {
                assert_eq!(g.kind, GapKind::Idle);
                assert_eq!((g.start_label(), g.end_label()), ("10:00".to_string(), "11:00".to_string()));
                assert_eq!(g.minutes(), 60);
                assert_eq!(g.label(), "1 h 0 min free");
            }
            other => panic!("expected gap, got {other:?}"),
        }
        match entries[2] {
            TimelineEntry::Task(t) => assert_eq!((t.start_minutes, t.end_minutes), (660, 690)),
            other => panic!("expected task, got {other:?}"),
        }
        match entries[3] {
            TimelineEntry::Gap(g) => {
                assert_eq!(g.kind, GapKind::EndOfDay);
                assert_eq!((g.start_minutes, g.end_minutes), (690, 1440));
                assert_eq!(g.minutes(), 750);
                assert_eq!(g.end_label(), "24:00");
            }
            other => panic!("expected trailing gap, got {other:?}"),
        }
    }

    #[test]
    fn slack_under_fifteen_minutes_is_not_shown() {
        let tasks = vec![scheduled("a", "09:00", 30), scheduled("b", "09:44", 30)];
        let plan = build(&tasks);
        assert_eq!(plan.timeline.gaps().filter(|g| g.kind == GapKind::Idle).count(), 0);

        let tasks = vec![scheduled("a", "09:00", 30), scheduled("b", "09:45", 30)];
        let plan = build(&tasks);
        let gap = plan.timeline.gaps().find(|g| g.kind == GapKind::Idle).copied().unwrap();
        assert_eq!(gap.minutes(), 15);
        assert_eq!(gap.label(), "15 min break");
    }

    #[test]
    fn gap_labels_use_hours_from_sixty_minutes() {
        assert_eq!(gap_label(59), "59 min break");
        assert_eq!(gap_label(60), "1 h 0 min free");
        assert_eq!(gap_label(135), "2 h 15 min free");
    }

    #[test]
    fn tasks_are_sorted_and_ties_keep_input_order() {
        let tasks = vec![
            scheduled("late", "14:00", 30),
            scheduled("first-at-nine", "09:00", 30),
            scheduled("second-at-nine", "09:00", 30),
            scheduled("early", "07:05", 30),
        ];
        let plan = build(&tasks);
        assert_eq!(
            task_titles(&plan.timeline),
            vec!["early", "first-at-nine", "second-at-nine", "late"]
        );
    }

    #[test]
    fn unscheduled_tasks_go_to_backlog_in_insertion_order() {
        let tasks = vec![
            unscheduled("groceries"),
            scheduled("gym", "18:00", 60),
            unscheduled("call mom"),
        ];
        let plan = build(&tasks);
        let backlog: Vec<&str> = plan.backlog.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(backlog, vec!["groceries", "call mom"]);
        assert_eq!(task_titles(&plan.timeline), vec!["gym"]);
    }

    #[test]
    fn no_scheduled_tasks_yields_empty_timeline() {
        let tasks = vec![unscheduled("read")];
        let plan = build(&tasks);
        assert!(plan.timeline.is_empty());
        assert_eq!(plan.backlog.len(), 1);

        let none: Vec<Task> = Vec::new();
        assert_eq!(build(&none).timeline, Timeline::Empty);
    }

    #[test]
    fn trailing_gap_needs_more_than_an_hour() {
        let plan_tasks = vec![scheduled("late", "22:00", 60)];
        let plan = build(&plan_tasks);
        assert_eq!(plan.timeline.gaps().count(), 0);

        let plan_tasks = vec![scheduled("late", "22:00", 59)];
        let plan = build(&plan_tasks);
        let trailing = plan.timeline.gaps().next().copied().unwrap();
        assert_eq!(trailing.kind, GapKind::EndOfDay);
        assert_eq!(trailing.minutes(), 61);
    }

    #[test]
    fn overnight_task_wraps_display_and_suppresses_trailing_gap() {
        let tasks = vec![scheduled("night shift", "23:30", 90)];
        let plan = build(&tasks);
        let entries = plan.timeline.entries();
        assert_eq!(entries.len(), 1);
        match entries[0] {
            TimelineEntry::Task(t) => {
                assert_eq!(t.end_minutes, 1500);
                assert_eq!(t.end_label(), "01:00");
            }
            other => panic!("expected task, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_tasks_produce_no_gap() {
        let tasks = vec![scheduled("long", "09:00", 120), scheduled("inside", "10:00", 30)];
        let plan = build(&tasks);
        assert_eq!(plan.timeline.gaps().filter(|g| g.kind == GapKind::Idle).count(), 0);
    }

    #[test]
    fn gap_durations_match_boundaries() {
        let tasks = vec![
            scheduled("a", "06:00", 45),
            scheduled("b", "08:10", 20),
            scheduled("c", "08:40", 30),
            scheduled("d", "13:00", 60),
        ];
        let plan = build(&tasks);
        let idle: Vec<(u32, u32, u32)> = plan
            .timeline
            .gaps()
            .filter(|g| g.kind == GapKind::Idle)
            .map(|g| (g.start_minutes, g.end_minutes, g.minutes()))
            .collect();
        // 06:45-08:10, 08:30-08:40 is too short, 09:10-13:00
        assert_eq!(idle, vec![(405, 490, 85), (550, 780, 230)]);
    }

    #[test]
    fn unreadable_start_time_is_treated_as_unscheduled() {
        let tasks = vec![scheduled("bad", "lunchtime", 30)];
        let plan = build(&tasks);
        assert!(plan.timeline.is_empty());
        assert_eq!(plan.backlog.len(), 1);
    }

    #[test]
    fn huge_duration_saturates_instead_of_overflowing() {
        let tasks = vec![scheduled("forever", "09:00", u32::MAX), scheduled("later", "10:00", 30)];
        let plan = build(&tasks);
        let ends: Vec<u32> = plan
            .timeline
            .entries()
            .iter()
            .filter_map(|entry| match entry {
                TimelineEntry::Task(t) => Some(t.end_minutes),
                TimelineEntry::Gap(_) => None,
            })
            .collect();
        assert_eq!(ends, vec![u32::MAX, 630]);
        // 10:30 to midnight is still free after the second task
        assert_eq!(plan.timeline.gaps().filter(|g| g.kind == GapKind::Idle).count(), 0);
        assert_eq!(plan.timeline.gaps().filter(|g| g.kind == GapKind::EndOfDay).count(), 1);
    }
}
