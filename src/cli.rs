use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use thiserror::Error;

use crate::assistant::{ProductivityAnalyzer, TaskParser};
use crate::database::KeyValueStore;
use crate::models::{DailyAnalysis, Priority, Task, TaskEdit, TaskStatus};
use crate::session::{AnalysisOutcome, Session, SessionError};
use crate::timeline::{Timeline, TimelineEntry};

#[derive(Parser)]
#[command(name = "hoshyar")]
#[command(about = "Daily planner: free-text tasks on a timeline with free-time gaps")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Day to work on (YYYY-MM-DD), defaults to today
    #[arg(short, long, global = true)]
    pub date: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the day's progress, backlog and timeline (default if no subcommand)
    Show,
    /// Add tasks from a free-text description
    Add {
        /// What to plan, e.g. "gym tomorrow at 7 for an hour"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Set a task's status
    Status {
        /// Task id or unique id prefix
        id: String,
        status: StatusArg,
    },
    /// Toggle a task between pending and completed
    Toggle {
        /// Task id or unique id prefix
        id: String,
    },
    /// Edit a task's fields
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        /// Start time (HH:mm)
        #[arg(long, conflicts_with = "unscheduled")]
        start: Option<String>,
        /// Remove the start time
        #[arg(long)]
        unscheduled: bool,
        /// Duration in minutes
        #[arg(long)]
        duration: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// low, medium or high
        #[arg(long)]
        priority: Option<String>,
        /// Move the task to another day (YYYY-MM-DD)
        #[arg(long = "move-to")]
        move_to: Option<String>,
    },
    /// Summarize the day's productivity
    Analyze,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    InProgress,
    Completed,
    Skipped,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => TaskStatus::Pending,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Completed => TaskStatus::Completed,
            StatusArg::Skipped => TaskStatus::Skipped,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    SessionError(#[from] SessionError),
    #[error("Invalid priority '{0}', expected low, medium or high")]
    InvalidPriority(String),
}

/// Handle the add command
pub fn handle_add<S: KeyValueStore>(
    session: &mut Session<S>,
    parser: &dyn TaskParser,
    text: &[String],
) -> Result<(), CliError> {
    let outcome = session.add_from_text(parser, &text.join(" "))?;

    if outcome.used_fallback {
        println!("Could not interpret the text, saved it as written.");
    }
    for task in &outcome.added {
        println!("Added {} [{}] on {}", task.title, short_id(&task.id), task.date);
    }
    if let Some(day) = &outcome.switched_to {
        println!("Switched to {}", day);
    }
    println!();
    print!("{}", render_day(session));
    Ok(())
}

/// Handle the show command
pub fn handle_show<S: KeyValueStore>(session: &Session<S>) -> Result<(), CliError> {
    print!("{}", render_day(session));
    Ok(())
}

/// Handle the status command
pub fn handle_status<S: KeyValueStore>(
    session: &mut Session<S>,
    id: &str,
    status: TaskStatus,
) -> Result<(), CliError> {
    let id = session.resolve_id(id)?;
    let task = session.change_status(&id, status)?;
    println!("{} is now {}", task.title, task.status.label());
    Ok(())
}

/// Handle the toggle command
pub fn handle_toggle<S: KeyValueStore>(session: &mut Session<S>, id: &str) -> Result<(), CliError> {
    let id = session.resolve_id(id)?;
    let task = session.toggle(&id)?;
    println!("{} is now {}", task.title, task.status.label());
    Ok(())
}

/// Field overrides given on the edit command line
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub start: Option<String>,
    pub unscheduled: bool,
    pub duration: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub move_to: Option<String>,
}

impl EditArgs {
    /// Full edit for `task`: flags given on the command line replace the
    /// task's current values
    pub fn into_edit(self, task: &Task) -> Result<TaskEdit, CliError> {
        let mut edit = TaskEdit::from_task(task);
        if let Some(title) = self.title {
            edit.title = title;
        }
        if self.unscheduled {
            edit.start_time = None;
        } else if let Some(start) = self.start {
            edit.start_time = Some(start);
        }
        if let Some(duration) = self.duration {
            edit.duration = Some(duration);
        }
        edit.priority = self
            .priority
            .map(|p| Priority::parse(&p).ok_or(CliError::InvalidPriority(p)))
            .transpose()?;
        edit.description = self.description;
        edit.category = self.category;
        edit.date = self.move_to;
        Ok(edit)
    }
}

/// Handle the edit command
pub fn handle_edit<S: KeyValueStore>(
    session: &mut Session<S>,
    id: &str,
    args: EditArgs,
) -> Result<(), CliError> {
    let id = session.resolve_id(id)?;
    let current = session
        .collection()
        .get(&id)
        .cloned()
        .ok_or_else(|| SessionError::from(crate::collection::CollectionError::NotFound(id.clone())))?;
    let edit = args.into_edit(&current)?;
    let task = session.edit(&id, &edit)?;
    println!("Updated {}", describe_task(&task));
    Ok(())
}

/// Handle the analyze command
pub fn handle_analyze<S: KeyValueStore>(
    session: &mut Session<S>,
    analyzer: &dyn ProductivityAnalyzer,
) -> Result<(), CliError> {
    match session.analyze(analyzer)? {
        AnalysisOutcome::Cached { analysis, used_fallback } => {
            if used_fallback {
                println!("Analysis unavailable, showing a neutral summary.");
            }
            print!("{}", render_analysis(&analysis));
        }
        AnalysisOutcome::Stale { day } => {
            println!("Analysis for {} finished after the day changed and was dropped.", day);
        }
    }
    Ok(())
}

/// First block of a task id, enough to address it from the command line
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[>]",
        TaskStatus::Completed => "[x]",
        TaskStatus::Skipped => "[-]",
    }
}

fn describe_task(task: &Task) -> String {
    format!(
        "{} {} · {} · {}  [{}]",
        status_marker(task.status),
        task.title,
        task.category,
        task.priority.label(),
        short_id(&task.id)
    )
}

/// Plain-text rendering of the selected day
pub fn render_day<S: KeyValueStore>(session: &Session<S>) -> String {
    let mut out = String::new();
    let summary = session.summary();
    let _ = writeln!(
        out,
        "{}  ·  {} task(s)  ·  {}% done",
        session.selected_day(),
        summary.total,
        summary.progress
    );

    let plan = session.day_plan();

    if !plan.backlog.is_empty() {
        let _ = writeln!(out, "\nUnscheduled");
        for task in &plan.backlog {
            let _ = writeln!(out, "  {} ({} min)", describe_task(task), task.duration_minutes);
        }
    }

    let _ = writeln!(out, "\nTimeline");
    match &plan.timeline {
        Timeline::Empty => {
            let _ = writeln!(out, "  Timeline is empty");
        }
        Timeline::Entries(entries) => {
            for entry in entries {
                match entry {
                    TimelineEntry::Task(t) => {
                        let _ = writeln!(
                            out,
                            "  {}–{}  {}",
                            t.start_label(),
                            t.end_label(),
                            describe_task(t.task)
                        );
                    }
                    TimelineEntry::Gap(g) => {
                        let _ = writeln!(out, "  {}–{}  ~ {}", g.start_label(), g.end_label(), g.label());
                    }
                }
            }
        }
    }

    if let Some(analysis) = session.analysis() {
        let _ = writeln!(out);
        out.push_str(&render_analysis(analysis));
    }
    out
}

/// Plain-text rendering of a daily analysis
pub fn render_analysis(analysis: &DailyAnalysis) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Analysis for {}  {}  score {}/100",
        analysis.date, analysis.mood_emoji, analysis.productivity_score
    );
    for insight in &analysis.insights {
        let _ = writeln!(out, "  * {}", insight);
    }
    for suggestion in &analysis.suggestions {
        let _ = writeln!(out, "  > {}", suggestion);
    }
    if !analysis.chart_data.is_empty() {
        let parts: Vec<String> = analysis
            .chart_data
            .iter()
            .map(|d| format!("{} {}", d.name, d.value))
            .collect();
        let _ = writeln!(out, "  by category: {}", parts.join(", "));
    }
    out
}
