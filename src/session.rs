//! The planner session: owner of the task collection, the selected day, the
//! analysis cache and the store they are saved to.
//!
//! Calls to the generative model are split in two. `begin_*` claims the
//! component's single in-flight slot and hands back a ticket carrying
//! everything the external call needs; `complete_*` takes the ticket and the
//! call's result and applies it. The session is not borrowed in between, so
//! status changes, edits and day selection keep working while a call is
//! pending, and a second request for the same component is refused with
//! [`SessionError::Busy`].

use std::fmt::Display;

use chrono::Utc;
use thiserror::Error;

use crate::analysis::{self, AnalysisCache};
use crate::assistant::{ProductivityAnalyzer, TaskParser};
use crate::collection::{CollectionError, TaskCollection};
use crate::daily::{self, DaySummary};
use crate::database::{DatabaseError, KeyValueStore};
use crate::intake;
use crate::models::{DailyAnalysis, Task, TaskDraft, TaskEdit, TaskStatus};
use crate::timeline::{self, DayPlan};
use crate::utils;

/// Store key for the full task collection
pub const TASKS_KEY: &str = "hoshyar_tasks";

/// Store key for the cached daily analysis
pub const ANALYSIS_KEY: &str = "hoshyar_analysis";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Store(#[from] DatabaseError),
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Collection(#[from] CollectionError),
    #[error("A {0} request is already in progress")]
    Busy(&'static str),
    #[error("This {0} request is no longer the one in progress")]
    StaleRequest(&'static str),
    #[error("Nothing to add: input is empty")]
    EmptyInput,
    #[error("Invalid day '{0}', expected YYYY-MM-DD")]
    InvalidDay(String),
}

/// Single-slot request tracker for one component
#[derive(Debug, Default)]
struct InFlight {
    current: Option<u64>,
    issued: u64,
}

impl InFlight {
    fn begin(&mut self, component: &'static str) -> Result<u64, SessionError> {
        if self.current.is_some() {
            return Err(SessionError::Busy(component));
        }
        self.issued += 1;
        self.current = Some(self.issued);
        Ok(self.issued)
    }

    fn finish(&mut self, id: u64, component: &'static str) -> Result<(), SessionError> {
        if self.current != Some(id) {
            return Err(SessionError::StaleRequest(component));
        }
        self.current = None;
        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.current.is_some()
    }
}

/// A pending intake request
#[derive(Debug)]
pub struct IntakeTicket {
    id: u64,
    pub text: String,
    pub today: String,
}

/// A pending analysis request with a snapshot of the day's tasks
#[derive(Debug)]
pub struct AnalysisTicket {
    id: u64,
    pub day: String,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntakeOutcome {
    pub added: Vec<Task>,
    pub used_fallback: bool,
    /// Set when the selected day moved to the day the batch landed on
    pub switched_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Cached { analysis: DailyAnalysis, used_fallback: bool },
    /// The selected day changed while the analysis was running; the result was dropped
    Stale { day: String },
}

pub struct Session<S: KeyValueStore> {
    store: S,
    tasks: TaskCollection,
    saved_version: u64,
    today: String,
    selected_day: String,
    analysis: AnalysisCache,
    intake_slot: InFlight,
    analysis_slot: InFlight,
}

impl<S: KeyValueStore> Session<S> {
    /// Read persisted state and start on `today`. Unreadable task JSON is
    /// treated as no tasks; a stored analysis is kept only if it is for today.
    pub fn load(store: S, today: &str) -> Result<Self, SessionError> {
        Self::load_on(store, today, today)
    }

    /// Like `load`, but start with `selected_day` selected. The stored
    /// analysis is rehydrated against the selected day.
    pub fn load_on(store: S, today: &str, selected_day: &str) -> Result<Self, SessionError> {
        for day in [today, selected_day] {
            if !utils::is_day_key(day) {
                return Err(SessionError::InvalidDay(day.to_string()));
            }
        }

        let tasks = match store.get(TASKS_KEY)? {
            None => TaskCollection::new(),
            Some(json) => match serde_json::from_str::<Vec<Task>>(&json) {
                Ok(tasks) => TaskCollection::from_tasks(tasks),
                Err(e) => {
                    tracing::warn!(error = %e, "stored tasks are unreadable, starting empty");
                    TaskCollection::new()
                }
            },
        };

        let mut analysis = AnalysisCache::new();
        analysis.rehydrate(store.get(ANALYSIS_KEY)?.as_deref(), selected_day);

        tracing::debug!(tasks = tasks.len(), today, selected_day, "session loaded");

        Ok(Self {
            store,
            saved_version: tasks.version(),
            tasks,
            today: today.to_string(),
            selected_day: selected_day.to_string(),
            analysis,
            intake_slot: InFlight::default(),
            analysis_slot: InFlight::default(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn today(&self) -> &str {
        &self.today
    }

    pub fn selected_day(&self) -> &str {
        &self.selected_day
    }

    pub fn tasks(&self) -> &[Task] {
        self.tasks.tasks()
    }

    pub fn collection(&self) -> &TaskCollection {
        &self.tasks
    }

    pub fn is_intake_busy(&self) -> bool {
        self.intake_slot.is_busy()
    }

    pub fn is_analysis_busy(&self) -> bool {
        self.analysis_slot.is_busy()
    }

    /// Move to another day. Any cached analysis is dropped when the day changes.
    pub fn select_day(&mut self, day: &str) -> Result<(), SessionError> {
        if !utils::is_day_key(day) {
            return Err(SessionError::InvalidDay(day.to_string()));
        }
        if day != self.selected_day {
            tracing::info!(from = %self.selected_day, to = day, "selected day changed");
            self.selected_day = day.to_string();
            self.analysis.discard();
        }
        Ok(())
    }

    /// The selected day's tasks in insertion order
    pub fn day_tasks(&self) -> Vec<&Task> {
        daily::select_day(self.tasks.tasks(), &self.selected_day)
    }

    pub fn day_plan(&self) -> DayPlan<'_> {
        timeline::build(self.day_tasks())
    }

    pub fn progress(&self) -> u8 {
        daily::progress(&self.day_tasks())
    }

    pub fn summary(&self) -> DaySummary {
        DaySummary::of(&self.day_tasks())
    }

    /// Cached analysis for the selected day, if any
    pub fn analysis(&self) -> Option<&DailyAnalysis> {
        self.analysis.for_day(&self.selected_day)
    }

    /// Resolve a full id or unique prefix
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String, SessionError> {
        Ok(self.tasks.resolve_id(id_or_prefix)?)
    }

    pub fn change_status(&mut self, id: &str, status: TaskStatus) -> Result<Task, SessionError> {
        let task = self.tasks.change_status(id, status, Utc::now())?.clone();
        tracing::debug!(id, status = status.label(), "task status changed");
        self.save()?;
        Ok(task)
    }

    /// Flip a task the way its checkbox does
    pub fn toggle(&mut self, id: &str) -> Result<Task, SessionError> {
        let current = self
            .tasks
            .get(id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?
            .status;
        self.change_status(id, current.toggled())
    }

    pub fn edit(&mut self, id: &str, edit: &TaskEdit) -> Result<Task, SessionError> {
        let task = self.tasks.edit(id, edit)?.clone();
        tracing::debug!(id, "task edited");
        self.save()?;
        Ok(task)
    }

    /// Claim the intake slot for a free-text request
    pub fn begin_intake(&mut self, text: &str) -> Result<IntakeTicket, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let id = self.intake_slot.begin("task intake")?;
        Ok(IntakeTicket {
            id,
            text: text.trim().to_string(),
            today: self.today.clone(),
        })
    }

    /// Apply the parser's result for `ticket` as one batch
    pub fn complete_intake<E: Display>(
        &mut self,
        ticket: IntakeTicket,
        parsed: Result<Vec<TaskDraft>, E>,
    ) -> Result<IntakeOutcome, SessionError> {
        self.intake_slot.finish(ticket.id, "task intake")?;

        let reconciled = intake::reconcile(parsed, &ticket.text, &ticket.today, &self.selected_day);
        let added = reconciled.tasks.clone();
        self.tasks.append_batch(reconciled.tasks)?;
        self.save()?;

        if let Some(day) = &reconciled.switch_to {
            self.select_day(day)?;
        }

        Ok(IntakeOutcome {
            added,
            used_fallback: reconciled.used_fallback,
            switched_to: reconciled.switch_to,
        })
    }

    /// Parse free text with `parser` and add the resulting tasks
    pub fn add_from_text<P: TaskParser + ?Sized>(
        &mut self,
        parser: &P,
        text: &str,
    ) -> Result<IntakeOutcome, SessionError> {
        let ticket = self.begin_intake(text)?;
        let parsed = parser.parse(&ticket.text, &ticket.today);
        self.complete_intake(ticket, parsed)
    }

    /// Claim the analysis slot for the selected day
    pub fn begin_analysis(&mut self) -> Result<AnalysisTicket, SessionError> {
        let id = self.analysis_slot.begin("analysis")?;
        Ok(AnalysisTicket {
            id,
            day: self.selected_day.clone(),
            tasks: self.day_tasks().into_iter().cloned().collect(),
        })
    }

    /// Cache and persist the analyzer's result, or the neutral fallback if it failed
    pub fn complete_analysis<E: Display>(
        &mut self,
        ticket: AnalysisTicket,
        result: Result<DailyAnalysis, E>,
    ) -> Result<AnalysisOutcome, SessionError> {
        self.analysis_slot.finish(ticket.id, "analysis")?;

        if ticket.day != self.selected_day {
            tracing::debug!(day = %ticket.day, "analysis finished after the day changed, dropping it");
            return Ok(AnalysisOutcome::Stale { day: ticket.day });
        }
        let (fresh, used_fallback) = analysis::resolve(result, &ticket.day);

        let json = serde_json::to_string(&fresh)?;
        self.analysis.replace(fresh.clone());
        self.store.set(ANALYSIS_KEY, &json)?;

        Ok(AnalysisOutcome::Cached { analysis: fresh, used_fallback })
    }

    /// Analyze the selected day with `analyzer`
    pub fn analyze<A: ProductivityAnalyzer + ?Sized>(
        &mut self,
        analyzer: &A,
    ) -> Result<AnalysisOutcome, SessionError> {
        let ticket = self.begin_analysis()?;
        let result = analyzer.analyze(&ticket.day, &ticket.tasks);
        self.complete_analysis(ticket, result)
    }

    /// Write the collection if it changed since the last save
    fn save(&mut self) -> Result<(), SessionError> {
        if self.tasks.version() == self.saved_version {
            return Ok(());
        }
        let json = serde_json::to_string(self.tasks.tasks())?;
        self.store.set(TASKS_KEY, &json)?;
        self.saved_version = self.tasks.version();
        tracing::debug!(version = self.saved_version, "tasks saved");
        Ok(())
    }
}
