use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{self, EditError, Task, TaskEdit, TaskStatus};
use crate::utils;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectionError {
    #[error("Task not found: {0}")]
    NotFound(String),
    #[error("Task id prefix '{0}' is ambiguous")]
    AmbiguousId(String),
    #[error("Duplicate task id: {0}")]
    DuplicateId(String),
    #[error("Invalid edit: {0}")]
    InvalidEdit(#[from] EditError),
}

/// The owned task collection. Append and mutate only; every successful
/// mutation bumps `version` so the owner knows when to save.
#[derive(Debug, Clone, Default)]
pub struct TaskCollection {
    tasks: Vec<Task>,
    version: u64,
}

impl TaskCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from previously persisted tasks. Later duplicates of
    /// an id are dropped so ids stay unique, as are tasks without a valid day.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut kept: Vec<Task> = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !utils::is_day_key(&task.date) {
                tracing::warn!(id = %task.id, date = %task.date, "dropping persisted task with malformed date");
                continue;
            }
            if kept.iter().any(|t| t.id == task.id) {
                tracing::warn!(id = %task.id, "dropping persisted task with duplicate id");
                continue;
            }
            kept.push(task);
        }
        Self { tasks: kept, version: 0 }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Resolve a full id or a unique id prefix to the full id
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String, CollectionError> {
        if let Some(task) = self.get(id_or_prefix) {
            return Ok(task.id.clone());
        }
        let mut matches = self.tasks.iter().filter(|t| t.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(task), None) if !id_or_prefix.is_empty() => Ok(task.id.clone()),
            (Some(_), _) if !id_or_prefix.is_empty() => {
                Err(CollectionError::AmbiguousId(id_or_prefix.to_string()))
            }
            _ => Err(CollectionError::NotFound(id_or_prefix.to_string())),
        }
    }

    /// Append a batch of new tasks. Either the whole batch is appended in
    /// order or, if any id collides, nothing is.
    pub fn append_batch(&mut self, batch: Vec<Task>) -> Result<(), CollectionError> {
        for (i, task) in batch.iter().enumerate() {
            if self.get(&task.id).is_some() || batch[..i].iter().any(|t| t.id == task.id) {
                return Err(CollectionError::DuplicateId(task.id.clone()));
            }
        }
        if batch.is_empty() {
            return Ok(());
        }
        self.tasks.extend(batch);
        self.version += 1;
        Ok(())
    }

    /// Change one task's status; every other task is left as it was
    pub fn change_status(
        &mut self,
        id: &str,
        status: TaskStatus,
        now: DateTime<Utc>,
    ) -> Result<&Task, CollectionError> {
        self.replace_with(id, |task| Ok(models::change_status(task, status, now)))
    }

    /// Replace one task's editable fields
    pub fn edit(&mut self, id: &str, edit: &TaskEdit) -> Result<&Task, CollectionError> {
        self.replace_with(id, |task| Ok(models::edit_fields(task, edit)?))
    }

    fn replace_with<F>(&mut self, id: &str, f: F) -> Result<&Task, CollectionError>
    where
        F: FnOnce(&Task) -> Result<Task, CollectionError>,
    {
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CollectionError::NotFound(id.to_string()))?;
        let updated = f(&self.tasks[index])?;
        self.tasks[index] = updated;
        self.version += 1;
        Ok(&self.tasks[index])
    }
}
