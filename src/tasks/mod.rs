use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::DisplayOptions;
use crate::storage::{PersistenceMode, TaskRecord, TaskRepository};
use crate::text::{sanitize, shorten};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(Uuid);

impl TaskId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task {0} not found")]
    UnknownTask(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    Deleted,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceStatus {
    Saved,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    id: TaskId,
    full_text: String,
    display_text: String,
    completed: bool,
    created: OffsetDateTime,
}

impl Task {
    fn new(full_text: String, max_display_length: usize, created: OffsetDateTime) -> Self {
        let display_text = shorten(&full_text, max_display_length);
        Self {
            id: TaskId::new(),
            full_text,
            display_text,
            completed: false,
            created,
        }
    }

    /// The stored display text is only a cache; it is rebuilt for the
    /// current display length.
    fn from_record(record: TaskRecord, max_display_length: usize) -> Self {
        let display_text = shorten(&record.full_text, max_display_length);
        if display_text != record.display_text {
            tracing::debug!(
                stored = %record.display_text,
                rebuilt = %display_text,
                "persisted display text out of date"
            );
        }
        Self {
            id: TaskId::new(),
            full_text: record.full_text,
            display_text,
            completed: record.is_completed,
            created: record.created,
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Escaped text as last committed.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn is_truncated(&self) -> bool {
        self.display_text != self.full_text
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn created(&self) -> OffsetDateTime {
        self.created
    }

    pub fn to_record(&self) -> TaskRecord {
        TaskRecord {
            full_text: self.full_text.clone(),
            display_text: self.display_text.clone(),
            is_completed: self.completed,
            created: self.created,
        }
    }

    fn set_text(&mut self, full_text: String, max_display_length: usize) {
        self.display_text = shorten(&full_text, max_display_length);
        self.full_text = full_text;
    }
}

/// The ordered task collection. Every mutation is followed by a full save
/// through the repository.
pub struct TaskList {
    tasks: IndexMap<TaskId, Task>,
    repository: Box<dyn TaskRepository>,
    display: DisplayOptions,
    status: PersistenceStatus,
}

impl fmt::Debug for TaskList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskList")
            .field("tasks", &self.tasks)
            .field("mode", &self.repository.mode())
            .field("status", &self.status)
            .finish()
    }
}

impl TaskList {
    /// Loads the persisted list. Unreadable data is logged and replaced by an
    /// empty list.
    pub fn hydrate(repository: Box<dyn TaskRepository>, display: DisplayOptions) -> Self {
        let records = match repository.load() {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(?err, "discarding unreadable task data");
                Vec::new()
            }
        };
        let mut tasks = IndexMap::with_capacity(records.len());
        for record in records {
            if record.full_text.is_empty() {
                tracing::warn!("skipping persisted task with empty text");
                continue;
            }
            let task = Task::from_record(record, display.max_display_length);
            tasks.insert(task.id, task);
        }
        tracing::debug!(count = tasks.len(), mode = %repository.mode(), "hydrated task list");
        Self {
            tasks,
            repository,
            display,
            status: PersistenceStatus::Saved,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn position(&self, id: TaskId) -> Option<usize> {
        self.tasks.get_index_of(&id)
    }

    pub fn display_options(&self) -> &DisplayOptions {
        &self.display
    }

    pub fn persistence_mode(&self) -> PersistenceMode {
        self.repository.mode()
    }

    pub fn persistence_status(&self) -> &PersistenceStatus {
        &self.status
    }

    pub fn add_task(&mut self, raw: &str) -> Option<TaskId> {
        self.add_task_at(raw, OffsetDateTime::now_utc())
    }

    fn add_task_at(&mut self, raw: &str, created: OffsetDateTime) -> Option<TaskId> {
        let text = self.commit_text(raw);
        if text.is_empty() {
            return None;
        }
        let task = Task::new(text, self.display.max_display_length, created);
        let id = task.id;
        self.tasks.insert(id, task);
        self.persist();
        Some(id)
    }

    pub fn edit_task(&mut self, id: TaskId, raw: &str) -> Result<EditOutcome, TaskError> {
        let text = self.commit_text(raw);
        if text.is_empty() {
            self.delete_task(id)?;
            return Ok(EditOutcome::Deleted);
        }
        let max_display_length = self.display.max_display_length;
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        task.set_text(text, max_display_length);
        self.persist();
        Ok(EditOutcome::Updated)
    }

    pub fn toggle_completed(&mut self, id: TaskId) -> Result<bool, TaskError> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        task.completed = !task.completed;
        let completed = task.completed;
        self.persist();
        Ok(completed)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Task, TaskError> {
        let task = self
            .tasks
            .shift_remove(&id)
            .ok_or(TaskError::UnknownTask(id))?;
        self.persist();
        Ok(task)
    }

    /// Trims, caps at `max_task_length` characters and escapes user input.
    fn commit_text(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        let capped = match trimmed.char_indices().nth(self.display.max_task_length) {
            Some((idx, _)) => trimmed[..idx].trim_end(),
            None => trimmed,
        };
        sanitize(capped)
    }

    fn persist(&mut self) {
        let records = self.tasks.values().map(Task::to_record).collect::<Vec<_>>();
        match self.repository.save(&records) {
            Ok(()) => {
                tracing::debug!(count = records.len(), "persisted task list");
                self.status = PersistenceStatus::Saved;
            }
            Err(err) => {
                tracing::warn!(?err, "failed to persist task list");
                self.status = PersistenceStatus::Failed(format!("{err:#}"));
            }
        }
    }
}
