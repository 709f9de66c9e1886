use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::capabilities::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::error::{StoreError, ValidationError};
use crate::storage::Storage;
use crate::task::{NewTask, Task};
use crate::view::{self, DashboardCounts, FilterStatus, SortBy};

pub const DEFAULT_STORAGE_KEY: &str = "taskmate_tasks";

const MAX_ID_ATTEMPTS: usize = 8;

/// Authoritative, insertion-ordered task list plus its persisted blob.
#[derive(Debug)]
pub struct TaskStore<S, C = SystemClock, G = UuidGenerator> {
    storage: S,
    clock: C,
    ids: G,
    key: String,
    tasks: Vec<Task>,
    loaded: bool,
}

impl<S: Storage> TaskStore<S> {
    pub fn with_storage(storage: S) -> Self {
        Self::new(storage, SystemClock, UuidGenerator, DEFAULT_STORAGE_KEY)
    }
}

impl<S, C, G> TaskStore<S, C, G>
where
    S: Storage,
    C: Clock,
    G: IdGenerator,
{
    /// Builds an empty, not-yet-loaded store. Nothing is written until
    /// `initialize` has run.
    pub fn new(storage: S, clock: C, ids: G, key: impl Into<String>) -> Self {
        Self {
            storage,
            clock,
            ids,
            key: key.into(),
            tasks: Vec::new(),
            loaded: false,
        }
    }

    /// Loads the persisted blob. On a read error the store keeps an empty
    /// list; either way the store is marked loaded afterwards.
    #[tracing::instrument(skip(self), fields(key = %self.key))]
    pub fn initialize(&mut self) -> Result<(), StoreError> {
        let result = self.load_tasks();
        self.loaded = true;

        match result {
            Ok(tasks) => {
                info!(count = tasks.len(), "loaded tasks");
                self.tasks = tasks;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "starting with an empty task list");
                self.tasks.clear();
                Err(err)
            }
        }
    }

    fn load_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let raw = self
            .storage
            .load(&self.key)
            .map_err(|err| StoreError::read(&self.key, format!("{err:#}")))?;

        let Some(raw) = raw else {
            debug!("no persisted blob");
            return Ok(Vec::new());
        };

        parse_blob(&raw).map_err(|reason| StoreError::read(&self.key, reason))
    }

    /// Writes the whole list under the store key. Skipped until loaded.
    #[tracing::instrument(skip(self), fields(key = %self.key, count = self.tasks.len()))]
    pub fn persist(&mut self) -> Result<(), StoreError> {
        if !self.loaded {
            debug!("store not loaded yet, skipping persist");
            return Ok(());
        }

        let blob = serialize_blob(&self.tasks)
            .map_err(|err| StoreError::write(&self.key, &anyhow::Error::from(err)))?;
        self.storage
            .save(&self.key, &blob)
            .map_err(|err| StoreError::write(&self.key, &err))?;
        debug!(bytes = blob.len(), "persisted tasks");
        Ok(())
    }

    /// Appends a new pending task. When only the write fails, the task is
    /// still in the list and a `StorageWrite` error is returned.
    #[tracing::instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn add_task(&mut self, draft: NewTask) -> Result<Task, StoreError> {
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            debug!(?missing, "rejected task");
            return Err(ValidationError::Missing(missing).into());
        }

        let id = self.fresh_id()?;
        let task = draft.into_task(id, self.clock.now());
        info!(id = %task.id, "added task");
        self.tasks.push(task.clone());
        self.persist()?;
        Ok(task)
    }

    fn fresh_id(&mut self) -> Result<String, StoreError> {
        for attempt in 1..=MAX_ID_ATTEMPTS {
            let id = self.ids.new_id();
            if self.get(&id).is_none() {
                return Ok(id);
            }
            warn!(%id, attempt, "generated id collides with a live task");
        }
        Err(StoreError::IdCollision {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn toggle_complete(&mut self, id: &str) -> Result<(), StoreError> {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("no such task, ignoring toggle");
            return Ok(());
        };
        task.completed = !task.completed;
        info!(completed = task.completed, "toggled task");
        self.persist()
    }

    #[tracing::instrument(skip(self))]
    pub fn delete_task(&mut self, id: &str) -> Result<(), StoreError> {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        if self.tasks.len() == before {
            debug!("no such task, ignoring delete");
            return Ok(());
        }
        info!("deleted task");
        self.persist()
    }

    pub fn view(&self, filter: FilterStatus, sort: SortBy) -> Vec<&Task> {
        view::project(&self.tasks, filter, sort)
    }

    pub fn dashboard_counts(&self) -> DashboardCounts {
        DashboardCounts::of(&self.tasks)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub fn serialize_blob(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

/// Parses a blob and checks what serde cannot: unique ids, non-empty names.
pub fn parse_blob(raw: &str) -> Result<Vec<Task>, String> {
    let tasks: Vec<Task> =
        serde_json::from_str(raw).map_err(|err| format!("malformed task list: {err}"))?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for (idx, task) in tasks.iter().enumerate() {
        if task.name.trim().is_empty() {
            return Err(format!("task #{} ({}) has an empty name", idx + 1, task.id));
        }
        if !seen.insert(task.id.as_str()) {
            return Err(format!("duplicate task id {}", task.id));
        }
    }

    Ok(tasks)
}
