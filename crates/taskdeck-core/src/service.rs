use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use taskdeck_shared::{Task, description_is_blank, sort_tasks};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::datastore::DataStore;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{}", taskdeck_shared::ERROR_DESCRIPTION_REQUIRED)]
    InvalidDescription,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

struct Inner {
    store: DataStore,
    tasks: Vec<Task>,
}

/// The task list and its backing file behind one lock.
///
/// Every operation holds the lock for its whole duration, including the
/// file write, so mutations are applied and persisted one at a time.
pub struct TaskService {
    inner: Mutex<Inner>,
}

impl TaskService {
    #[instrument(skip(path), fields(file = %path.display()))]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let store = DataStore::open(path)
            .with_context(|| format!("failed to open datastore at {}", path.display()))?;
        let tasks = store.load()?;
        info!(count = tasks.len(), "task service ready");

        Ok(Self {
            inner: Mutex::new(Inner { store, tasks }),
        })
    }

    pub fn len(&self) -> usize {
        self.inner.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<Task> {
        let mut tasks = self.inner.lock().tasks.clone();
        sort_tasks(&mut tasks);
        tasks
    }

    #[instrument(skip(self))]
    pub fn get(&self, id: Uuid) -> Option<Task> {
        self.inner
            .lock()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .cloned()
    }

    pub fn create(&self, description: String) -> Result<Task, ServiceError> {
        self.create_at(description, Utc::now())
    }

    #[instrument(skip(self, description), fields(description_len = description.len()))]
    pub fn create_at(&self, description: String, now: DateTime<Utc>) -> Result<Task, ServiceError> {
        if description_is_blank(&description) {
            return Err(ServiceError::InvalidDescription);
        }

        let mut inner = self.inner.lock();
        let task = Task::new(description, now);
        let previous = inner.tasks.clone();
        inner.tasks.push(task.clone());
        persist_or_rollback(&mut inner, previous)?;

        info!(id = %task.id, "task created");
        Ok(task)
    }

    /// Returns `Ok(None)` when no task has `id`.
    #[instrument(skip(self, description), fields(has_description = description.is_some()))]
    pub fn update(
        &self,
        id: Uuid,
        description: Option<String>,
        is_completed: bool,
    ) -> Result<Option<Task>, ServiceError> {
        if description.as_deref().is_some_and(description_is_blank) {
            return Err(ServiceError::InvalidDescription);
        }

        let mut inner = self.inner.lock();
        let previous = inner.tasks.clone();

        let updated = {
            let Some(task) = inner.tasks.iter_mut().find(|task| task.id == id) else {
                debug!("update target not found");
                return Ok(None);
            };
            if let Some(description) = description {
                task.description = description;
            }
            task.is_completed = is_completed;
            task.clone()
        };

        persist_or_rollback(&mut inner, previous)?;
        info!(id = %id, is_completed, "task updated");
        Ok(Some(updated))
    }

    /// Returns `Ok(false)` when no task has `id`.
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock();
        let Some(idx) = inner.tasks.iter().position(|task| task.id == id) else {
            debug!("delete target not found");
            return Ok(false);
        };

        let previous = inner.tasks.clone();
        inner.tasks.remove(idx);
        persist_or_rollback(&mut inner, previous)?;

        info!(id = %id, "task deleted");
        Ok(true)
    }
}

fn persist_or_rollback(inner: &mut Inner, previous: Vec<Task>) -> anyhow::Result<()> {
    if let Err(err) = inner.store.save(&inner.tasks) {
        warn!(error = %err, "persist failed; restoring previous task list");
        inner.tasks = previous;
        return Err(err);
    }
    Ok(())
}
