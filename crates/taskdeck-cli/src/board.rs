use anyhow::{anyhow, bail};
use chrono::Utc;
use taskdeck_shared::{
    CreateTaskRequest, Task, TaskStats, UpdateTaskRequest, description_is_blank, sort_tasks,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::api::TaskApi;
use crate::cache::{CachedState, LocalCache};

pub const OFFLINE_NOTICE: &str =
    "Using offline mode - tasks will sync when connection is restored";

/// Client-side view of the task list.
///
/// Every mutation lands in the local cache first and is then sent to the
/// server. A failed call flips the board offline and leaves the local
/// change in place.
pub struct TaskBoard<A> {
    api: A,
    cache: LocalCache,
    state: CachedState,
}

impl<A: TaskApi> TaskBoard<A> {
    pub fn open(api: A, cache: LocalCache) -> Self {
        let state = cache.load();
        Self { api, cache, state }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn is_online(&self) -> bool {
        self.state.online
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats::from_tasks(&self.state.tasks)
    }

    pub fn cache_path(&self) -> &std::path::Path {
        &self.cache.path
    }

    /// Replaces the local list with the server's. On failure the cached
    /// list stays and the board goes offline.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> anyhow::Result<()> {
        match self.api.list().await {
            Ok(mut tasks) => {
                sort_tasks(&mut tasks);
                info!(count = tasks.len(), "synced task list from server");
                self.state.tasks = tasks;
                self.state.online = true;
                self.state.error = None;
            }
            Err(error) => {
                warn!(error = %format!("{error:#}"), "failed to fetch tasks, using local cache");
                self.state.online = false;
                self.state.error = Some(OFFLINE_NOTICE.to_string());
            }
        }
        self.persist()
    }

    /// Returns `None` without touching anything for a blank description.
    #[instrument(skip(self, description), fields(description_len = description.len()))]
    pub async fn add(&mut self, description: &str) -> anyhow::Result<Option<Task>> {
        if description_is_blank(description) {
            debug!("ignoring blank description");
            return Ok(None);
        }

        let temp = Task::new(description.to_string(), Utc::now());
        self.state.tasks.push(temp.clone());
        sort_tasks(&mut self.state.tasks);
        self.persist()?;

        let request = CreateTaskRequest {
            description: description.to_string(),
        };
        let task = match self.api.create(&request).await {
            Ok(created) => {
                match self.state.tasks.iter_mut().find(|task| task.id == temp.id) {
                    Some(slot) => *slot = created.clone(),
                    None => self.state.tasks.push(created.clone()),
                }
                sort_tasks(&mut self.state.tasks);
                self.state.online = true;
                debug!(temp_id = %temp.id, id = %created.id, "replaced temporary task");
                created
            }
            Err(error) => {
                self.mark_offline("create", &error);
                temp
            }
        };

        self.persist()?;
        Ok(Some(task))
    }

    #[instrument(skip(self))]
    pub async fn toggle(&mut self, id: Uuid) -> anyhow::Result<Task> {
        let updated = {
            let task = self.find_mut(id)?;
            task.is_completed = !task.is_completed;
            task.clone()
        };
        sort_tasks(&mut self.state.tasks);
        self.persist()?;

        let request = UpdateTaskRequest {
            description: None,
            is_completed: updated.is_completed,
        };
        self.send_update(id, &request, "toggle").await?;
        Ok(updated)
    }

    #[instrument(skip(self, description))]
    pub async fn edit(&mut self, id: Uuid, description: &str) -> anyhow::Result<Task> {
        if description_is_blank(description) {
            bail!("{}", taskdeck_shared::ERROR_DESCRIPTION_REQUIRED);
        }

        let updated = {
            let task = self.find_mut(id)?;
            task.description = description.to_string();
            task.clone()
        };
        self.persist()?;

        let request = UpdateTaskRequest {
            description: Some(updated.description.clone()),
            is_completed: updated.is_completed,
        };
        self.send_update(id, &request, "edit").await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: Uuid) -> anyhow::Result<Task> {
        let idx = self
            .state
            .tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or_else(|| anyhow!("no cached task with id {id}"))?;
        let removed = self.state.tasks.remove(idx);
        self.persist()?;

        match self.api.delete(id).await {
            Ok(()) => self.state.online = true,
            Err(error) => self.mark_offline("delete", &error),
        }
        self.persist()?;
        Ok(removed)
    }

    /// Resolves a full id or a unique id prefix against the cached list.
    pub fn resolve(&self, selector: &str) -> anyhow::Result<Uuid> {
        let selector = selector.trim().to_ascii_lowercase();
        if selector.is_empty() {
            bail!("task id cannot be empty");
        }

        if let Ok(id) = Uuid::parse_str(&selector)
            && self.state.tasks.iter().any(|task| task.id == id)
        {
            return Ok(id);
        }

        let matches: Vec<Uuid> = self
            .state
            .tasks
            .iter()
            .map(|task| task.id)
            .filter(|id| id.to_string().starts_with(&selector))
            .collect();

        match matches.as_slice() {
            [id] => Ok(*id),
            [] => Err(anyhow!("no task matches '{selector}'")),
            many => Err(anyhow!(
                "'{selector}' matches {} tasks; use a longer id",
                many.len()
            )),
        }
    }

    async fn send_update(
        &mut self,
        id: Uuid,
        request: &UpdateTaskRequest,
        op: &str,
    ) -> anyhow::Result<()> {
        match self.api.update(id, request).await {
            Ok(_) => self.state.online = true,
            Err(error) => self.mark_offline(op, &error),
        }
        self.persist()
    }

    fn find_mut(&mut self, id: Uuid) -> anyhow::Result<&mut Task> {
        self.state
            .tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| anyhow!("no cached task with id {id}"))
    }

    fn mark_offline(&mut self, op: &str, error: &anyhow::Error) {
        warn!(op, error = %format!("{error:#}"), "server call failed; keeping local change");
        self.state.online = false;
    }

    fn persist(&self) -> anyhow::Result<()> {
        self.cache.save(&self.state)
    }
}
