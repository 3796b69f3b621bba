use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use taskdeck_shared::{CreateTaskRequest, Task, UpdateTaskRequest};
use tracing::{debug, instrument};
use uuid::Uuid;

/// The four REST calls the client makes. Any error means the call failed,
/// whether the server was unreachable or answered with a non-2xx status.
#[allow(async_fn_in_trait)]
pub trait TaskApi {
    async fn list(&self) -> anyhow::Result<Vec<Task>>;
    async fn create(&self, request: &CreateTaskRequest) -> anyhow::Result<Task>;
    async fn update(&self, id: Uuid, request: &UpdateTaskRequest) -> anyhow::Result<Task>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    client: Client,
    base_url: String,
}

impl HttpTaskApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/tasks", self.base_url)
    }

    fn task_url(&self, id: Uuid) -> String {
        format!("{}/tasks/{id}", self.base_url)
    }
}

impl TaskApi for HttpTaskApi {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list(&self) -> anyhow::Result<Vec<Task>> {
        let tasks: Vec<Task> = self
            .client
            .get(self.tasks_url())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("failed decoding task list")?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    #[instrument(skip(self, request), fields(base_url = %self.base_url))]
    async fn create(&self, request: &CreateTaskRequest) -> anyhow::Result<Task> {
        let task = self
            .client
            .post(self.tasks_url())
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("failed decoding created task")?;
        Ok(task)
    }

    #[instrument(skip(self, request), fields(base_url = %self.base_url))]
    async fn update(&self, id: Uuid, request: &UpdateTaskRequest) -> anyhow::Result<Task> {
        let task = self
            .client
            .put(self.task_url(id))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("failed decoding updated task")?;
        Ok(task)
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        self.client
            .delete(self.task_url(id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
