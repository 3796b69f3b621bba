use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use taskdeck_core::TaskService;

#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
}

impl AppState {
    pub fn open(data_file: &Path) -> anyhow::Result<Self> {
        let service = TaskService::open(data_file).with_context(|| {
            format!(
                "failed to initialize task service at {}",
                data_file.display()
            )
        })?;
        Ok(Self {
            tasks: Arc::new(service),
        })
    }
}
