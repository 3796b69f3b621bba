use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use taskdeck_shared::Task;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Everything the client remembers between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedState {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default = "default_online")]
    pub online: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl Default for CachedState {
    fn default() -> Self {
        Self {
            tasks: vec![],
            online: true,
            error: None,
        }
    }
}

fn default_online() -> bool {
    true
}

/// Durable local copy of the task list.
#[derive(Debug, Clone)]
pub struct LocalCache {
    pub path: PathBuf,
}

impl LocalCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is an empty cache. An unreadable one is logged and
    /// treated the same way so a corrupt cache never blocks the client.
    #[tracing::instrument(skip(self), fields(file = %self.path.display()))]
    pub fn load(&self) -> CachedState {
        if !self.path.exists() {
            debug!("no local cache yet");
            return CachedState::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| serde_json::from_str::<CachedState>(&raw).map_err(anyhow::Error::from));

        match parsed {
            Ok(state) => {
                debug!(count = state.tasks.len(), online = state.online, "loaded local cache");
                state
            }
            Err(error) => {
                warn!(%error, "failed reading local cache; starting empty");
                CachedState::default()
            }
        }
    }

    #[tracing::instrument(skip(self, state), fields(file = %self.path.display(), count = state.tasks.len()))]
    pub fn save(&self, state: &CachedState) -> anyhow::Result<()> {
        let dir = cache_dir(&self.path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut temp, state)?;
        temp.flush()?;
        temp.persist(&self.path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.path.display(), err))?;
        Ok(())
    }
}

fn cache_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
