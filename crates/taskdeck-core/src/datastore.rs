use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use taskdeck_shared::Task;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Flat-file store holding the whole task list as one JSON document.
#[derive(Debug)]
pub struct DataStore {
    pub path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(path))]
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let path = path.to_path_buf();
        let dir = parent_dir(&path);
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        info!(
            file = %path.display(),
            exists = path.exists(),
            "opened datastore"
        );

        Ok(Self { path })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Vec<Task>> {
        load_json_document(&self.path)
            .with_context(|| format!("failed to load {}", self.path.display()))
    }

    #[tracing::instrument(skip(self, tasks))]
    pub fn save(&self, tasks: &[Task]) -> anyhow::Result<()> {
        save_json_atomic(&self.path, tasks)
            .with_context(|| format!("failed to save {}", self.path.display()))
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[tracing::instrument(skip(path))]
fn load_json_document(path: &Path) -> anyhow::Result<Vec<Task>> {
    if !path.exists() {
        debug!(file = %path.display(), "no task file yet; starting empty");
        return Ok(vec![]);
    }

    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(vec![]);
    }

    let tasks = serde_json::from_str::<Option<Vec<Task>>>(&raw)
        .with_context(|| format!("failed parsing {} as a task list", path.display()))?
        .unwrap_or_default();

    debug!(count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

#[tracing::instrument(skip(path, tasks))]
fn save_json_atomic(path: &Path, tasks: &[Task]) -> anyhow::Result<()> {
    debug!(file = %path.display(), count = tasks.len(), "saving task list atomically");

    let mut temp = NamedTempFile::new_in(parent_dir(path))?;
    serde_json::to_writer(&mut temp, tasks)?;
    temp.flush()?;

    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use taskdeck_shared::Task;
    use tempfile::tempdir;

    use super::DataStore;

    #[test]
    fn missing_and_blank_files_load_empty() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("tasks.json");
        let store = DataStore::open(&path).expect("open");
        assert!(store.load().expect("load missing").is_empty());

        fs::write(&path, "  \n").expect("write blank");
        assert!(store.load().expect("load blank").is_empty());

        fs::write(&path, "null").expect("write null");
        assert!(store.load().expect("load null").is_empty());
    }

    #[test]
    fn save_writes_one_json_array() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("tasks.json");
        let store = DataStore::open(&path).expect("open");

        let tasks = vec![
            Task::new("first".to_string(), Utc::now()),
            Task::new("second".to_string(), Utc::now()),
        ];
        store.save(&tasks).expect("save");

        let raw = fs::read_to_string(&path).expect("read back");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value.as_array().map(Vec::len), Some(2));
        assert_eq!(store.load().expect("load"), tasks);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("tasks.json");
        fs::write(&path, "{not json").expect("write");

        let store = DataStore::open(&path).expect("open");
        let err = store.load().expect_err("should fail");
        assert!(format!("{err:#}").contains("tasks.json"));
    }
}
