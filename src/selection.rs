//! Remembers the selected task across restarts.
//!
//! Modeled as an injectable port so the store never touches ambient global
//! state and tests can swap in an in-memory fake.

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::PathBuf;

/// Port for the single remembered "selected task" key
pub trait SelectionStore: Send {
    /// Read the remembered id; unreadable or missing state reads as none.
    fn get(&self) -> Option<String>;
    fn set(&mut self, id: &str) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Selection persisted as a single small file in the user data dir
pub struct FileSelection {
    path: PathBuf,
}

impl FileSelection {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().context("Could not determine data directory")?;
        Ok(data_dir.join("ticktrack").join("selected_task"))
    }
}

impl SelectionStore for FileSelection {
    fn get(&self) -> Option<String> {
        let contents = std::fs::read_to_string(&self.path).ok()?;
        let id = contents.trim();
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }

    fn set(&mut self, id: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create data directory")?;
        }
        std::fs::write(&self.path, id).context("Failed to persist selected task")
    }

    fn clear(&mut self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error).context("Failed to clear selected task"),
        }
    }
}

/// In-memory selection for tests
#[derive(Default)]
pub struct MemorySelection(Option<String>);

impl MemorySelection {
    pub fn new(id: Option<String>) -> Self {
        Self(id)
    }
}

impl SelectionStore for MemorySelection {
    fn get(&self) -> Option<String> {
        self.0.clone()
    }

    fn set(&mut self, id: &str) -> Result<()> {
        self.0 = Some(id.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.0 = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_selection_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = FileSelection::new(dir.path().join("selected_task"));

        assert_eq!(selection.get(), None);

        selection.set("42").unwrap();
        assert_eq!(selection.get(), Some("42".to_string()));

        selection.clear().unwrap();
        assert_eq!(selection.get(), None);
    }

    #[test]
    fn clearing_missing_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = FileSelection::new(dir.path().join("selected_task"));
        assert!(selection.clear().is_ok());
    }

    #[test]
    fn creates_parent_directories_on_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut selection = FileSelection::new(dir.path().join("nested").join("selected_task"));
        selection.set("7").unwrap();
        assert_eq!(selection.get(), Some("7".to_string()));
    }
}
