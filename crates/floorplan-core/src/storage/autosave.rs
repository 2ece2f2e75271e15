//! Periodic saving of the open project.

use crate::config::EditorConfig;
use crate::editor::ProjectEditor;
use crate::model::Project;
use crate::storage::{FileStorage, Storage, StorageError, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default auto-save interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Key for the most recently saved project.
pub const LAST_PROJECT_KEY: &str = "__last_project__";

/// Saves an editor's project when it has unsaved changes and the interval
/// has elapsed. Dirty state is the editor's own.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    current_id: Option<String>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            current_id: None,
        }
    }

    /// Manager using the configured auto-save interval.
    pub fn from_config(storage: Arc<S>, config: &EditorConfig) -> Self {
        Self::new(storage).with_interval(config.autosave_interval())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_project_id(&mut self, id: Option<String>) {
        self.current_id = id;
    }

    pub fn project_id(&self) -> Option<&str> {
        self.current_id.as_deref()
    }

    /// Unsaved changes and either never saved or the interval has passed.
    pub fn should_save(&self, editor: &ProjectEditor, now: Instant) -> bool {
        if !editor.has_unsaved_changes() {
            return false;
        }
        self.last_save
            .is_none_or(|last| now.saturating_duration_since(last) >= self.interval)
    }

    /// Save if [`should_save`](Self::should_save). Returns whether it saved.
    pub async fn maybe_save(&mut self, editor: &mut ProjectEditor, now: Instant) -> StorageResult<bool> {
        if !self.should_save(editor, now) {
            return Ok(false);
        }
        self.save(editor, now).await?;
        Ok(true)
    }

    /// Save immediately, record it as the last project and mark the editor
    /// saved.
    pub async fn save(&mut self, editor: &mut ProjectEditor, now: Instant) -> StorageResult<()> {
        let saved = editor.saved_state();
        let id = self.current_id.clone().unwrap_or_else(|| saved.id.to_string());

        self.storage.save(&id, &saved).await?;
        self.storage.save(LAST_PROJECT_KEY, &saved).await?;
        editor.mark_saved();
        log::debug!("Saved project {}", id);

        self.current_id = Some(id);
        self.last_save = Some(now);
        Ok(())
    }

    pub async fn load(&mut self, id: &str) -> StorageResult<Project> {
        let project = Project::try_from(self.storage.load(id).await?)
            .map_err(|e| StorageError::Serialization(format!("Invalid project {}: {}", id, e)))?;
        self.current_id = Some(id.to_string());
        self.last_save = Some(Instant::now());
        Ok(project)
    }

    /// Reopen the most recently saved project, if any.
    pub async fn load_last(&mut self) -> Option<Project> {
        let loaded = match self.storage.load(LAST_PROJECT_KEY).await {
            Ok(saved) => Project::try_from(saved).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match loaded {
            Ok(project) => {
                self.current_id = Some(project.id().to_string());
                self.last_save = Some(Instant::now());
                Some(project)
            }
            Err(e) => {
                log::debug!("No last project: {}", e);
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// Saved project ids, excluding the last-project slot.
    pub async fn list_projects(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_PROJECT_KEY);
        Ok(ids)
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

/// Auto-save manager over file storage in the user's data directory.
pub fn create_autosave_manager(config: &EditorConfig) -> StorageResult<AutoSaveManager<FileStorage>> {
    Ok(AutoSaveManager::from_config(create_default_storage()?, config))
}
