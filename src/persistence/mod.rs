//! Local persisted state: saved duplicate-tool settings and run history

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteStore;

use crate::core::{DuplicateSettings, ProjectId, RunStatus, StepKey, DUPLICATE_SETTINGS_KEY};
use crate::execution::{RunOutcome, RunReport};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Summary of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run ID
    pub run_id: Uuid,

    pub project_id: ProjectId,

    pub status: RunStatus,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished
    pub completed_at: Option<DateTime<Utc>>,

    /// Percent of steps completed (0 to 100)
    pub progress: f64,

    pub completed_steps: usize,

    pub total_steps: usize,

    /// Step that stopped the run, if one did
    pub failed_step: Option<StepKey>,

    /// Error of the failed step
    pub error: Option<String>,
}

/// Trait for persistence backends
#[async_trait::async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Save a run summary
    async fn save_run(&self, run: &RunSummary) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>>;

    /// List runs, newest first, optionally for one project
    async fn list_runs(&self, project_id: Option<ProjectId>, limit: usize)
        -> Result<Vec<RunSummary>>;

    /// Store a raw setting value under a key
    async fn save_setting(&self, key: &str, value: &str) -> Result<()>;

    /// Load a raw setting value
    async fn load_setting(&self, key: &str) -> Result<Option<String>>;

    /// Remove a setting; returns whether it existed
    async fn delete_setting(&self, key: &str) -> Result<bool>;
}

/// In-memory persistence (for testing or ephemeral use)
pub struct InMemoryPersistence {
    runs: tokio::sync::RwLock<Vec<RunSummary>>,
    settings: tokio::sync::RwLock<std::collections::HashMap<String, String>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(Vec::new()),
            settings: tokio::sync::RwLock::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PersistenceBackend for InMemoryPersistence {
    async fn save_run(&self, run: &RunSummary) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.retain(|r| r.run_id != run.run_id);
        runs.push(run.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunSummary>> {
        let runs = self.runs.read().await;
        Ok(runs.iter().find(|r| r.run_id == run_id).cloned())
    }

    async fn list_runs(
        &self,
        project_id: Option<ProjectId>,
        limit: usize,
    ) -> Result<Vec<RunSummary>> {
        let runs = self.runs.read().await;
        let mut result: Vec<RunSummary> = runs
            .iter()
            .filter(|r| project_id.map_or(true, |id| r.project_id == id))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        result.truncate(limit);
        Ok(result)
    }

    async fn save_setting(&self, key: &str, value: &str) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn load_setting(&self, key: &str) -> Result<Option<String>> {
        let settings = self.settings.read().await;
        Ok(settings.get(key).cloned())
    }

    async fn delete_setting(&self, key: &str) -> Result<bool> {
        let mut settings = self.settings.write().await;
        Ok(settings.remove(key).is_some())
    }
}

/// Save duplicate-tool settings under their fixed key
pub async fn save_duplicate_settings(
    store: &dyn PersistenceBackend,
    settings: &DuplicateSettings,
) -> Result<()> {
    settings.validate()?;
    store
        .save_setting(DUPLICATE_SETTINGS_KEY, &settings.to_json()?)
        .await
}

/// Load the saved duplicate-tool settings, `None` if never saved
pub async fn load_duplicate_settings(
    store: &dyn PersistenceBackend,
) -> Result<Option<DuplicateSettings>> {
    match store.load_setting(DUPLICATE_SETTINGS_KEY).await? {
        Some(json) => DuplicateSettings::from_json(&json)
            .map(Some)
            .context("Saved duplicate settings are unreadable"),
        None => Ok(None),
    }
}

/// Saved settings for a run; an unreadable record counts as never saved
pub async fn saved_duplicate_settings(
    store: &dyn PersistenceBackend,
) -> Option<DuplicateSettings> {
    match load_duplicate_settings(store).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Ignoring saved duplicate settings: {:#}", e);
            None
        }
    }
}

/// Create a summary from a finished run
pub fn create_summary(run_id: Uuid, started_at: DateTime<Utc>, report: &RunReport) -> RunSummary {
    let (status, failed_step, error) = match &report.outcome {
        RunOutcome::Completed => (RunStatus::Completed, None, None),
        RunOutcome::Failed { step, error } | RunOutcome::PreconditionFailed { step, error } => {
            (RunStatus::Failed, Some(*step), Some(error.clone()))
        }
        RunOutcome::NothingToRun | RunOutcome::AlreadyRunning => (
            RunStatus::Failed,
            None,
            Some(report.notification.message.clone()),
        ),
    };

    RunSummary {
        run_id,
        project_id: report.pipeline.project_id,
        status,
        started_at,
        completed_at: Some(Utc::now()),
        progress: report.pipeline.percent_complete(),
        completed_steps: report.pipeline.completed_steps(),
        total_steps: report.pipeline.total_steps(),
        failed_step,
        error,
    }
}
