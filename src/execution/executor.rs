//! Step executor - runs one step's remote action

use crate::{
    client::JobService,
    core::{DuplicateSettings, ProjectId, StepKey},
};
use std::sync::Arc;
use tracing::{error, info};

/// Result of executing a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The job service finished the step
    Success { message: String },
    /// The remote call failed
    Failed { error: String },
    /// The step could not be attempted; nothing was sent
    PreconditionFailed { error: String },
}

/// Executes a single step against the job service
pub struct StepExecutor<S> {
    service: Arc<S>,
}

impl<S: JobService> StepExecutor<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Execute a step and return the result
    pub async fn execute(
        &self,
        project_id: ProjectId,
        key: StepKey,
        duplicate: Option<&DuplicateSettings>,
    ) -> StepOutcome {
        info!("Executing step {} for project {}", key, project_id);

        let result = match key {
            StepKey::Duplicate => {
                let Some(settings) = duplicate else {
                    error!("Duplicate tool settings missing for project {}", project_id);
                    return StepOutcome::PreconditionFailed {
                        error: "Duplicate tool settings have not been saved".to_string(),
                    };
                };
                self.service
                    .run_duplicate(project_id, settings)
                    .await
                    .map(|r| format!("{} duplicates removed", r.duplicates_removed))
            }
            StepKey::Envelope => self
                .service
                .run_envelope_breaking(project_id)
                .await
                .map(|r| r.message),
            StepKey::Extras => self.service.run_extras(project_id).await.map(|r| r.message),
            StepKey::BoxBreaking => self
                .service
                .run_box_breaking(project_id)
                .await
                .map(|r| r.message),
        };

        match result {
            Ok(message) => {
                info!("Step {} completed successfully", key);
                StepOutcome::Success { message }
            }
            Err(e) => {
                error!("Step {} failed for project {}: {}", key, project_id, e);
                let error = e
                    .server_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{} failed", key.title()));
                StepOutcome::Failed { error }
            }
        }
    }
}
