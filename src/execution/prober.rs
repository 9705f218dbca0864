//! Report-existence prober - which step reports are already on the server

use crate::{
    client::JobService,
    core::{ArtifactLocator, Pipeline, ProjectId, StepKey, StepStatus, UNKNOWN_DURATION},
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Step keys whose reports exist for one project
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportAvailability {
    pub existing: BTreeSet<StepKey>,
}

impl ReportAvailability {
    pub fn exists(&self, key: StepKey) -> bool {
        self.existing.contains(&key)
    }

    /// Mark matching steps completed with their download location.
    ///
    /// Steps without a report are left as they are.
    pub fn apply(&self, pipeline: &mut Pipeline, locator: &ArtifactLocator) {
        let project_id = pipeline.project_id;
        for step in pipeline.steps.iter_mut() {
            if self.exists(step.key) {
                step.status = StepStatus::Completed;
                step.file_url = Some(locator.url_for(project_id, step.key));
                step.duration = Some(UNKNOWN_DURATION.to_string());
            }
        }
    }
}

/// Probes the job service for previously generated reports
pub struct ReportProber<S> {
    service: Arc<S>,
    locator: ArtifactLocator,
}

impl<S: JobService + 'static> ReportProber<S> {
    pub fn new(service: Arc<S>, locator: ArtifactLocator) -> Self {
        Self { service, locator }
    }

    /// Probe every given step's report at once and wait for all of them.
    ///
    /// A failed probe counts as "does not exist" and never affects the others.
    pub async fn probe(&self, project_id: ProjectId, keys: &[StepKey]) -> ReportAvailability {
        let mut probes = JoinSet::new();

        for key in keys.iter().copied() {
            let service = Arc::clone(&self.service);
            probes.spawn(async move {
                let result = service
                    .report_exists(project_id, key.artifact_file_name())
                    .await;
                (key, result)
            });
        }

        let mut availability = ReportAvailability::default();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((key, Ok(true))) => {
                    debug!("Report for {} exists for project {}", key, project_id);
                    availability.existing.insert(key);
                }
                Ok((_, Ok(false))) => {}
                Ok((key, Err(e))) => {
                    warn!(
                        "Report probe for {} failed for project {}: {}",
                        key, project_id, e
                    );
                }
                Err(e) => warn!("Report probe task failed: {}", e),
            }
        }

        availability
    }

    /// Probe the pipeline's own steps and pre-populate the ones already done
    pub async fn prepopulate(&self, pipeline: &mut Pipeline) -> ReportAvailability {
        let availability = self.probe(pipeline.project_id, &pipeline.keys()).await;
        availability.apply(pipeline, &self.locator);
        availability
    }
}
