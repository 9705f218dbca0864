//! Pipeline domain model

use crate::core::{
    module::ProjectId,
    state::StepStatus,
    step::{PipelineStep, StepDescriptor, StepKey},
};
use serde::Serialize;

/// The step list of one project, plus whether a run is in flight
///
/// Step order is fixed once built. The execution engine is the only writer;
/// everything else reads snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub project_id: ProjectId,
    pub steps: Vec<PipelineStep>,
    pub is_processing: bool,
}

impl Pipeline {
    /// Build a fresh, all-pending pipeline from a plan
    pub fn from_plan(project_id: ProjectId, plan: &[StepDescriptor]) -> Self {
        Self {
            project_id,
            steps: plan.iter().copied().map(PipelineStep::new).collect(),
            is_processing: false,
        }
    }

    /// Empty pipeline for a project with nothing to run
    pub fn empty(project_id: ProjectId) -> Self {
        Self::from_plan(project_id, &[])
    }

    /// Get a step by key
    pub fn step(&self, key: StepKey) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Get a mutable step by key
    pub fn step_mut(&mut self, key: StepKey) -> Option<&mut PipelineStep> {
        self.steps.iter_mut().find(|s| s.key == key)
    }

    pub fn keys(&self) -> Vec<StepKey> {
        self.steps.iter().map(|s| s.key).collect()
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.is_completed()).count()
    }

    /// The step currently in flight, if any
    pub fn in_progress(&self) -> Option<&PipelineStep> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::InProgress { .. }))
    }

    pub fn failed_step(&self) -> Option<&PipelineStep> {
        self.steps.iter().find(|s| s.is_failed())
    }

    /// Check if every step completed
    pub fn is_complete(&self) -> bool {
        !self.steps.is_empty() && self.steps.iter().all(|s| s.is_completed())
    }

    pub fn has_failed(&self) -> bool {
        self.failed_step().is_some()
    }

    /// `completed / total * 100`, or 0 for an empty pipeline
    pub fn percent_complete(&self) -> f64 {
        if self.steps.is_empty() {
            return 0.0;
        }
        self.completed_steps() as f64 / self.steps.len() as f64 * 100.0
    }
}
