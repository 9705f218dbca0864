//! Project dashboard - ties resolver, planner, prober and engine together
//! for the currently selected project

use crate::{
    client::JobService,
    core::{ArtifactLocator, DuplicateSettings, Pipeline, ProjectId, StepDescriptor},
    execution::{
        plan_steps, EnabledModules, ExecutionEngine, ModuleResolver, Notification,
        ReportProber, RunOutcome, RunReport,
    },
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// What the dashboard currently shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No project picked yet
    NotSelected,
    /// Configuration for the project is being loaded
    Loading { project_id: ProjectId },
    /// Modules resolved and steps planned
    Ready {
        project_id: ProjectId,
        modules: EnabledModules,
        plan: Vec<StepDescriptor>,
    },
}

impl Selection {
    pub fn project_id(&self) -> Option<ProjectId> {
        match self {
            Selection::NotSelected => None,
            Selection::Loading { project_id } | Selection::Ready { project_id, .. } => {
                Some(*project_id)
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Selection::Loading { .. })
    }
}

/// Coordinates the pipeline view of one selected project
pub struct ProjectDashboard<S> {
    resolver: ModuleResolver<S>,
    prober: ReportProber<S>,
    engine: Arc<ExecutionEngine<S>>,
    selection: watch::Sender<Selection>,
}

impl<S: JobService + 'static> ProjectDashboard<S> {
    pub fn new(service: Arc<S>, locator: ArtifactLocator) -> Self {
        let engine = Arc::new(ExecutionEngine::new(Arc::clone(&service), locator.clone()));
        Self::with_engine(service, locator, engine)
    }

    /// Build around an existing engine, e.g. one with handlers attached
    pub fn with_engine(
        service: Arc<S>,
        locator: ArtifactLocator,
        engine: Arc<ExecutionEngine<S>>,
    ) -> Self {
        let (selection, _) = watch::channel(Selection::NotSelected);
        Self {
            resolver: ModuleResolver::new(Arc::clone(&service)),
            prober: ReportProber::new(service, locator),
            engine,
            selection,
        }
    }

    pub fn engine(&self) -> &Arc<ExecutionEngine<S>> {
        &self.engine
    }

    pub fn selection(&self) -> Selection {
        self.selection.borrow().clone()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Selection> {
        self.selection.subscribe()
    }

    /// Current step list, if a project has been loaded
    pub fn pipeline(&self) -> Option<Pipeline> {
        self.engine.snapshot()
    }

    /// Switch to a project: resolve its modules, plan its steps, and
    /// reflect reports left by earlier runs
    pub async fn select_project(&self, project_id: ProjectId) -> Pipeline {
        self.selection
            .send_replace(Selection::Loading { project_id });

        let modules = self.resolver.resolve(project_id).await;
        let plan = plan_steps(&modules.names);
        info!(
            "Project {} enables {} modules, {} steps planned",
            project_id,
            modules.names.len(),
            plan.len()
        );

        let mut pipeline = Pipeline::from_plan(project_id, &plan);
        if !plan.is_empty() && !self.engine.is_processing(project_id) {
            self.prober.prepopulate(&mut pipeline).await;
        }

        // A project that is mid-run comes back with its live pipeline
        let shown = self.engine.publish(pipeline);

        self.selection.send_replace(Selection::Ready {
            project_id,
            modules,
            plan,
        });

        shown
    }

    /// Re-plan from the selected project's modules and run every step
    /// from the start
    pub async fn run(&self, duplicate: Option<&DuplicateSettings>) -> RunReport {
        let (project_id, plan) = match self.selection() {
            Selection::Ready {
                project_id,
                modules,
                ..
            } => (project_id, plan_steps(&modules.names)),
            Selection::Loading { project_id } => {
                return RunReport {
                    outcome: RunOutcome::NothingToRun,
                    pipeline: Pipeline::empty(project_id),
                    notification: Notification::info("Project configuration is still loading"),
                };
            }
            Selection::NotSelected => {
                return RunReport {
                    outcome: RunOutcome::NothingToRun,
                    pipeline: Pipeline::empty(ProjectId(0)),
                    notification: Notification::info("No project selected"),
                };
            }
        };

        self.engine.execute(project_id, &plan, duplicate).await
    }
}
