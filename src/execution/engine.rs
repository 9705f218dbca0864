//! Main execution engine - runs a project's steps in order
//!
//! The engine owns the published pipeline state. Readers subscribe to a
//! `watch` channel of snapshots or register event handlers; only the engine
//! writes.

use crate::{
    client::JobService,
    core::{
        format_duration, ArtifactLocator, DuplicateSettings, Pipeline, ProjectId, StepDescriptor,
        StepKey, StepStatus,
    },
    execution::{StepExecutor, StepOutcome},
};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Severity of a run notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

/// The single summary message a run produces for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step completed
    Completed,
    /// A remote call failed; later steps were not attempted
    Failed { step: StepKey, error: String },
    /// A step's precondition was not met; later steps were not attempted
    PreconditionFailed { step: StepKey, error: String },
    /// The plan was empty
    NothingToRun,
    /// A run for the same project was still in flight
    AlreadyRunning,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    /// True when the run did not start at all
    pub fn was_refused(&self) -> bool {
        matches!(self, RunOutcome::NothingToRun | RunOutcome::AlreadyRunning)
    }
}

/// What `execute` hands back once a run is over
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub pipeline: Pipeline,
    pub notification: Notification,
}

/// Events that can occur during a run
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        project_id: ProjectId,
        total_steps: usize,
    },
    StepStarted {
        project_id: ProjectId,
        key: StepKey,
        index: usize,
        total_steps: usize,
    },
    StepCompleted {
        project_id: ProjectId,
        key: StepKey,
        duration: String,
        file_url: String,
        message: String,
    },
    StepFailed {
        project_id: ProjectId,
        key: StepKey,
        error: String,
        precondition: bool,
    },
    RunFinished {
        project_id: ProjectId,
        outcome: RunOutcome,
        percent_complete: f64,
    },
    Notified(Notification),
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Live pipelines of the runs in flight, by project
type ActiveRuns = StdMutex<HashMap<ProjectId, Pipeline>>;

fn lock_runs(runs: &ActiveRuns) -> MutexGuard<'_, HashMap<ProjectId, Pipeline>> {
    runs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds a project's slot in the active runs until dropped, including when
/// the `execute` future is dropped mid-run
struct RunGuard<'a> {
    runs: &'a ActiveRuns,
    state: &'a watch::Sender<Option<Pipeline>>,
    project_id: ProjectId,
}

impl<'a> RunGuard<'a> {
    /// Claim the project, or hand back its live pipeline if it is already running
    fn acquire(
        runs: &'a ActiveRuns,
        state: &'a watch::Sender<Option<Pipeline>>,
        pipeline: &Pipeline,
    ) -> Result<Self, Pipeline> {
        let mut active = lock_runs(runs);
        if let Some(live) = active.get(&pipeline.project_id) {
            return Err(live.clone());
        }
        active.insert(pipeline.project_id, pipeline.clone());
        Ok(Self {
            runs,
            state,
            project_id: pipeline.project_id,
        })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        let mut active = lock_runs(self.runs);
        active.remove(&self.project_id);

        // An abandoned run must not stay on screen as running
        self.state.send_if_modified(|current| match current {
            Some(shown) if shown.project_id == self.project_id && shown.is_processing => {
                shown.is_processing = false;
                for step in &mut shown.steps {
                    if matches!(step.status, StepStatus::InProgress { .. }) {
                        step.status = StepStatus::Pending;
                    }
                }
                true
            }
            _ => false,
        });
    }
}

/// Pipeline execution engine
pub struct ExecutionEngine<S> {
    executor: StepExecutor<S>,
    locator: ArtifactLocator,
    state: watch::Sender<Option<Pipeline>>,
    active_runs: ActiveRuns,
    event_handlers: Mutex<Vec<EventHandler>>,
}

impl<S: JobService + 'static> ExecutionEngine<S> {
    pub fn new(service: Arc<S>, locator: ArtifactLocator) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            executor: StepExecutor::new(service),
            locator,
            state,
            active_runs: StdMutex::new(HashMap::new()),
            event_handlers: Mutex::new(Vec::new()),
        }
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.lock().await.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    async fn emit_event(&self, event: ExecutionEvent) {
        let handlers = self.event_handlers.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }

    /// Subscribe to pipeline snapshots; `None` until a pipeline is published
    pub fn subscribe(&self) -> watch::Receiver<Option<Pipeline>> {
        self.state.subscribe()
    }

    /// Current pipeline snapshot
    pub fn snapshot(&self) -> Option<Pipeline> {
        self.state.borrow().clone()
    }

    /// Show a project's pipeline, e.g. after selecting it. A project that
    /// is mid-run shows its live pipeline instead of the one given.
    pub fn publish(&self, pipeline: Pipeline) -> Pipeline {
        let active = lock_runs(&self.active_runs);
        let shown = active.get(&pipeline.project_id).cloned().unwrap_or(pipeline);
        self.state.send_replace(Some(shown.clone()));
        shown
    }

    /// Whether a run for this project is in flight
    pub fn is_processing(&self, project_id: ProjectId) -> bool {
        lock_runs(&self.active_runs).contains_key(&project_id)
    }

    /// Live pipeline of a run in flight
    pub fn live_pipeline(&self, project_id: ProjectId) -> Option<Pipeline> {
        lock_runs(&self.active_runs).get(&project_id).cloned()
    }

    /// Record a run's progress and push it, unless another project is being shown
    fn publish_progress(&self, pipeline: &Pipeline) {
        let mut active = lock_runs(&self.active_runs);
        if let Some(live) = active.get_mut(&pipeline.project_id) {
            *live = pipeline.clone();
        }
        self.state.send_if_modified(|current| match current {
            Some(shown) if shown.project_id != pipeline.project_id => false,
            _ => {
                *current = Some(pipeline.clone());
                true
            }
        });
    }

    /// Run every step of the plan, in order, one at a time.
    ///
    /// Each step starts only after the previous one settled. The first
    /// failure stops the run and leaves the remaining steps pending. Never
    /// returns an error: the outcome is in the report.
    pub async fn execute(
        &self,
        project_id: ProjectId,
        plan: &[StepDescriptor],
        duplicate: Option<&DuplicateSettings>,
    ) -> RunReport {
        if plan.is_empty() {
            info!("Project {} has no enabled modules to process", project_id);
            return self
                .refuse(
                    RunOutcome::NothingToRun,
                    Pipeline::empty(project_id),
                    Notification::info("No enabled modules to process"),
                )
                .await;
        }

        let mut pipeline = Pipeline::from_plan(project_id, plan);
        pipeline.is_processing = true;

        let guard = match RunGuard::acquire(&self.active_runs, &self.state, &pipeline) {
            Ok(guard) => guard,
            Err(live) => {
                warn!("Run requested for project {} while one is in progress", project_id);
                return self
                    .refuse(
                        RunOutcome::AlreadyRunning,
                        live,
                        Notification::info(format!(
                            "Processing is already running for project {}",
                            project_id
                        )),
                    )
                    .await;
            }
        };
        let total_steps = pipeline.total_steps();

        info!("Starting pipeline run for project {} ({} steps)", project_id, total_steps);
        self.publish_progress(&pipeline);
        self.emit_event(ExecutionEvent::RunStarted {
            project_id,
            total_steps,
        })
        .await;

        let mut outcome = RunOutcome::Completed;

        for index in 0..total_steps {
            let key = pipeline.steps[index].key;
            let started = Instant::now();

            pipeline.steps[index].status = StepStatus::InProgress {
                started_at: Utc::now(),
            };
            self.publish_progress(&pipeline);
            self.emit_event(ExecutionEvent::StepStarted {
                project_id,
                key,
                index,
                total_steps,
            })
            .await;

            match self.executor.execute(project_id, key, duplicate).await {
                StepOutcome::Success { message } => {
                    let duration = format_duration(started.elapsed());
                    let file_url = self.locator.url_for(project_id, key);

                    let step = &mut pipeline.steps[index];
                    step.status = StepStatus::Completed;
                    step.duration = Some(duration.clone());
                    step.file_url = Some(file_url.clone());

                    self.publish_progress(&pipeline);
                    self.emit_event(ExecutionEvent::StepCompleted {
                        project_id,
                        key,
                        duration,
                        file_url,
                        message,
                    })
                    .await;
                }
                StepOutcome::Failed { error } => {
                    self.mark_failed(&mut pipeline, index, error.clone(), false).await;
                    outcome = RunOutcome::Failed { step: key, error };
                    break;
                }
                StepOutcome::PreconditionFailed { error } => {
                    self.mark_failed(&mut pipeline, index, error.clone(), true).await;
                    outcome = RunOutcome::PreconditionFailed { step: key, error };
                    break;
                }
            }
        }

        pipeline.is_processing = false;
        self.publish_progress(&pipeline);
        drop(guard);

        let notification = match &outcome {
            RunOutcome::Completed => Notification::success(format!(
                "All {} steps completed for project {}",
                total_steps, project_id
            )),
            RunOutcome::Failed { step, error } => {
                Notification::error(format!("{} failed: {}", step.title(), error))
            }
            RunOutcome::PreconditionFailed { step, error } => {
                Notification::error(format!("{} could not start: {}", step.title(), error))
            }
            RunOutcome::NothingToRun | RunOutcome::AlreadyRunning => {
                Notification::info("Run did not start")
            }
        };

        info!(
            "Pipeline run finished for project {}: {:?} ({:.0}% complete)",
            project_id,
            outcome,
            pipeline.percent_complete()
        );
        self.emit_event(ExecutionEvent::RunFinished {
            project_id,
            outcome: outcome.clone(),
            percent_complete: pipeline.percent_complete(),
        })
        .await;
        self.emit_event(ExecutionEvent::Notified(notification.clone()))
            .await;

        RunReport {
            outcome,
            pipeline,
            notification,
        }
    }

    /// Mark a step as failed
    async fn mark_failed(
        &self,
        pipeline: &mut Pipeline,
        index: usize,
        error: String,
        precondition: bool,
    ) {
        let step = &mut pipeline.steps[index];
        let key = step.key;
        step.status = StepStatus::Failed {
            error: error.clone(),
        };
        error!("Step {} failed: {}", key, error);

        self.publish_progress(pipeline);
        self.emit_event(ExecutionEvent::StepFailed {
            project_id: pipeline.project_id,
            key,
            error,
            precondition,
        })
        .await;
    }

    async fn refuse(
        &self,
        outcome: RunOutcome,
        pipeline: Pipeline,
        notification: Notification,
    ) -> RunReport {
        self.emit_event(ExecutionEvent::Notified(notification.clone()))
            .await;
        RunReport {
            outcome,
            pipeline,
            notification,
        }
    }
}
