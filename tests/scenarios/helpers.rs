//! Test utilities: a scripted job service and assertion helpers

use async_trait::async_trait;
use erp_pipeline::client::{DuplicateRunResponse, JobMessage, JobService, ServiceError};
use erp_pipeline::core::{
    ArtifactLocator, DuplicateSettings, MergeStrategy, Module, ModuleRef, Pipeline, ProjectConfig,
    ProjectId, ProjectSummary, StepDescriptor, StepKey, StepStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const FILE_BASE: &str = "http://files.test/reports";

/// What `project_config` answers
#[derive(Clone)]
pub enum ConfigReply {
    Missing,
    Modules(Vec<ModuleRef>),
    Fails,
}

/// Mock job service driven by a script of replies
pub struct MockJobService {
    config: ConfigReply,
    catalog: Vec<Module>,
    catalog_fails: bool,
    delays: HashMap<StepKey, Duration>,
    failures: HashMap<StepKey, Option<String>>,
    existing_reports: HashSet<&'static str>,
    failing_probes: HashSet<&'static str>,
    report_check_delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    report_checks_in_flight: AtomicUsize,
    max_report_checks_in_flight: AtomicUsize,
}

impl MockJobService {
    pub fn new() -> Self {
        Self {
            config: ConfigReply::Missing,
            catalog: Vec::new(),
            catalog_fails: false,
            delays: HashMap::new(),
            failures: HashMap::new(),
            existing_reports: HashSet::new(),
            failing_probes: HashSet::new(),
            report_check_delay: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            report_checks_in_flight: AtomicUsize::new(0),
            max_report_checks_in_flight: AtomicUsize::new(0),
        }
    }

    /// Project configured with module names
    pub fn with_module_names(mut self, names: &[&str]) -> Self {
        self.config = ConfigReply::Modules(
            names
                .iter()
                .map(|n| ModuleRef::Name(n.to_string()))
                .collect(),
        );
        self
    }

    /// Project configured with catalog ids
    pub fn with_module_ids(mut self, ids: &[i64]) -> Self {
        self.config = ConfigReply::Modules(ids.iter().map(|id| ModuleRef::Id(*id)).collect());
        self
    }

    /// Every step enabled, by name
    pub fn with_all_modules(self) -> Self {
        self.with_module_names(&["Duplicate Tool", "Envelope Breaking", "Extra Envelopes", "Box Breaking"])
    }

    pub fn with_config(mut self, config: ConfigReply) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, modules: &[(i64, &str)]) -> Self {
        self.catalog = modules
            .iter()
            .map(|(id, name)| Module {
                id: *id,
                name: name.to_string(),
                description: String::new(),
            })
            .collect();
        self
    }

    pub fn with_failing_catalog(mut self) -> Self {
        self.catalog_fails = true;
        self
    }

    pub fn with_delay(mut self, key: StepKey, delay: Duration) -> Self {
        self.delays.insert(key, delay);
        self
    }

    /// Make a step's job fail; `message` is what the server says, if anything
    pub fn with_failure(mut self, key: StepKey, message: Option<&str>) -> Self {
        self.failures.insert(key, message.map(str::to_string));
        self
    }

    pub fn with_existing_report(mut self, key: StepKey) -> Self {
        self.existing_reports.insert(key.artifact_file_name());
        self
    }

    pub fn with_failing_probe(mut self, key: StepKey) -> Self {
        self.failing_probes.insert(key.artifact_file_name());
        self
    }

    /// Make every report lookup take this long
    pub fn with_report_check_delay(mut self, delay: Duration) -> Self {
        self.report_check_delay = Some(delay);
        self
    }

    /// Every call made, in order, e.g. `run:envelope` or `probe:BoxBreaking.xlsx`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Processing calls only, in order
    pub fn run_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("run:") || c.starts_with("done:"))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Highest number of processing calls that were in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of report lookups that were in flight at once
    pub fn max_report_checks_in_flight(&self) -> usize {
        self.max_report_checks_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn run_step(&self, key: StepKey) -> Result<String, ServiceError> {
        self.record(format!("run:{}", key));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.record(format!("done:{}", key));

        match self.failures.get(&key) {
            Some(message) => Err(ServiceError::Status {
                status: 500,
                message: message.clone(),
            }),
            None => Ok(format!("{} finished", key.title())),
        }
    }
}

#[async_trait]
impl JobService for MockJobService {
    async fn project_config(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<ProjectConfig>, ServiceError> {
        self.record(format!("config:{}", project_id));
        match &self.config {
            ConfigReply::Missing => Ok(None),
            ConfigReply::Modules(modules) => Ok(Some(ProjectConfig {
                project_id: Some(project_id),
                modules: modules.clone(),
                ..Default::default()
            })),
            ConfigReply::Fails => Err(ServiceError::Network("connection refused".to_string())),
        }
    }

    async fn module_catalog(&self) -> Result<Vec<Module>, ServiceError> {
        self.record("catalog".to_string());
        if self.catalog_fails {
            return Err(ServiceError::Status {
                status: 503,
                message: None,
            });
        }
        Ok(self.catalog.clone())
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ServiceError> {
        Ok(Vec::new())
    }

    async fn run_duplicate(
        &self,
        _project_id: ProjectId,
        _settings: &DuplicateSettings,
    ) -> Result<DuplicateRunResponse, ServiceError> {
        self.run_step(StepKey::Duplicate)
            .await
            .map(|_| DuplicateRunResponse {
                duplicates_removed: 3,
            })
    }

    async fn run_envelope_breaking(
        &self,
        _project_id: ProjectId,
    ) -> Result<JobMessage, ServiceError> {
        self.run_step(StepKey::Envelope)
            .await
            .map(|message| JobMessage { message })
    }

    async fn run_extras(&self, _project_id: ProjectId) -> Result<JobMessage, ServiceError> {
        self.run_step(StepKey::Extras)
            .await
            .map(|message| JobMessage { message })
    }

    async fn run_box_breaking(&self, _project_id: ProjectId) -> Result<JobMessage, ServiceError> {
        self.run_step(StepKey::BoxBreaking)
            .await
            .map(|message| JobMessage { message })
    }

    async fn report_exists(
        &self,
        _project_id: ProjectId,
        file_name: &str,
    ) -> Result<bool, ServiceError> {
        self.record(format!("probe:{}", file_name));
        let now = self.report_checks_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_report_checks_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.report_check_delay {
            tokio::time::sleep(delay).await;
        }
        self.report_checks_in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_probes.contains(file_name) {
            return Err(ServiceError::Network("probe timed out".to_string()));
        }
        Ok(self.existing_reports.contains(file_name))
    }

    async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        Err(ServiceError::NotFound(url.to_string()))
    }
}

pub fn locator() -> ArtifactLocator {
    ArtifactLocator::new(FILE_BASE)
}

pub fn settings() -> DuplicateSettings {
    DuplicateSettings::new(vec!["CatchNo".to_string()], MergeStrategy::Consolidate)
}

pub fn plan_of(keys: &[StepKey]) -> Vec<StepDescriptor> {
    keys.iter().copied().map(StepDescriptor::from).collect()
}

pub fn full_plan() -> Vec<StepDescriptor> {
    plan_of(&StepKey::ALL)
}

/// Assert each step's status, in order
pub fn assert_statuses(pipeline: &Pipeline, expected: &[&str]) {
    let actual: Vec<&str> = pipeline.steps.iter().map(|s| s.status.label()).collect();
    assert_eq!(actual, expected, "step statuses of {:?}", pipeline.keys());
}

pub fn assert_step_failed(pipeline: &Pipeline, key: StepKey, error: &str) {
    let step = pipeline
        .step(key)
        .unwrap_or_else(|| panic!("step {} not in pipeline", key));
    match &step.status {
        StepStatus::Failed { error: actual } => assert_eq!(actual, error),
        other => panic!("step {} expected to fail, was {:?}", key, other),
    }
}

pub fn service(mock: MockJobService) -> Arc<MockJobService> {
    Arc::new(mock)
}
