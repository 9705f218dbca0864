//! Client for the ERP reference-data API and batch job service

pub mod config;
mod http;
pub mod response;

use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

use crate::core::{DuplicateSettings, Module, ProjectConfig, ProjectId, ProjectSummary};
use http::HttpBackend;

pub use config::ServiceConfig;
pub use response::{DuplicateRunResponse, JobMessage, ReportExists, ServiceError};

const USER_AGENT_VALUE: &str = concat!("erp-pipeline/", env!("CARGO_PKG_VERSION"));

/// Relative paths of every remote call, kept in one place
pub mod endpoints {
    pub const PROJECT_CONFIG: &str = "ProjectConfigs/ByProject";
    pub const MODULES: &str = "Modules";
    pub const PROJECTS: &str = "Projects";
    pub const DUPLICATE_RUN: &str = "Duplicate";
    pub const ENVELOPE_BREAKING_RUN: &str = "EnvelopeBreaking/Run";
    pub const EXTRAS_RUN: &str = "ExtrasEnvelope/Run";
    pub const BOX_BREAKING_RUN: &str = "BoxBreaking/Run";
    pub const REPORT_EXISTS: &str = "Reports/Exists";
}

/// The remote collaborators the orchestrator depends on
///
/// Processing calls are synchronous on the server: the returned future
/// settles when the job has finished.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Saved configuration of a project, `None` when there is no record
    async fn project_config(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<ProjectConfig>, ServiceError>;

    /// Full module catalog
    async fn module_catalog(&self) -> Result<Vec<Module>, ServiceError>;

    /// All projects
    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ServiceError>;

    async fn run_duplicate(
        &self,
        project_id: ProjectId,
        settings: &DuplicateSettings,
    ) -> Result<DuplicateRunResponse, ServiceError>;

    async fn run_envelope_breaking(&self, project_id: ProjectId)
        -> Result<JobMessage, ServiceError>;

    async fn run_extras(&self, project_id: ProjectId) -> Result<JobMessage, ServiceError>;

    async fn run_box_breaking(&self, project_id: ProjectId) -> Result<JobMessage, ServiceError>;

    /// Whether a generated report exists for the project
    async fn report_exists(
        &self,
        project_id: ProjectId,
        file_name: &str,
    ) -> Result<bool, ServiceError>;

    /// Raw bytes of a report file
    async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, ServiceError>;
}

/// reqwest-backed job service client
#[derive(Debug, Clone)]
pub struct HttpJobService {
    http: HttpBackend,
    config: ServiceConfig,
}

impl HttpJobService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| ServiceError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http: HttpBackend { client },
            config,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base_url, path)
    }

    fn job_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.job_base_url, path)
    }

    async fn run_job(&self, path: &str, project_id: ProjectId) -> Result<JobMessage, ServiceError> {
        let url = self.job_url(path);
        self.http
            .json(Method::POST, &url, &[("ProjectId", project_id.to_string())])
            .await
    }
}

/// Query parameters of a duplicate run
pub(crate) fn duplicate_query(
    project_id: ProjectId,
    settings: &DuplicateSettings,
) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("ProjectId", project_id.to_string()),
        ("mergefields", settings.merge_fields.join(",")),
        ("consolidate", settings.strategy.consolidate().to_string()),
    ];
    match &settings.enhancement {
        Some(enhancement) => {
            query.push(("enhancement", "true".to_string()));
            query.push(("percent", enhancement.percent.to_string()));
            query.push(("rounding", enhancement.rounding.as_str().to_string()));
        }
        None => query.push(("enhancement", "false".to_string())),
    }
    query
}

#[async_trait]
impl JobService for HttpJobService {
    async fn project_config(
        &self,
        project_id: ProjectId,
    ) -> Result<Option<ProjectConfig>, ServiceError> {
        let url = format!("{}/{}", self.api_url(endpoints::PROJECT_CONFIG), project_id);
        debug!(url = %url, "fetching project config");

        let value: serde_json::Value = match self.http.json(Method::GET, &url, &[]).await {
            Ok(value) => value,
            Err(ServiceError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        // Some deployments answer with a one-element list
        let record = match value {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Array(items) => match items.into_iter().next() {
                Some(first) => first,
                None => return Ok(None),
            },
            other => other,
        };

        serde_json::from_value(record)
            .map(Some)
            .map_err(|e| ServiceError::InvalidResponse(format!("project config: {}", e)))
    }

    async fn module_catalog(&self) -> Result<Vec<Module>, ServiceError> {
        let url = self.api_url(endpoints::MODULES);
        debug!(url = %url, "fetching module catalog");
        self.http.json(Method::GET, &url, &[]).await
    }

    async fn list_projects(&self) -> Result<Vec<ProjectSummary>, ServiceError> {
        let url = self.api_url(endpoints::PROJECTS);
        debug!(url = %url, "listing projects");
        self.http.json(Method::GET, &url, &[]).await
    }

    async fn run_duplicate(
        &self,
        project_id: ProjectId,
        settings: &DuplicateSettings,
    ) -> Result<DuplicateRunResponse, ServiceError> {
        let url = self.job_url(endpoints::DUPLICATE_RUN);
        self.http
            .json(Method::POST, &url, &duplicate_query(project_id, settings))
            .await
    }

    async fn run_envelope_breaking(
        &self,
        project_id: ProjectId,
    ) -> Result<JobMessage, ServiceError> {
        self.run_job(endpoints::ENVELOPE_BREAKING_RUN, project_id).await
    }

    async fn run_extras(&self, project_id: ProjectId) -> Result<JobMessage, ServiceError> {
        self.run_job(endpoints::EXTRAS_RUN, project_id).await
    }

    async fn run_box_breaking(&self, project_id: ProjectId) -> Result<JobMessage, ServiceError> {
        self.run_job(endpoints::BOX_BREAKING_RUN, project_id).await
    }

    async fn report_exists(
        &self,
        project_id: ProjectId,
        file_name: &str,
    ) -> Result<bool, ServiceError> {
        let url = self.job_url(endpoints::REPORT_EXISTS);
        let response: ReportExists = self
            .http
            .json(
                Method::GET,
                &url,
                &[
                    ("projectId", project_id.to_string()),
                    ("fileName", file_name.to_string()),
                ],
            )
            .await?;
        Ok(response.exists)
    }

    async fn download_artifact(&self, url: &str) -> Result<Vec<u8>, ServiceError> {
        debug!(url = %url, "downloading artifact");
        self.http.bytes(url).await
    }
}
