//! Job service client configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where the three backends live and how long to wait for them
///
/// Resolution order: defaults, then an optional YAML file, then `ERP_*`
/// environment variables, then explicit overrides from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Reference-data API (project configs, module catalog, projects)
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Batch job service (processing runs, report probes)
    #[serde(default = "default_job_base_url")]
    pub job_base_url: String,

    /// Static host serving generated report files
    #[serde(default = "default_file_base_url")]
    pub file_base_url: String,

    /// Timeout for requests in seconds
    ///
    /// Processing runs are synchronous on the server and can take minutes.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_job_base_url() -> String {
    "http://localhost:5001/api".to_string()
}

fn default_file_base_url() -> String {
    "http://localhost:5001/reports".to_string()
}

fn default_timeout_secs() -> u64 {
    1800
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            job_base_url: default_job_base_url(),
            file_base_url: default_file_base_url(),
            timeout_secs: default_timeout_secs(),
        }
        .normalized()
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ServiceConfig = serde_yaml::from_str(yaml)?;
        Ok(config.normalized())
    }

    /// Apply environment overrides.
    ///
    /// | Variable | Description |
    /// |----------|-------------|
    /// | `ERP_API_URL` | Reference-data API base URL |
    /// | `ERP_JOB_URL` | Job service base URL |
    /// | `ERP_FILE_URL` | Report file base URL |
    /// | `ERP_TIMEOUT_SECS` | Request timeout |
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any `ERP_*` lookup
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ERP_API_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = lookup("ERP_JOB_URL") {
            self.job_base_url = url;
        }
        if let Some(url) = lookup("ERP_FILE_URL") {
            self.file_base_url = url;
        }
        if let Some(timeout) = lookup("ERP_TIMEOUT_SECS").and_then(|v| v.trim().parse().ok()) {
            self.timeout_secs = timeout;
        }
        self.normalized()
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self.normalized()
    }

    pub fn with_job_base_url(mut self, url: impl Into<String>) -> Self {
        self.job_base_url = url.into();
        self.normalized()
    }

    pub fn with_file_base_url(mut self, url: impl Into<String>) -> Self {
        self.file_base_url = url.into();
        self.normalized()
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Point all three bases at one server (used by tests and single-host installs)
    pub fn with_single_host(self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.with_api_base_url(format!("{}/api", base))
            .with_job_base_url(format!("{}/jobs", base))
            .with_file_base_url(format!("{}/files", base))
    }

    fn normalized(mut self) -> Self {
        for url in [
            &mut self.api_base_url,
            &mut self.job_base_url,
            &mut self.file_base_url,
        ] {
            let trimmed = url.trim().trim_end_matches('/').to_string();
            *url = trimmed;
        }
        self
    }
}
