//! Step domain model

use crate::core::{module::ProjectId, state::StepStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed set of processing steps the job service knows how to run
///
/// Declaration order is execution order: duplicates are resolved before
/// envelopes are built, and envelopes before extras and boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StepKey {
    #[serde(rename = "duplicate")]
    Duplicate,
    #[serde(rename = "envelope")]
    Envelope,
    #[serde(rename = "extras", alias = "extra")]
    Extras,
    #[serde(rename = "boxbreaking", alias = "box")]
    BoxBreaking,
}

impl StepKey {
    /// All keys in execution order
    pub const ALL: [StepKey; 4] = [
        StepKey::Duplicate,
        StepKey::Envelope,
        StepKey::Extras,
        StepKey::BoxBreaking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepKey::Duplicate => "duplicate",
            StepKey::Envelope => "envelope",
            StepKey::Extras => "extras",
            StepKey::BoxBreaking => "boxbreaking",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            StepKey::Duplicate => "Duplicate Processing",
            StepKey::Envelope => "Envelope Breaking",
            StepKey::Extras => "Extras",
            StepKey::BoxBreaking => "Box Breaking",
        }
    }

    /// Substring that enables this step when found in a module name
    pub fn keyword(&self) -> &'static str {
        match self {
            StepKey::Duplicate => "duplicate",
            StepKey::Envelope => "envelope",
            StepKey::Extras => "extra",
            StepKey::BoxBreaking => "box",
        }
    }

    /// Report file the job service writes for this step
    pub fn artifact_file_name(&self) -> &'static str {
        match self {
            StepKey::Duplicate => "DuplicateTool.xlsx",
            StepKey::Envelope => "EnvelopeBreaking.xlsx",
            StepKey::Extras => "ExtrasCalculation.xlsx",
            StepKey::BoxBreaking => "BoxBreaking.xlsx",
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duplicate" => Ok(StepKey::Duplicate),
            "envelope" => Ok(StepKey::Envelope),
            "extras" | "extra" => Ok(StepKey::Extras),
            "boxbreaking" | "box" => Ok(StepKey::BoxBreaking),
            other => Err(format!("unknown step key: {}", other)),
        }
    }
}

/// Planner output: which step, under which title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StepDescriptor {
    pub key: StepKey,
    pub title: &'static str,
}

impl From<StepKey> for StepDescriptor {
    fn from(key: StepKey) -> Self {
        Self {
            key,
            title: key.title(),
        }
    }
}

/// A single step in a project's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStep {
    pub key: StepKey,
    pub title: String,
    #[serde(flatten)]
    pub status: StepStatus,
    /// Elapsed `mm:ss`, set once the step completes
    pub duration: Option<String>,
    /// Download location of the step's artifact, once known
    pub file_url: Option<String>,
}

impl PipelineStep {
    pub fn new(descriptor: StepDescriptor) -> Self {
        Self {
            key: descriptor.key,
            title: descriptor.title.to_string(),
            status: StepStatus::Pending,
            duration: None,
            file_url: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, StepStatus::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, StepStatus::Failed { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            StepStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Derives artifact download locations from the file base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLocator {
    file_base_url: String,
}

impl ArtifactLocator {
    pub fn new(file_base_url: impl Into<String>) -> Self {
        let base: String = file_base_url.into();
        Self {
            file_base_url: base.trim_end_matches('/').to_string(),
        }
    }

    /// `{file_base}/{project_id}/{file_name}`
    pub fn url_for(&self, project_id: ProjectId, key: StepKey) -> String {
        format!(
            "{}/{}/{}",
            self.file_base_url,
            project_id,
            key.artifact_file_name()
        )
    }
}
