//! Duplicate-tool settings
//!
//! The duplicate step is the only step that needs client-supplied
//! parameters. They are entered ahead of time, saved locally, and handed to
//! the execution engine explicitly at run time.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Key under which the settings are kept in the local store
pub const DUPLICATE_SETTINGS_KEY: &str = "duplicate-tool-settings";

/// What the job service does with duplicate rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Merge duplicates into one row and sum their quantities
    Consolidate,
    /// Keep the first row and drop the others
    Remove,
}

impl MergeStrategy {
    pub fn consolidate(&self) -> bool {
        matches!(self, MergeStrategy::Consolidate)
    }
}

/// Rounding applied after a quantity enhancement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundingMode {
    Round,
    Ceil,
    Floor,
}

impl RoundingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundingMode::Round => "round",
            RoundingMode::Ceil => "ceil",
            RoundingMode::Floor => "floor",
        }
    }
}

/// Optional percentage uplift applied to quantities after deduplication
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub percent: f64,
    #[serde(default = "default_rounding")]
    pub rounding: RoundingMode,
}

fn default_rounding() -> RoundingMode {
    RoundingMode::Round
}

/// Settings the duplicate step sends to the job service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSettings {
    /// Fields whose combined value identifies a duplicate
    pub merge_fields: Vec<String>,

    #[serde(default = "default_strategy")]
    pub strategy: MergeStrategy,

    #[serde(default)]
    pub enhancement: Option<Enhancement>,
}

fn default_strategy() -> MergeStrategy {
    MergeStrategy::Consolidate
}

impl DuplicateSettings {
    pub fn new(merge_fields: Vec<String>, strategy: MergeStrategy) -> Self {
        Self {
            merge_fields,
            strategy,
            enhancement: None,
        }
    }

    pub fn with_enhancement(mut self, percent: f64, rounding: RoundingMode) -> Self {
        self.enhancement = Some(Enhancement { percent, rounding });
        self
    }

    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: DuplicateSettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings as saved in the local store
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: DuplicateSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.merge_fields.is_empty() {
            anyhow::bail!("At least one merge field is required");
        }

        let mut seen = std::collections::HashSet::new();
        for field in &self.merge_fields {
            if field.trim().is_empty() {
                anyhow::bail!("Merge field names must not be blank");
            }
            if !seen.insert(field.as_str()) {
                anyhow::bail!("Duplicate merge field: {}", field);
            }
        }

        if let Some(enhancement) = &self.enhancement {
            if !(enhancement.percent > 0.0 && enhancement.percent <= 100.0) {
                anyhow::bail!(
                    "Enhancement percent must be in (0, 100], got {}",
                    enhancement.percent
                );
            }
        }

        Ok(())
    }
}
