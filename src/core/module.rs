//! Project and module reference data

use serde::{Deserialize, Serialize};
use std::fmt;

/// External identity of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub i64);

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(ProjectId)
    }
}

/// Catalog entry for an optional project capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Canonical, human-readable module name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring test
    pub fn mentions(&self, keyword: &str) -> bool {
        self.0.to_lowercase().contains(&keyword.to_lowercase())
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Raw element of a project's `modules` field as stored by the
/// configuration screen: either a catalog id or a module name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleRef {
    Id(i64),
    Name(String),
}

/// A project's enabled modules, with the id/name ambiguity settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleList {
    /// Nothing enabled
    Empty,
    /// Catalog ids that still need a lookup
    Ids(Vec<i64>),
    /// Names usable as-is
    Names(Vec<ModuleName>),
}

impl ModuleList {
    /// Settle the element type from the first entry.
    ///
    /// In id mode, strings holding an integer count as ids and any other
    /// string is dropped. In name mode, numbers are dropped.
    pub fn from_refs(refs: &[ModuleRef]) -> Self {
        match refs.first() {
            None => ModuleList::Empty,
            Some(ModuleRef::Id(_)) => ModuleList::Ids(
                refs.iter()
                    .filter_map(|r| match r {
                        ModuleRef::Id(id) => Some(*id),
                        ModuleRef::Name(name) => name.trim().parse().ok(),
                    })
                    .collect(),
            ),
            Some(ModuleRef::Name(_)) => ModuleList::Names(
                refs.iter()
                    .filter_map(|r| match r {
                        ModuleRef::Name(name) => Some(ModuleName::new(name.clone())),
                        ModuleRef::Id(_) => None,
                    })
                    .collect(),
            ),
        }
    }
}

/// Saved configuration of one project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub project_id: Option<ProjectId>,

    /// Enabled modules, in the order the configuration screen saved them
    #[serde(default)]
    pub modules: Vec<ModuleRef>,

    /// Envelope, box and extras criteria; not interpreted here
    #[serde(flatten)]
    pub criteria: serde_json::Map<String, serde_json::Value>,
}

impl ProjectConfig {
    pub fn module_list(&self) -> ModuleList {
        ModuleList::from_refs(&self.modules)
    }
}

/// Entry of the project list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    #[serde(default, alias = "projectName")]
    pub name: String,
}
