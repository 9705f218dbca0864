//! Module-enablement resolver - which modules a project has switched on

use crate::{
    client::JobService,
    core::{ModuleList, ModuleName, ProjectId},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a project's module list was obtained
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Read from the project's saved configuration
    Configured,
    /// The project has no saved configuration
    NotConfigured,
    /// Configuration or catalog could not be loaded; the list is empty
    Degraded { reason: String },
}

/// Enabled module names of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnabledModules {
    pub names: Vec<ModuleName>,
    pub resolution: Resolution,
}

impl EnabledModules {
    fn configured(names: Vec<ModuleName>) -> Self {
        Self {
            names,
            resolution: Resolution::Configured,
        }
    }

    fn not_configured() -> Self {
        Self {
            names: Vec::new(),
            resolution: Resolution::NotConfigured,
        }
    }

    fn degraded(reason: String) -> Self {
        Self {
            names: Vec::new(),
            resolution: Resolution::Degraded { reason },
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.resolution, Resolution::Degraded { .. })
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolves a project's enabled modules to names
pub struct ModuleResolver<S> {
    service: Arc<S>,
}

impl<S: JobService> ModuleResolver<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    /// Resolve the ordered enabled module names for a project.
    ///
    /// Never fails: load errors are logged and yield an empty, degraded list.
    pub async fn resolve(&self, project_id: ProjectId) -> EnabledModules {
        let config = match self.service.project_config(project_id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                info!("Project {} has no saved configuration", project_id);
                return EnabledModules::not_configured();
            }
            Err(e) => {
                warn!("Failed to load configuration for project {}: {}", project_id, e);
                return EnabledModules::degraded(e.to_string());
            }
        };

        match config.module_list() {
            ModuleList::Empty => EnabledModules::configured(Vec::new()),
            ModuleList::Names(names) => {
                debug!("Project {} lists modules by name: {:?}", project_id, names);
                EnabledModules::configured(names)
            }
            ModuleList::Ids(ids) => {
                let catalog = match self.service.module_catalog().await {
                    Ok(catalog) => catalog,
                    Err(e) => {
                        warn!("Failed to load module catalog: {}", e);
                        return EnabledModules::degraded(e.to_string());
                    }
                };

                let lookup: HashMap<i64, &str> =
                    catalog.iter().map(|m| (m.id, m.name.as_str())).collect();

                let names = ids
                    .iter()
                    .filter_map(|id| match lookup.get(id) {
                        Some(name) => Some(ModuleName::new(*name)),
                        None => {
                            debug!("Module id {} not in catalog, dropping", id);
                            None
                        }
                    })
                    .collect();

                EnabledModules::configured(names)
            }
        }
    }
}
