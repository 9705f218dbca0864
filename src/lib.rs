//! erp-pipeline - runs and tracks ERP Tools processing pipelines

pub mod cli;
pub mod client;
pub mod core;
pub mod execution;
pub mod persistence;

// Re-export commonly used types
pub use self::client::{HttpJobService, JobService, ServiceConfig, ServiceError};
pub use self::core::{DuplicateSettings, Pipeline, PipelineStep, ProjectId, StepKey, StepStatus};
pub use self::execution::{ExecutionEngine, ExecutionEvent, ProjectDashboard, RunOutcome, RunReport};
