//! Pipeline orchestration: resolve modules, plan steps, run them, and
//! probe for reports from earlier runs

pub mod dashboard;
pub mod engine;
pub mod executor;
pub mod planner;
pub mod prober;
pub mod resolver;

pub use dashboard::{ProjectDashboard, Selection};
pub use engine::{
    EventHandler, ExecutionEngine, ExecutionEvent, Notification, NotificationLevel, RunOutcome,
    RunReport,
};
pub use executor::{StepExecutor, StepOutcome};
pub use planner::plan_steps;
pub use prober::{ReportAvailability, ReportProber};
pub use resolver::{EnabledModules, ModuleResolver, Resolution};
