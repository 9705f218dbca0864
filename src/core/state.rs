//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Placeholder duration shown for steps whose artifact was found on the
/// server rather than produced by the current run
pub const UNKNOWN_DURATION: &str = "--:--";

/// State of a single pipeline step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum StepStatus {
    /// Step has not been started in the current run
    #[default]
    Pending,
    /// Step's remote action has been issued and not yet settled
    InProgress {
        started_at: DateTime<Utc>,
    },
    /// Step finished successfully (or its artifact already exists)
    Completed,
    /// Step's remote action failed, or its precondition was not met
    Failed {
        error: String,
    },
}

impl StepStatus {
    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepStatus::Completed | StepStatus::Failed { .. })
    }

    /// Short label used on the wire and in the terminal
    pub fn label(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress { .. } => "in-progress",
            StepStatus::Completed => "completed",
            StepStatus::Failed { .. } => "failed",
        }
    }
}

/// Overall status of one run, as recorded in history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Every planned step completed
    Completed,
    /// A step failed and the remainder was skipped
    Failed,
}

/// Format an elapsed duration as zero-padded `mm:ss`
///
/// Minutes are not wrapped into hours: a 75 minute job renders as `75:00`.
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
