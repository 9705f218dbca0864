//! CLI command definitions

use crate::core::{ProjectId, StepKey};
use clap::{Args, Subcommand};

/// Show the planned steps of a project
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    /// Project ID
    #[arg(short, long)]
    pub project: ProjectId,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Show a project's steps with report availability
#[derive(Debug, Args, Clone)]
pub struct StatusCommand {
    /// Project ID
    #[arg(short, long)]
    pub project: ProjectId,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run a project's pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Project ID
    #[arg(short, long)]
    pub project: ProjectId,

    /// Duplicate-tool settings YAML to use instead of the saved ones
    #[arg(long)]
    pub settings: Option<String>,

    /// Don't save the run to history
    #[arg(long)]
    pub no_history: bool,
}

/// Manage saved duplicate-tool settings
#[derive(Debug, Subcommand, Clone)]
pub enum SettingsCommand {
    /// Save settings from a YAML file
    Set {
        /// Path to settings YAML
        #[arg(short, long)]
        file: String,
    },
    /// Print the saved settings
    Show,
    /// Forget the saved settings
    Clear,
}

/// Show run history
#[derive(Debug, Args, Clone)]
pub struct HistoryCommand {
    /// Project ID to filter by
    #[arg(short, long)]
    pub project: Option<ProjectId>,

    /// Number of recent runs to show
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Show a single run by ID
    #[arg(long)]
    pub run_id: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Download a step's report
#[derive(Debug, Args, Clone)]
pub struct DownloadCommand {
    /// Project ID
    #[arg(short, long)]
    pub project: ProjectId,

    /// Step key: duplicate, envelope, extras, boxbreaking
    #[arg(short, long)]
    pub step: StepKey,

    /// Output file (defaults to the report's file name)
    #[arg(short, long)]
    pub output: Option<String>,
}
