//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{
    DownloadCommand, HistoryCommand, PlanCommand, RunCommand, SettingsCommand, StatusCommand,
};
use std::ffi::OsString;

/// Processing-pipeline orchestrator for ERP Tools projects
#[derive(Debug, Parser, Clone)]
#[command(name = "erp-pipeline")]
#[command(author = "ERP Tools Contributors")]
#[command(version)]
#[command(about = "Run and inspect ERP Tools processing pipelines", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a YAML service configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Reference-data API base URL (overrides config and ERP_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Job service base URL (overrides config and ERP_JOB_URL)
    #[arg(long, global = true)]
    pub job_url: Option<String>,

    /// Report file base URL (overrides config and ERP_FILE_URL)
    #[arg(long, global = true)]
    pub file_url: Option<String>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List projects
    Projects,

    /// Show which steps a project's modules enable
    Plan(PlanCommand),

    /// Show a project's steps and which reports already exist
    Status(StatusCommand),

    /// Run a project's pipeline
    Run(RunCommand),

    /// Manage saved duplicate-tool settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Show run history
    History(HistoryCommand),

    /// Download a step's report
    Download(DownloadCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
