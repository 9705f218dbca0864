//! CLI output formatting

use crate::{
    core::{Pipeline, PipelineStep, RunStatus, StepStatus},
    execution::{EnabledModules, ExecutionEvent, Notification, NotificationLevel, Resolution},
    persistence::RunSummary,
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static PENDING: Emoji<'_, '_> = Emoji("⏸️  ", "- ");

/// Create a progress bar measured in percent
pub fn create_progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a step status for display
pub fn format_step_status(status: &StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::InProgress { .. } => style("IN PROGRESS").yellow().to_string(),
        StepStatus::Completed => style("COMPLETED").green().to_string(),
        StepStatus::Failed { .. } => style("FAILED").red().to_string(),
    }
}

fn status_icon(status: &StepStatus) -> Emoji<'static, 'static> {
    match status {
        StepStatus::Pending => PENDING,
        StepStatus::InProgress { .. } => SPINNER,
        StepStatus::Completed => CHECK,
        StepStatus::Failed { .. } => CROSS,
    }
}

/// One line of the step list
pub fn format_step(index: usize, step: &PipelineStep) -> String {
    let mut line = format!(
        "{}{}. {:<22} {}",
        status_icon(&step.status),
        index + 1,
        step.title,
        format_step_status(&step.status)
    );

    if let Some(duration) = &step.duration {
        line.push_str(&format!(" {}", style(duration).dim()));
    }
    if let StepStatus::Failed { error } = &step.status {
        line.push_str(&format!("\n      {}", style(error).red()));
    }
    if let Some(url) = &step.file_url {
        line.push_str(&format!("\n      {} {}", style("download:").dim(), style(url).cyan()));
    }
    line
}

/// Step list with overall progress
pub fn format_pipeline(pipeline: &Pipeline) -> String {
    if pipeline.steps.is_empty() {
        return format!(
            "{} Project {} has no enabled modules to process",
            INFO, pipeline.project_id
        );
    }

    let mut out = format!(
        "{} Project {} - {} ({}/{})",
        INFO,
        style(pipeline.project_id).bold(),
        style(format!("{:.0}%", pipeline.percent_complete())).cyan(),
        pipeline.completed_steps(),
        pipeline.total_steps()
    );
    if let Some(step) = pipeline.in_progress() {
        out.push_str(&format!(" - running {}", style(step.key.title()).yellow()));
    }
    for (index, step) in pipeline.steps.iter().enumerate() {
        out.push('\n');
        out.push_str("  ");
        out.push_str(&format_step(index, step));
    }
    out
}

/// Describe how the module list was obtained
pub fn format_modules(modules: &EnabledModules) -> String {
    let names: Vec<&str> = modules.names.iter().map(|n| n.as_str()).collect();
    match &modules.resolution {
        Resolution::Configured if names.is_empty() => {
            format!("{} No modules enabled", INFO)
        }
        Resolution::Configured => format!("{} Enabled modules: {}", INFO, names.join(", ")),
        Resolution::NotConfigured => {
            format!("{} Project has no saved configuration", WARN)
        }
        Resolution::Degraded { reason } => format!(
            "{} Could not load project configuration: {}",
            WARN,
            style(reason).dim()
        ),
    }
}

pub fn format_notification(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Info => format!("{} {}", INFO, notification.message),
        NotificationLevel::Success => {
            format!("{} {}", CHECK, style(&notification.message).green())
        }
        NotificationLevel::Error => format!("{} {}", CROSS, style(&notification.message).red()),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    match event {
        ExecutionEvent::RunStarted {
            project_id,
            total_steps,
        } => Some(format!(
            "{} Starting {} steps for project {}",
            ROCKET,
            total_steps,
            style(project_id).bold()
        )),
        ExecutionEvent::StepStarted {
            key,
            index,
            total_steps,
            ..
        } => Some(format!(
            "{} [{}/{}] {}",
            SPINNER,
            index + 1,
            total_steps,
            style(key.title()).cyan()
        )),
        ExecutionEvent::StepCompleted {
            key,
            duration,
            message,
            ..
        } => {
            let mut line = format!("{} {} {}", CHECK, style(key.title()).green(), style(duration).dim());
            if !message.is_empty() {
                line.push_str(&format!(" - {}", message));
            }
            Some(line)
        }
        ExecutionEvent::StepFailed { key, error, .. } => Some(format!(
            "{} {}: {}",
            CROSS,
            style(key.title()).red(),
            style(error).dim()
        )),
        ExecutionEvent::RunFinished { .. } => None,
        ExecutionEvent::Notified(notification) => Some(format_notification(notification)),
    }
}

/// Format run summary for display
pub fn format_run_summary(summary: &RunSummary) -> String {
    let (icon, status) = match summary.status {
        RunStatus::Completed => (CHECK, style("COMPLETED").green().to_string()),
        RunStatus::Failed => (CROSS, style("FAILED").red().to_string()),
    };

    let mut line = format!(
        "{}{} - project {} - {} ({}/{}) - {} - {}",
        icon,
        style(&summary.run_id.to_string()[..8]).dim(),
        style(summary.project_id).bold(),
        status,
        summary.completed_steps,
        summary.total_steps,
        style(format!("{:.0}%", summary.progress)).cyan(),
        style(summary.started_at.format("%Y-%m-%d %H:%M")).dim()
    );
    if let Some(step) = summary.failed_step {
        line.push_str(&format!(" - stopped at {}", style(step).red()));
    }
    line
}
