use anyhow::{bail, Context, Result};
use erp_pipeline::cli::commands::{
    DownloadCommand, HistoryCommand, PlanCommand, RunCommand, SettingsCommand, StatusCommand,
};
use erp_pipeline::cli::output::*;
use erp_pipeline::cli::{Cli, Command};
use erp_pipeline::client::{HttpJobService, JobService, ServiceConfig};
use erp_pipeline::core::{ArtifactLocator, DuplicateSettings, DUPLICATE_SETTINGS_KEY};
use erp_pipeline::execution::{ExecutionEngine, ExecutionEvent, ProjectDashboard, Selection};
use erp_pipeline::persistence::{
    create_summary, load_duplicate_settings, save_duplicate_settings, saved_duplicate_settings,
    InMemoryPersistence, PersistenceBackend, RunSummary,
};
use std::sync::Arc;
use tracing::{error, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let config = service_config(&cli)?;

    match &cli.command {
        Command::Projects => list_projects(&config).await?,
        Command::Plan(cmd) => show_plan(cmd, &config).await?,
        Command::Status(cmd) => show_status(cmd, &config).await?,
        Command::Run(cmd) => run_pipeline(cmd, &config).await?,
        Command::Settings(cmd) => manage_settings(cmd).await?,
        Command::History(cmd) => show_history(cmd).await?,
        Command::Download(cmd) => download_report(cmd, &config).await?,
    }

    Ok(())
}

/// Defaults, then the config file, then `ERP_*` variables, then flags
fn service_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::from_file(path)?,
        None => ServiceConfig::default(),
    }
    .with_env_overrides();

    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url.as_str());
    }
    if let Some(url) = &cli.job_url {
        config = config.with_job_base_url(url.as_str());
    }
    if let Some(url) = &cli.file_url {
        config = config.with_file_base_url(url.as_str());
    }
    Ok(config)
}

fn job_service(config: &ServiceConfig) -> Result<Arc<HttpJobService>> {
    let service = HttpJobService::new(config.clone()).context("Failed to create job client")?;
    Ok(Arc::new(service))
}

#[cfg(feature = "sqlite")]
async fn open_store() -> Result<Arc<dyn PersistenceBackend>> {
    let store = erp_pipeline::persistence::SqliteStore::with_default_path().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "sqlite"))]
async fn open_store() -> Result<Arc<dyn PersistenceBackend>> {
    warn!("Built without sqlite; settings and history last for this process only");
    Ok(Arc::new(InMemoryPersistence::new()))
}

async fn list_projects(config: &ServiceConfig) -> Result<()> {
    let service = job_service(config)?;
    let projects = match service.list_projects().await {
        Ok(projects) => projects,
        Err(e) => {
            warn!("Failed to load projects: {}", e);
            Vec::new()
        }
    };

    if projects.is_empty() {
        println!("{} No projects found", INFO);
        return Ok(());
    }

    println!("{} Projects:", INFO);
    for project in &projects {
        println!(
            "  {} {}",
            style(project.project_id).cyan(),
            style(&project.name).bold()
        );
    }
    Ok(())
}

async fn show_plan(cmd: &PlanCommand, config: &ServiceConfig) -> Result<()> {
    let service = job_service(config)?;
    let dashboard = ProjectDashboard::new(service, ArtifactLocator::new(&config.file_base_url));
    dashboard.select_project(cmd.project).await;

    let Selection::Ready { modules, plan, .. } = dashboard.selection() else {
        bail!("Project {} did not finish loading", cmd.project);
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!("{}", format_modules(&modules));
    if plan.is_empty() {
        println!("{} No steps to run for project {}", INFO, cmd.project);
    }
    for (index, step) in plan.iter().enumerate() {
        println!(
            "  {}. {} {}",
            index + 1,
            style(step.title).bold(),
            style(format!("({})", step.key)).dim()
        );
    }
    Ok(())
}

async fn show_status(cmd: &StatusCommand, config: &ServiceConfig) -> Result<()> {
    let service = job_service(config)?;
    let dashboard = ProjectDashboard::new(service, ArtifactLocator::new(&config.file_base_url));
    let pipeline = dashboard.select_project(cmd.project).await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&pipeline)?);
        return Ok(());
    }

    if let Selection::Ready { modules, .. } = dashboard.selection() {
        if modules.is_degraded() {
            println!("{}", format_modules(&modules));
        }
    }
    println!("{}", format_pipeline(&pipeline));
    Ok(())
}

async fn run_pipeline(cmd: &RunCommand, config: &ServiceConfig) -> Result<()> {
    let store: Arc<dyn PersistenceBackend> = if cmd.no_history && cmd.settings.is_some() {
        Arc::new(InMemoryPersistence::new())
    } else {
        open_store().await?
    };

    let duplicate = match &cmd.settings {
        Some(path) => Some(
            DuplicateSettings::from_file(path).context("Failed to load duplicate settings")?,
        ),
        None => saved_duplicate_settings(store.as_ref()).await,
    };

    let service = job_service(config)?;
    let locator = ArtifactLocator::new(&config.file_base_url);
    let engine = Arc::new(ExecutionEngine::new(Arc::clone(&service), locator.clone()));

    let progress = create_progress_bar();
    let bar = progress.clone();
    engine
        .add_event_handler(move |event| {
            match &event {
                ExecutionEvent::StepStarted {
                    key,
                    index,
                    total_steps,
                    ..
                } => {
                    let total = (*total_steps).max(1);
                    bar.set_position((index * 100 / total) as u64);
                    bar.set_message(key.title());
                }
                ExecutionEvent::RunFinished {
                    percent_complete, ..
                } => bar.set_position(percent_complete.round() as u64),
                _ => {}
            }
            if let Some(line) = format_execution_event(&event) {
                bar.println(line);
            }
        })
        .await;

    let dashboard = ProjectDashboard::with_engine(service, locator, engine);
    let started_at = chrono::Utc::now();
    dashboard.select_project(cmd.project).await;
    let report = dashboard.run(duplicate.as_ref()).await;
    progress.finish_and_clear();

    println!("{}", format_pipeline(&report.pipeline));

    if !cmd.no_history && !report.outcome.was_refused() {
        let summary = create_summary(uuid::Uuid::new_v4(), started_at, &report);
        store.save_run(&summary).await?;
        println!(
            "\n{} Run saved to history (ID: {})",
            INFO,
            style(&summary.run_id.to_string()[..8]).dim()
        );
    }

    if report.outcome.is_success() || report.outcome.was_refused() {
        Ok(())
    } else {
        error!("{}", report.notification.message);
        std::process::exit(1);
    }
}

async fn manage_settings(cmd: &SettingsCommand) -> Result<()> {
    let store = open_store().await?;

    match cmd {
        SettingsCommand::Set { file } => {
            let settings =
                DuplicateSettings::from_file(file).context("Failed to load duplicate settings")?;
            save_duplicate_settings(store.as_ref(), &settings).await?;
            println!(
                "{} Saved duplicate settings ({} merge fields)",
                CHECK,
                style(settings.merge_fields.len()).cyan()
            );
        }
        SettingsCommand::Show => match load_duplicate_settings(store.as_ref()).await? {
            Some(settings) => println!("{}", serde_yaml::to_string(&settings)?),
            None => println!("{} Duplicate settings have not been saved", WARN),
        },
        SettingsCommand::Clear => {
            if store.delete_setting(DUPLICATE_SETTINGS_KEY).await? {
                println!("{} Duplicate settings cleared", CHECK);
            } else {
                println!("{} No saved duplicate settings", INFO);
            }
        }
    }
    Ok(())
}

async fn show_history(cmd: &HistoryCommand) -> Result<()> {
    let store = open_store().await?;

    if let Some(run_id) = &cmd.run_id {
        let run_id = uuid::Uuid::parse_str(run_id).context("Invalid run ID format")?;
        match store.load_run(run_id).await? {
            Some(summary) => print_run_details(&summary, cmd.json)?,
            None => println!("{} Run not found", WARN),
        }
        return Ok(());
    }

    let runs = store.list_runs(cmd.project, cmd.limit).await?;
    if runs.is_empty() {
        println!("{} No runs found", INFO);
        return Ok(());
    }

    if cmd.json {
        let data = serde_json::json!({ "runs": runs });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Run history (showing latest {}):", INFO, cmd.limit);
    for summary in &runs {
        println!("  {}", format_run_summary(summary));
    }
    Ok(())
}

fn print_run_details(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("{} Run Details", INFO);
    println!("  ID: {}", style(summary.run_id).cyan());
    println!("  Project: {}", style(summary.project_id).bold());
    println!("  Status: {:?}", summary.status);
    println!("  Started: {}", style(summary.started_at.to_rfc3339()).dim());
    if let Some(completed) = summary.completed_at {
        println!("  Completed: {}", style(completed.to_rfc3339()).dim());
        if let Ok(elapsed) = completed.signed_duration_since(summary.started_at).to_std() {
            println!(
                "  Duration: {}",
                style(erp_pipeline::core::format_duration(elapsed)).dim()
            );
        }
    }
    println!(
        "  Progress: {} ({}/{})",
        style(format!("{:.0}%", summary.progress)).cyan(),
        summary.completed_steps,
        summary.total_steps
    );
    if let (Some(step), Some(error)) = (summary.failed_step, &summary.error) {
        println!("  Failed at: {} - {}", style(step.title()).red(), error);
    }
    Ok(())
}

async fn download_report(cmd: &DownloadCommand, config: &ServiceConfig) -> Result<()> {
    let service = job_service(config)?;
    let url = ArtifactLocator::new(&config.file_base_url).url_for(cmd.project, cmd.step);

    let bytes = service
        .download_artifact(&url)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))
        .with_context(|| format!("Failed to download {}", url))?;

    let output = cmd
        .output
        .clone()
        .unwrap_or_else(|| cmd.step.artifact_file_name().to_string());
    tokio::fs::write(&output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", output))?;

    println!(
        "{} Saved {} ({} bytes)",
        CHECK,
        style(&output).bold(),
        style(bytes.len()).cyan()
    );
    Ok(())
}
