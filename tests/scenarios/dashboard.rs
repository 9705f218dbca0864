//! Test: Dashboard - project selection, report probing and run guarding

use crate::helpers::*;
use erp_pipeline::core::{ProjectId, StepKey, UNKNOWN_DURATION};
use erp_pipeline::execution::{
    ExecutionEngine, NotificationLevel, ProjectDashboard, RunOutcome, Selection,
};
use std::sync::Arc;
use std::time::Duration;

/// Reports left by earlier runs show up as completed steps
#[tokio::test]
async fn test_select_prepopulates_existing_reports() {
    let mock = service(
        MockJobService::new()
            .with_all_modules()
            .with_existing_report(StepKey::Duplicate)
            .with_existing_report(StepKey::BoxBreaking),
    );
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    let pipeline = dashboard.select_project(ProjectId(31)).await;

    assert_statuses(&pipeline, &["completed", "pending", "pending", "completed"]);
    let duplicate = pipeline.step(StepKey::Duplicate).unwrap();
    assert_eq!(duplicate.duration.as_deref(), Some(UNKNOWN_DURATION));
    assert_eq!(
        duplicate.file_url.as_deref(),
        Some("http://files.test/reports/31/DuplicateTool.xlsx")
    );
    assert_eq!(mock.count("probe:"), 4);
    assert_eq!(dashboard.pipeline(), Some(pipeline));
}

/// A failing probe counts as "no report" and leaves the others alone
#[tokio::test]
async fn test_failed_probe_is_not_fatal() {
    let mock = service(
        MockJobService::new()
            .with_all_modules()
            .with_existing_report(StepKey::Envelope)
            .with_failing_probe(StepKey::Extras),
    );
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    let pipeline = dashboard.select_project(ProjectId(31)).await;

    assert_statuses(&pipeline, &["pending", "completed", "pending", "pending"]);
}

/// Selecting the same project twice gives the same view
#[tokio::test]
async fn test_reselect_is_idempotent() {
    let mock = service(
        MockJobService::new()
            .with_module_names(&["Envelope Breaking"])
            .with_existing_report(StepKey::Envelope),
    );
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    let first = dashboard.select_project(ProjectId(4)).await;
    let second = dashboard.select_project(ProjectId(4)).await;

    assert_eq!(first, second);
    assert_eq!(second.completed_steps(), 1);
}

/// Nothing is probed for a project with no steps
#[tokio::test]
async fn test_empty_plan_skips_probes() {
    let mock = service(MockJobService::new().with_module_names(&["Audit Trail"]));
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    let pipeline = dashboard.select_project(ProjectId(4)).await;

    assert!(pipeline.steps.is_empty());
    assert_eq!(mock.count("probe:"), 0);

    let report = dashboard.run(Some(&settings())).await;
    assert_eq!(report.outcome, RunOutcome::NothingToRun);
    assert_eq!(report.notification.level, NotificationLevel::Info);
    assert!(mock.run_calls().is_empty());
}

#[tokio::test]
async fn test_selection_states() {
    let mock = service(MockJobService::new().with_module_names(&["Box Breaking"]));
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    assert_eq!(dashboard.selection(), Selection::NotSelected);
    let report = dashboard.run(None).await;
    assert_eq!(report.outcome, RunOutcome::NothingToRun);
    assert!(mock.run_calls().is_empty());

    dashboard.select_project(ProjectId(15)).await;
    match dashboard.selection() {
        Selection::Ready {
            project_id, plan, ..
        } => {
            assert_eq!(project_id, ProjectId(15));
            assert_eq!(plan.len(), 1);
        }
        other => panic!("expected a ready selection, got {:?}", other),
    }

    let report = dashboard.run(None).await;
    assert!(report.outcome.is_success());
    assert_eq!(mock.run_calls(), vec!["run:boxbreaking", "done:boxbreaking"]);
}

/// A second run for a project that is still running is refused
#[tokio::test(start_paused = true)]
async fn test_run_refused_while_processing() {
    let mock = service(
        MockJobService::new().with_delay(StepKey::Envelope, Duration::from_secs(60)),
    );
    let engine = Arc::new(ExecutionEngine::new(Arc::clone(&mock), locator()));
    let plan = plan_of(&[StepKey::Envelope]);

    let mut rx = engine.subscribe();
    let running = {
        let engine = Arc::clone(&engine);
        let plan = plan.clone();
        tokio::spawn(async move { engine.execute(ProjectId(50), &plan, None).await })
    };
    rx.wait_for(|p| p.as_ref().is_some_and(|p| p.is_processing))
        .await
        .unwrap();

    assert!(engine.is_processing(ProjectId(50)));
    let refused = engine.execute(ProjectId(50), &plan, None).await;
    assert_eq!(refused.outcome, RunOutcome::AlreadyRunning);
    assert!(refused.outcome.was_refused());

    let finished = running.await.unwrap();
    assert!(finished.outcome.is_success());
    assert_eq!(mock.count("run:envelope"), 1);
    assert!(!engine.is_processing(ProjectId(50)));
}

/// Switching to another project mid-run keeps the view on the new project
#[tokio::test(start_paused = true)]
async fn test_switching_projects_mid_run() {
    let mock = service(
        MockJobService::new()
            .with_module_names(&["Envelope Breaking"])
            .with_delay(StepKey::Envelope, Duration::from_secs(60)),
    );
    let dashboard = Arc::new(ProjectDashboard::new(Arc::clone(&mock), locator()));
    dashboard.select_project(ProjectId(1)).await;

    let mut rx = dashboard.engine().subscribe();
    let running = {
        let dashboard = Arc::clone(&dashboard);
        tokio::spawn(async move { dashboard.run(None).await })
    };
    rx.wait_for(|p| p.as_ref().is_some_and(|p| p.is_processing))
        .await
        .unwrap();

    let other = dashboard.select_project(ProjectId(2)).await;
    assert_eq!(other.project_id, ProjectId(2));
    assert!(!other.is_processing);

    let report = running.await.unwrap();
    assert!(report.outcome.is_success());

    let shown = dashboard.pipeline().unwrap();
    assert_eq!(shown.project_id, ProjectId(2));
    assert_statuses(&shown, &["pending"]);
}

/// Coming back to a project that is mid-run shows its live run, not a fresh one
#[tokio::test(start_paused = true)]
async fn test_reselecting_running_project_shows_live_run() {
    let mock = service(
        MockJobService::new()
            .with_module_names(&["Envelope Breaking", "Extras"])
            .with_delay(StepKey::Envelope, Duration::from_secs(60))
            .with_delay(StepKey::Extras, Duration::from_secs(60)),
    );
    let dashboard = Arc::new(ProjectDashboard::new(Arc::clone(&mock), locator()));
    dashboard.select_project(ProjectId(1)).await;

    let mut rx = dashboard.engine().subscribe();
    let running = {
        let dashboard = Arc::clone(&dashboard);
        tokio::spawn(async move { dashboard.run(None).await })
    };
    rx.wait_for(|p| p.as_ref().is_some_and(|p| p.is_processing))
        .await
        .unwrap();

    dashboard.select_project(ProjectId(2)).await;
    let back = dashboard.select_project(ProjectId(1)).await;

    assert_eq!(back.project_id, ProjectId(1));
    assert!(back.is_processing);
    assert_eq!(back.in_progress().map(|s| s.key), Some(StepKey::Envelope));
    assert_eq!(dashboard.pipeline(), Some(back));
    assert!(matches!(
        dashboard.selection(),
        Selection::Ready {
            project_id: ProjectId(1),
            ..
        }
    ));

    let report = running.await.unwrap();
    assert!(report.outcome.is_success());

    let shown = dashboard.pipeline().unwrap();
    assert_eq!(shown.project_id, ProjectId(1));
    assert!(!shown.is_processing);
    assert_statuses(&shown, &["completed", "completed"]);
    assert_eq!(shown, report.pipeline);
}

/// Report lookups for every step are issued together and awaited as a group
#[tokio::test(start_paused = true)]
async fn test_report_lookups_run_in_parallel() {
    let mock = service(
        MockJobService::new()
            .with_all_modules()
            .with_report_check_delay(Duration::from_secs(10))
            .with_existing_report(StepKey::Extras),
    );
    let dashboard = ProjectDashboard::new(Arc::clone(&mock), locator());

    let started = tokio::time::Instant::now();
    let pipeline = dashboard.select_project(ProjectId(31)).await;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(10));
    assert!(elapsed < Duration::from_secs(11));
    assert_eq!(mock.max_report_checks_in_flight(), 4);
    assert_statuses(&pipeline, &["pending", "pending", "completed", "pending"]);
}

/// Subscribers see the selection move through loading before it is ready
#[tokio::test(start_paused = true)]
async fn test_selection_passes_through_loading() {
    let mock = service(
        MockJobService::new()
            .with_module_names(&["Box Breaking"])
            .with_report_check_delay(Duration::from_secs(5)),
    );
    let dashboard = Arc::new(ProjectDashboard::new(Arc::clone(&mock), locator()));

    let mut rx = dashboard.subscribe_selection();
    assert!(!rx.borrow().is_loading());

    let selecting = {
        let dashboard = Arc::clone(&dashboard);
        tokio::spawn(async move { dashboard.select_project(ProjectId(15)).await })
    };
    rx.wait_for(Selection::is_loading).await.unwrap();

    assert_eq!(dashboard.selection().project_id(), Some(ProjectId(15)));
    assert!(dashboard.pipeline().is_none());

    let pipeline = selecting.await.unwrap();
    assert_eq!(pipeline.total_steps(), 1);
    assert!(!dashboard.selection().is_loading());
    assert!(matches!(
        *rx.borrow_and_update(),
        Selection::Ready { .. }
    ));
}
