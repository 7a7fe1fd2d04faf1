use super::common::*;
use std::sync::Arc;

use crate::workflows::geofence::{
    EvaluationRequest, GeofenceErrorKind, PermissionState, PermissionWatch,
};

#[tokio::test]
async fn no_offices_short_circuits_before_location_work() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(MemoryDirectory::with(Vec::new()), granted(), provider.clone());

    let result = evaluator.evaluate("IT").await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::NoOfficesConfigured));
    assert!(!result.in_range);
    assert!(result.nearest_office.is_none());
    assert_eq!(result.permission, None);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn no_offices_reports_only_a_permission_the_caller_supplied() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(MemoryDirectory::with(Vec::new()), granted(), provider.clone());

    let result = evaluator
        .evaluate_with(EvaluationRequest::passive("IT").with_permission(PermissionState::Denied))
        .await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::NoOfficesConfigured));
    assert_eq!(result.permission, Some(PermissionState::Denied));
    assert_eq!(result.status().label, "No offices");
}

#[tokio::test]
async fn office_fetch_failure_reads_as_no_offices() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(MemoryDirectory::failing(), granted(), provider.clone());

    let result = evaluator.evaluate("IT").await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::NoOfficesConfigured));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn denied_permission_never_acquires() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(FixedPermission(PermissionState::Denied)),
        provider.clone(),
    );

    let result = evaluator.evaluate("IT").await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::PermissionDenied));
    assert_eq!(result.permission, Some(PermissionState::Denied));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn position_on_office_is_in_range_at_zero_meters() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        granted(),
        provider.clone(),
    );

    let result = evaluator.evaluate("IT").await;

    assert!(result.is_located());
    assert!(result.in_range);
    assert_eq!(result.distance_meters, Some(0.0));
    assert_eq!(result.permission, Some(PermissionState::Granted));
    assert_eq!(provider.seen()[0].maximum_age_ms, 60_000);
}

#[tokio::test]
async fn nearest_active_department_office_is_chosen() {
    let mut closed = office("CLOSED", 0.0, 0.0, 500.0);
    closed.active = false;
    let mut finance = office("FIN", 0.0, 0.0005, 500.0);
    finance.department = Some("Finance".to_string());

    let evaluator = evaluator(
        MemoryDirectory::with(vec![
            closed,
            finance,
            office("FAR", 0.0, 0.01, 100.0),
            office("NEAR", 0.0, 0.001, 100.0),
        ]),
        granted(),
        QueuedProvider::fix(position(0.0, 0.0)),
    );

    let result = evaluator.evaluate("IT").await;

    let nearest = result.nearest_office.as_ref().expect("office resolved");
    assert_eq!(nearest.id.0, "NEAR");
    let meters = result.distance_meters.expect("distance present");
    assert!((meters - 111.19).abs() < 0.1, "got {meters}");
    assert!(!result.in_range);
}

#[tokio::test]
async fn equidistant_offices_resolve_to_first_listed() {
    let evaluator = evaluator(
        MemoryDirectory::with(vec![
            office("FIRST", 0.0, 0.001, 50.0),
            office("SECOND", 0.0, -0.001, 50.0),
        ]),
        granted(),
        QueuedProvider::fix(position(0.0, 0.0)),
    );

    let result = evaluator.evaluate("IT").await;

    assert_eq!(
        result.nearest_office.map(|office| office.id.0),
        Some("FIRST".to_string())
    );
}

#[tokio::test]
async fn passive_load_with_prompt_waits_for_user() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(FixedPermission(PermissionState::Prompt)),
        provider.clone(),
    );

    let result = evaluator.evaluate("IT").await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::PermissionRequired));
    assert_eq!(result.permission, Some(PermissionState::Prompt));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn user_initiated_retry_acquires_fresh_fix_and_reports_granted() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(FixedPermission(PermissionState::Prompt)),
        provider.clone(),
    );

    let result = evaluator
        .evaluate_with(EvaluationRequest::user_initiated("IT"))
        .await;

    assert!(result.in_range);
    assert_eq!(result.permission, Some(PermissionState::Granted));
    assert_eq!(provider.seen()[0].maximum_age_ms, 0);
}

#[tokio::test]
async fn unsupported_host_stays_unsupported_after_explicit_fix() {
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(crate::workflows::geofence::UnsupportedPermissions),
        QueuedProvider::fix(position(0.0, 0.0)),
    );

    let passive = evaluator.evaluate("IT").await;
    assert_eq!(passive.error_kind, Some(GeofenceErrorKind::PermissionRequired));

    let explicit = evaluator
        .evaluate_with(EvaluationRequest::user_initiated("IT"))
        .await;
    assert!(explicit.in_range);
    assert_eq!(explicit.permission, Some(PermissionState::Unsupported));
}

#[tokio::test]
async fn declined_prompt_reports_denied() {
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(FixedPermission(PermissionState::Prompt)),
        QueuedProvider::new(vec![Reply::Code(1)]),
    );

    let result = evaluator
        .evaluate_with(EvaluationRequest::user_initiated("IT"))
        .await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::PermissionDenied));
    assert_eq!(result.permission, Some(PermissionState::Denied));
}

#[tokio::test]
async fn provider_failures_map_to_error_kinds() {
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        granted(),
        QueuedProvider::new(vec![Reply::Code(2), Reply::Code(3), Reply::Code(9)]),
    );

    let unavailable = evaluator.evaluate("IT").await;
    assert_eq!(
        unavailable.error_kind,
        Some(GeofenceErrorKind::PositionUnavailable)
    );
    assert_eq!(unavailable.permission, Some(PermissionState::Granted));

    let timeout = evaluator.evaluate("IT").await;
    assert_eq!(timeout.error_kind, Some(GeofenceErrorKind::Timeout));

    let unknown = evaluator.evaluate("IT").await;
    assert_eq!(unknown.error_kind, Some(GeofenceErrorKind::Unknown));
}

#[tokio::test(start_paused = true)]
async fn silent_provider_times_out_through_guard() {
    let provider = QueuedProvider::new(Vec::new());
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        granted(),
        provider.clone(),
    );

    let result = evaluator.evaluate("IT").await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::Timeout));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn threaded_permission_takes_precedence_over_probe() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        granted(),
        provider.clone(),
    );

    let result = evaluator
        .evaluate_with(EvaluationRequest::passive("IT").with_permission(PermissionState::Denied))
        .await;

    assert_eq!(result.error_kind, Some(GeofenceErrorKind::PermissionDenied));
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn office_list_is_cached_across_evaluations() {
    let directory = MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]);
    let evaluator = evaluator(
        directory.clone(),
        Arc::new(PermissionWatch::new(PermissionState::Denied)),
        QueuedProvider::new(Vec::new()),
    );

    evaluator.evaluate("IT").await;
    evaluator.evaluate("IT").await;

    assert_eq!(directory.calls(), 1);
}

#[tokio::test]
async fn office_choices_refetch_and_annotate_distances() {
    let directory = MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]);
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(directory.clone(), granted(), provider.clone());

    evaluator.evaluate("IT").await;
    directory.replace(vec![
        office("HQ", 0.0, 0.0, 100.0),
        office("ANNEX", 0.0, 0.01, 100.0),
    ]);

    let choices = evaluator.office_choices("IT").await;

    assert_eq!(directory.calls(), 2);
    // the opportunistic read reuses the fix from the evaluation
    assert_eq!(provider.calls(), 1);
    assert!(choices.located);
    let labels: Vec<_> = choices
        .offices
        .iter()
        .map(|choice| choice.range_label())
        .collect();
    assert_eq!(labels, vec!["In Range (0m)", "Out of Range (1112m)"]);
}

#[tokio::test]
async fn office_choices_without_permission_list_unmeasured_offices() {
    let provider = QueuedProvider::fix(position(0.0, 0.0));
    let evaluator = evaluator(
        MemoryDirectory::with(vec![office("HQ", 0.0, 0.0, 100.0)]),
        Arc::new(FixedPermission(PermissionState::Prompt)),
        provider.clone(),
    );

    let choices = evaluator.office_choices("IT").await;

    assert!(!choices.located);
    assert_eq!(choices.permission, PermissionState::Prompt);
    assert_eq!(choices.offices[0].range_label(), "Location check unavailable");
    assert_eq!(provider.calls(), 0);
}
