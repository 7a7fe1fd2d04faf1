use crate::infra::{attendance_backend, office_registry, parse_coordinates, parse_permission};
use attendance_gate::config::AppConfig;
use attendance_gate::error::AppError;
use attendance_gate::telemetry;
use attendance_gate::workflows::attendance::{
    AttendanceBackend, CheckoutGate, EmployeeId, TodayView,
};
use attendance_gate::workflows::geofence::{
    distance_between, Coordinates, EvaluationRequest, EvaluationTrigger, GeofenceEvaluator,
    GeofenceResult, PermissionState, PositionAcquirer, ReportedCoords, ReportedFix,
    ReportedFixProvider, UnsupportedPermissions,
};
use chrono::Utc;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct GeofenceEvaluateArgs {
    /// Department whose offices are considered
    #[arg(long)]
    pub(crate) department: String,
    /// Reported position as LAT,LNG. Omit to simulate an unavailable position.
    #[arg(long, value_parser = parse_coordinates)]
    pub(crate) at: Option<Coordinates>,
    /// Reported accuracy in meters
    #[arg(long)]
    pub(crate) accuracy: Option<f64>,
    /// Permission state already known to the caller
    #[arg(long, value_parser = parse_permission)]
    pub(crate) permission: Option<PermissionState>,
    /// Treat the evaluation as an explicit user request
    #[arg(long)]
    pub(crate) user_initiated: bool,
}

#[derive(Args, Debug)]
pub(crate) struct DistanceArgs {
    /// Origin as LAT,LNG
    #[arg(long, value_parser = parse_coordinates)]
    pub(crate) from: Coordinates,
    /// Destination as LAT,LNG
    #[arg(long, value_parser = parse_coordinates)]
    pub(crate) to: Coordinates,
}

#[derive(Args, Debug)]
pub(crate) struct AttendanceTodayArgs {
    /// Employee identifier known to the backend
    #[arg(long)]
    pub(crate) employee: String,
    /// Whether the employee is currently inside their office geofence
    #[arg(long)]
    pub(crate) in_range: bool,
}

pub(crate) async fn run_geofence_evaluate(args: GeofenceEvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let GeofenceEvaluateArgs {
        department,
        at,
        accuracy,
        permission,
        user_initiated,
    } = args;

    if department.trim().is_empty() {
        return Err(AppError::InvalidInput("department is required".to_string()));
    }

    let fix = at.map(|at| ReportedFix::Fix {
        coords: ReportedCoords {
            latitude: at.latitude,
            longitude: at.longitude,
            accuracy,
        },
        timestamp: Utc::now().timestamp_millis(),
    });

    let registry = office_registry(attendance_backend(&config)?);
    let acquirer = PositionAcquirer::new(
        Arc::new(ReportedFixProvider::new(fix)),
        config.geofence.acquisition_settings(),
    );
    let evaluator = GeofenceEvaluator::new(
        registry,
        Arc::new(UnsupportedPermissions),
        Arc::new(acquirer),
    );

    let mut request = EvaluationRequest {
        department: department.clone(),
        permission: None,
        trigger: if user_initiated {
            EvaluationTrigger::UserInitiated
        } else {
            EvaluationTrigger::Passive
        },
    };
    if let Some(permission) = permission {
        request = request.with_permission(permission);
    }

    let result = evaluator.evaluate_with(request).await;
    for line in evaluation_lines(&department, &result) {
        println!("{line}");
    }
    Ok(())
}

pub(crate) fn run_distance(args: DistanceArgs) -> Result<(), AppError> {
    println!("{}", distance_line(args.from, args.to));
    Ok(())
}

pub(crate) async fn run_attendance_today(args: AttendanceTodayArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let backend = attendance_backend(&config)?;
    let employee = EmployeeId(args.employee);
    let record = backend.today_attendance(&employee).await?;
    let view = TodayView::new(record, args.in_range);

    for line in today_lines(&employee, &view) {
        println!("{line}");
    }
    Ok(())
}

fn evaluation_lines(department: &str, result: &GeofenceResult) -> Vec<String> {
    let status = result.status();
    let mut lines = vec![
        format!("Geofence evaluation for department {department}"),
        format!("- status: {}", status.label),
        format!(
            "- permission: {}",
            result
                .permission
                .map_or("not checked", |state| state.label())
        ),
    ];
    if !status.detail.is_empty() {
        lines.push(format!("- detail: {}", status.detail));
    }
    if let (Some(office), Some(meters)) = (&result.nearest_office, result.distance_meters) {
        lines.push(format!(
            "- nearest office: {} ({}) at {:.1} m, radius {:.0} m",
            office.name, office.id, meters, office.radius_meters
        ));
        lines.push(format!(
            "- in range: {}",
            if result.in_range { "yes" } else { "no" }
        ));
    }
    lines
}

fn distance_line(from: Coordinates, to: Coordinates) -> String {
    format!(
        "{:.1} m between ({}, {}) and ({}, {})",
        distance_between(from, to),
        from.latitude,
        from.longitude,
        to.latitude,
        to.longitude
    )
}

fn today_lines(employee: &EmployeeId, view: &TodayView) -> Vec<String> {
    let mut lines = vec![format!("Today's attendance for {employee}")];
    let summary = &view.summary;
    match summary.attendance_type {
        Some(kind) => lines.push(format!("- {} ({})", summary.label, kind.label())),
        None => lines.push(format!("- {}", summary.label)),
    }
    if !summary.timing.is_empty() {
        lines.push(format!("- {}", summary.timing));
    }
    let checkout = match view.checkout {
        CheckoutGate::Enabled => "available".to_string(),
        CheckoutGate::NotCheckedIn => "not checked in".to_string(),
        CheckoutGate::AlreadyCheckedOut => "already checked out".to_string(),
        CheckoutGate::Disabled { reason } => format!("disabled ({reason})"),
    };
    lines.push(format!("- check-out: {checkout}"));
    lines
}
