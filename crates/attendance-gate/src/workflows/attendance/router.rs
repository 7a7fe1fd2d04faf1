use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::backend::AttendanceBackend;
use super::checkout::{CheckoutGate, CheckoutOutcome, TodaySummary};
use super::controller::AttendanceFlowController;
use super::domain::{AttendanceType, CaptureArtifact, Employee, EmployeeId};
use super::flow::{AttendanceFlow, FlowNotice, FlowTransition};
use crate::error::AppError;
use crate::workflows::geofence::router::reported_location;
use crate::workflows::geofence::{
    AcquisitionSettings, Coordinates, EvaluationRequest, EvaluationTrigger, GeofenceEvaluator,
    GeofenceResult, LocationStatus, OfficeChoices, OfficeId, OfficeRegistry, PermissionState,
    PermissionWatch, PositionAcquirer, ReportedFix, ReportedFixProvider,
};

/// Server-side state behind the attendance endpoints.
///
/// Each employee's flow lives here between requests; clients only send commands.
pub struct AttendanceApi {
    backend: Arc<dyn AttendanceBackend>,
    registry: Arc<OfficeRegistry>,
    settings: AcquisitionSettings,
    wfh_monthly_limit: u64,
    clock: Option<fn() -> NaiveDateTime>,
    flows: Mutex<HashMap<EmployeeId, AttendanceFlow>>,
}

impl AttendanceApi {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        registry: Arc<OfficeRegistry>,
        settings: AcquisitionSettings,
        wfh_monthly_limit: u64,
    ) -> Self {
        Self {
            backend,
            registry,
            settings,
            wfh_monthly_limit,
            clock: None,
            flows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Current flow for `employee`; a fresh one when none was started.
    pub fn flow(&self, employee: &EmployeeId) -> AttendanceFlow {
        self.flows().get(employee).cloned().unwrap_or_default()
    }

    fn store(&self, employee: EmployeeId, flow: AttendanceFlow) {
        self.flows().insert(employee, flow);
    }

    fn flows(&self) -> MutexGuard<'_, HashMap<EmployeeId, AttendanceFlow>> {
        self.flows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Controller answering from the device state this request reported.
    fn controller(&self, employee: Employee, device: &DeviceReport) -> AttendanceFlowController {
        let permission = device.permission.unwrap_or(PermissionState::Unsupported);
        let geofence = GeofenceEvaluator::new(
            self.registry.clone(),
            Arc::new(PermissionWatch::new(permission)),
            Arc::new(PositionAcquirer::new(
                Arc::new(ReportedFixProvider::new(device.fix.clone())),
                self.settings,
            )),
        );
        let controller = AttendanceFlowController::new(
            employee,
            self.backend.clone(),
            Arc::new(geofence),
            self.wfh_monthly_limit,
        );
        match self.clock {
            Some(clock) => controller.with_clock(clock),
            None => controller,
        }
    }
}

/// Location state of the employee's device, as the client captured it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceReport {
    #[serde(default)]
    pub permission: Option<PermissionState>,
    #[serde(default)]
    pub trigger: EvaluationTrigger,
    #[serde(default)]
    pub fix: Option<ReportedFix>,
}

/// Step requested on the attendance screen. Verdicts are always worked out on the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FlowCommand {
    /// Screen entry: a clean flow and a freshly fetched office list.
    Enter,
    SelectType { attendance_type: AttendanceType },
    SelectOffice { office_id: OfficeId },
    Proceed,
    Capture { photo: CaptureArtifact },
    Submit,
    Retake,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowPayload {
    pub employee: Employee,
    #[serde(default)]
    pub device: DeviceReport,
    pub command: FlowCommand,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowResponse {
    pub flow: AttendanceFlow,
    pub notice: Option<FlowNotice>,
    pub message: Option<String>,
}

impl From<FlowTransition> for FlowResponse {
    fn from(transition: FlowTransition) -> Self {
        let message = transition.notice.as_ref().map(FlowNotice::message);
        Self {
            flow: transition.flow,
            notice: transition.notice,
            message,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmployeePayload {
    pub employee: Employee,
    #[serde(default)]
    pub device: DeviceReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutGateResponse {
    pub gate: CheckoutGate,
    pub summary: TodaySummary,
    pub location: LocationStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub outcome: CheckoutOutcome,
    pub message: String,
}

pub fn attendance_router(api: Arc<AttendanceApi>) -> Router {
    Router::new()
        .route("/api/v1/attendance/flow", post(flow_handler))
        .route("/api/v1/attendance/offices", post(offices_handler))
        .route("/api/v1/attendance/checkout-gate", post(checkout_gate_handler))
        .route("/api/v1/attendance/check-out", post(check_out_handler))
        .with_state(api)
}

fn validate(employee: &Employee, device: &DeviceReport) -> Result<Option<Coordinates>, AppError> {
    if employee.id.0.trim().is_empty() {
        return Err(AppError::InvalidInput("employee id is required".to_string()));
    }
    if employee.department.trim().is_empty() {
        return Err(AppError::InvalidInput("department is required".to_string()));
    }
    reported_location(device.fix.as_ref())
}

pub(crate) async fn flow_handler(
    State(api): State<Arc<AttendanceApi>>,
    Json(payload): Json<FlowPayload>,
) -> Result<Json<FlowResponse>, AppError> {
    let FlowPayload {
        employee,
        device,
        command,
    } = payload;
    let location = validate(&employee, &device)?;
    let employee_id = employee.id.clone();
    let controller = api.controller(employee, &device);
    let flow = api.flow(&employee_id);

    let transition = match command {
        FlowCommand::Enter => {
            controller.refresh_offices().await;
            FlowTransition {
                flow: controller.enter_screen(),
                notice: None,
            }
        }
        FlowCommand::SelectType { attendance_type } => {
            controller.select_type(flow, attendance_type).await
        }
        FlowCommand::SelectOffice { office_id } => {
            controller.select_office_at(flow, &office_id, location).await
        }
        FlowCommand::Proceed => controller.proceed(flow),
        FlowCommand::Capture { photo } => controller.capture(flow, photo),
        FlowCommand::Submit => controller.submit(flow, location).await,
        FlowCommand::Retake => controller.retake(flow),
    };

    api.store(employee_id, transition.flow.clone());
    Ok(Json(transition.into()))
}

pub(crate) async fn offices_handler(
    State(api): State<Arc<AttendanceApi>>,
    Json(payload): Json<EmployeePayload>,
) -> Result<Json<OfficeChoices>, AppError> {
    validate(&payload.employee, &payload.device)?;
    let controller = api.controller(payload.employee, &payload.device);
    Ok(Json(controller.office_choices().await))
}

async fn locate(controller: &AttendanceFlowController, device: &DeviceReport) -> GeofenceResult {
    let mut request = EvaluationRequest {
        department: controller.employee().department.clone(),
        permission: None,
        trigger: device.trigger,
    };
    if let Some(permission) = device.permission {
        request = request.with_permission(permission);
    }
    controller.geofence(request).await
}

pub(crate) async fn checkout_gate_handler(
    State(api): State<Arc<AttendanceApi>>,
    Json(payload): Json<EmployeePayload>,
) -> Result<Json<CheckoutGateResponse>, AppError> {
    validate(&payload.employee, &payload.device)?;
    let controller = api.controller(payload.employee, &payload.device);
    let geofence = locate(&controller, &payload.device).await;
    let view = controller.today(geofence.in_range).await;

    Ok(Json(CheckoutGateResponse {
        gate: view.checkout,
        summary: view.summary,
        location: geofence.status(),
    }))
}

pub(crate) async fn check_out_handler(
    State(api): State<Arc<AttendanceApi>>,
    Json(payload): Json<EmployeePayload>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let location = validate(&payload.employee, &payload.device)?;
    let controller = api.controller(payload.employee, &payload.device);
    let geofence = locate(&controller, &payload.device).await;
    let outcome = controller.check_out(geofence.in_range, location).await;
    info!(
        employee = %controller.employee().id,
        in_range = geofence.in_range,
        ?outcome,
        "check-out requested over http"
    );

    let message = outcome.message();
    Ok(Json(CheckoutResponse { outcome, message }))
}
