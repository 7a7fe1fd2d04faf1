use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{Coordinates, GeofenceResult, PermissionState};
use super::evaluator::{EvaluationRequest, EvaluationTrigger, GeofenceEvaluator};
use super::permission::UnsupportedPermissions;
use super::position::{AcquisitionSettings, PositionAcquirer, ReportedFix, ReportedFixProvider};
use super::registry::OfficeRegistry;
use super::status::LocationStatus;
use crate::error::AppError;

/// Shared state behind the geofence endpoints.
pub struct GeofenceApi {
    registry: Arc<OfficeRegistry>,
    settings: AcquisitionSettings,
}

impl GeofenceApi {
    pub fn new(registry: Arc<OfficeRegistry>, settings: AcquisitionSettings) -> Self {
        Self { registry, settings }
    }
}

/// Evaluation request from a client that already holds the device's reply.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatePayload {
    pub department: String,
    #[serde(default)]
    pub permission: Option<PermissionState>,
    #[serde(default)]
    pub trigger: EvaluationTrigger,
    #[serde(default)]
    pub fix: Option<ReportedFix>,
    /// The attendance screen was just opened; offices are refetched before evaluating.
    #[serde(default)]
    pub screen_entry: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateResponse {
    pub result: GeofenceResult,
    pub status: LocationStatus,
}

pub fn geofence_router(api: Arc<GeofenceApi>) -> Router {
    Router::new()
        .route("/api/v1/geofence/evaluate", post(evaluate_handler))
        .with_state(api)
}

pub(crate) async fn evaluate_handler(
    State(api): State<Arc<GeofenceApi>>,
    Json(payload): Json<EvaluatePayload>,
) -> Result<Json<EvaluateResponse>, AppError> {
    if payload.department.trim().is_empty() {
        return Err(AppError::InvalidInput("department is required".to_string()));
    }
    reported_location(payload.fix.as_ref())?;

    if payload.screen_entry {
        api.registry.refresh(&payload.department).await;
    }

    let acquirer = PositionAcquirer::new(
        Arc::new(ReportedFixProvider::new(payload.fix)),
        api.settings,
    );
    let evaluator = GeofenceEvaluator::new(
        api.registry.clone(),
        Arc::new(UnsupportedPermissions),
        Arc::new(acquirer),
    );

    let mut request = EvaluationRequest {
        department: payload.department,
        permission: None,
        trigger: payload.trigger,
    };
    if let Some(permission) = payload.permission {
        request = request.with_permission(permission);
    }

    let result = evaluator.evaluate_with(request).await;
    let status = result.status();
    info!(
        label = status.label,
        in_range = result.in_range,
        "geofence evaluated over http"
    );
    Ok(Json(EvaluateResponse { result, status }))
}

/// Coordinates of a reported fix, rejecting values outside the valid ranges.
pub(crate) fn reported_location(fix: Option<&ReportedFix>) -> Result<Option<Coordinates>, AppError> {
    let Some(position) = fix.and_then(ReportedFix::position) else {
        return Ok(None);
    };
    let at = Coordinates::new(position.latitude, position.longitude);
    if !at.is_valid() {
        return Err(AppError::InvalidInput(format!(
            "coordinates ({}, {}) are outside the valid latitude/longitude range",
            position.latitude, position.longitude
        )));
    }
    Ok(Some(at))
}
