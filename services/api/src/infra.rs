use attendance_gate::config::AppConfig;
use attendance_gate::error::AppError;
use attendance_gate::workflows::attendance::{AttendanceApi, HttpAttendanceApi};
use attendance_gate::workflows::geofence::{
    Coordinates, GeofenceApi, OfficeRegistry, PermissionState,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Backend client for the configured attendance API.
pub(crate) fn attendance_backend(config: &AppConfig) -> Result<Arc<HttpAttendanceApi>, AppError> {
    Ok(Arc::new(HttpAttendanceApi::new(&config.backend.base_url)?))
}

/// Office registry shared by every geofence request of this process.
pub(crate) fn office_registry(backend: Arc<HttpAttendanceApi>) -> Arc<OfficeRegistry> {
    Arc::new(OfficeRegistry::new(backend))
}

pub(crate) fn geofence_api(config: &AppConfig, registry: Arc<OfficeRegistry>) -> Arc<GeofenceApi> {
    Arc::new(GeofenceApi::new(
        registry,
        config.geofence.acquisition_settings(),
    ))
}

/// Attendance endpoints keeping each employee's flow for the life of the process.
pub(crate) fn attendance_api(
    config: &AppConfig,
    backend: Arc<HttpAttendanceApi>,
    registry: Arc<OfficeRegistry>,
) -> Arc<AttendanceApi> {
    Arc::new(AttendanceApi::new(
        backend,
        registry,
        config.geofence.acquisition_settings(),
        config.attendance.wfh_monthly_limit,
    ))
}

/// Parse `LAT,LNG` into coordinates within the valid ranges.
pub(crate) fn parse_coordinates(raw: &str) -> Result<Coordinates, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG but got '{raw}'"))?;
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid latitude '{lat}' ({err}); expected LAT,LNG"))?;
    let longitude = lng
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid longitude '{lng}' ({err}); expected LAT,LNG"))?;

    let coordinates = Coordinates::new(latitude, longitude);
    if !coordinates.is_valid() {
        return Err(format!("'{raw}' is outside the valid latitude/longitude range"));
    }
    Ok(coordinates)
}

pub(crate) fn parse_permission(raw: &str) -> Result<PermissionState, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "granted" | "denied" | "prompt" | "unsupported" => Ok(PermissionState::from_host(raw)),
        other => Err(format!(
            "unknown permission '{other}'; expected granted, denied, prompt or unsupported"
        )),
    }
}
