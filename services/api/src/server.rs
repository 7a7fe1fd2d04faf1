use crate::cli::ServeArgs;
use crate::infra::{attendance_api, attendance_backend, geofence_api, office_registry, AppState};
use crate::routes::with_attendance_routes;
use attendance_gate::config::AppConfig;
use attendance_gate::error::AppError;
use attendance_gate::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = attendance_backend(&config)?;
    let registry = office_registry(backend.clone());
    let geofence = geofence_api(&config, registry.clone());
    let attendance = attendance_api(&config, backend.clone(), registry);

    let app = with_attendance_routes(geofence, attendance)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = backend.base_url(),
        wfh_monthly_limit = config.attendance.wfh_monthly_limit,
        "attendance gate ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
