use crate::cli::ServeArgs;
use crate::infra::{AppState, LogNotifier};
use crate::routes::with_allocation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use placements::allocation::{reconcile, AllocationService, MemoryStore};
use placements::config::AppConfig;
use placements::error::AppError;
use placements::telemetry;
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

    let store = Arc::new(MemoryStore::default());
    // Finish any delete cascade a previous run left behind.
    let repaired = reconcile(&*store)?;
    if repaired > 0 {
        info!(repaired, "repaired interrupted delete cascades at startup");
    }

    let service = Arc::new(AllocationService::new(
        store,
        Arc::new(LogNotifier),
        config.allocation.coordinator(),
    ));

    let app = with_allocation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "internship placement portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
