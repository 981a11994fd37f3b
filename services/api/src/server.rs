use crate::cli::ServeArgs;
use crate::infra::{build_service, AppState};
use crate::routes::with_matching_routes;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::telemetry;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(catalog) = args.catalog.take() {
        config.matching.catalog_path = Some(catalog);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let matching_service = Arc::new(build_service(&config)?);

    let app = with_matching_routes(matching_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "trial matching service ready");

    serve_until(listener, app, readiness_flag, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then drain open connections.
pub(crate) async fn serve_until<F>(
    listener: tokio::net::TcpListener,
    app: Router,
    readiness: Arc<AtomicBool>,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let drain_readiness = readiness.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            drain_readiness.store(false, Ordering::Release);
            info!("shutdown requested, draining connections");
        })
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
