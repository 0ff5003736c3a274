use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use talentflow::config::AppConfig;
use talentflow::error::AppError;
use talentflow::pipeline::sim::Simulation;
use talentflow::pipeline::Pipeline;
use talentflow::store::{Store, MIGRATIONS};
use talentflow::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_ops_routes;
use crate::seed::{seed, SeedProfile};

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

    let store = Arc::new(Store::open(MIGRATIONS)?);
    let summary = seed(
        &store,
        SeedProfile {
            jobs: args.seed_jobs,
            candidates: args.seed_candidates,
        },
    )
    .await?;
    info!(
        jobs = summary.jobs,
        candidates = summary.candidates,
        assessments = summary.assessments,
        users = summary.users,
        "store seeded"
    );

    let pipeline = Pipeline::new(store, Simulation::new(&config.simulation));
    let app = with_ops_routes(&pipeline)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "talentflow api ready");

    axum::serve(listener, app).await?;
    Ok(())
}
