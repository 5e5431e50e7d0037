use crate::cli::ServeArgs;
use crate::infra::{demo_store, AppState};
use crate::routes::with_dashboard_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scorecard::config::{AirtableConfig, AppConfig};
use scorecard::error::AppError;
use scorecard::{AirtableClient, RetryPolicy, ScorecardService, TableNames};
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

    scorecard::telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = if args.offline {
        info!("serving seeded in-memory base, record store access disabled");
        let service = Arc::new(ScorecardService::new(
            Arc::new(demo_store()),
            TableNames::default(),
            RetryPolicy::none(),
        ));
        with_dashboard_routes(service)
    } else {
        // Credentials are validated here so a bad key fails the boot
        // instead of surfacing as a 401 on the first dashboard load.
        let airtable = AirtableConfig::from_env()?;
        let client = Arc::new(AirtableClient::new(&airtable));
        let service = Arc::new(ScorecardService::new(
            client,
            TableNames::default(),
            RetryPolicy::default(),
        ));
        with_dashboard_routes(service)
    };

    let app = app
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scorecard service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
