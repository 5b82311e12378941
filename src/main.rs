use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use triage_core::{CoreConfig, FileRecordStore, LogNotificationSink, TriageService};

/// Main entry point for the triage server
///
/// Resolves configuration from the environment once, builds the triage service and serves the
/// REST API (with Swagger UI) until interrupted.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_DATA_DIR`: Directory for stored assessments (default: "triage_data")
/// - `TRIAGE_RULES_FILE`: Optional YAML rule table replacing the built-in one
/// - `TRIAGE_CLASSIFIER`: `keyword` to enable the classifier, unset to disable it
/// - `TRIAGE_CLASSIFIER_TIMEOUT_MS`: Classifier deadline in milliseconds (default: 2000)
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or rule table is invalid,
/// - the data directory cannot be created, or
/// - the server address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage_run=info".parse()?)
                .add_directive("triage_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = CoreConfig::from_env_values(
        std::env::var("TRIAGE_DATA_DIR").ok(),
        std::env::var("TRIAGE_RULES_FILE").ok(),
        std::env::var("TRIAGE_CLASSIFIER").ok(),
        std::env::var("TRIAGE_CLASSIFIER_TIMEOUT_MS").ok(),
    )?;
    let rest_addr = std::env::var("TRIAGE_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let assessor = cfg.build_assessor()?;
    tracing::info!(
        conditions = assessor.rules().conditions().len(),
        classifier = ?cfg.classifier(),
        data_dir = %cfg.data_dir().display(),
        "++ Triage configuration loaded"
    );

    let records = Arc::new(FileRecordStore::new(cfg.data_dir())?);
    let triage = TriageService::new(assessor, records, Arc::new(LogNotificationSink));
    let app = router(AppState::new(triage));

    tracing::info!("++ Starting triage REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down triage REST");
        })
        .await?;

    Ok(())
}
