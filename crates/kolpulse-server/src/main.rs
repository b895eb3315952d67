mod api;
mod bus;
mod middleware;
mod store;

use std::sync::Arc;

use kolpulse_analyzer::{
    AnalyzerConfig, Classifier, ClassifierAdapter, EventBus, HttpClassifier, ItemProcessor,
    ItemStore, NotificationConsumer, Supervisor, SupervisorConfig, TrendDetector, Unit,
};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    bus::PgBus,
    store::PgItemStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = kolpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, "starting kolpulse server");

    let pool_config = kolpulse_db::PoolConfig::from_app_config(&config);
    let pool = kolpulse_db::connect_pool(&config.database_url, pool_config).await?;
    kolpulse_db::run_migrations(&pool).await?;
    kolpulse_db::ping(&pool).await?;

    let pg_bus = PgBus::new(pool.clone());
    pg_bus.verify().await?;

    let store: Arc<dyn ItemStore> = Arc::new(PgItemStore::new(pool.clone()));
    let bus: Arc<dyn EventBus> = Arc::new(pg_bus);
    let classifier: Arc<dyn Classifier> = Arc::new(HttpClassifier::new(&config.classifier_url));

    let analyzer_config = AnalyzerConfig::from_app_config(&config);
    let adapter = ClassifierAdapter::from_config(classifier, &analyzer_config);
    let processor = ItemProcessor::new(adapter, Arc::clone(&store), &analyzer_config);
    let units: Vec<Arc<dyn Unit>> = vec![
        Arc::new(NotificationConsumer::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            processor,
            &analyzer_config,
        )),
        Arc::new(TrendDetector::new(
            Arc::clone(&store),
            Arc::clone(&bus),
            &analyzer_config,
        )),
    ];
    let supervisor = Supervisor::start(units, &SupervisorConfig::from_app_config(&config));

    let app = build_app(AppState::new(pool.clone(), &config));
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "API listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let report = supervisor.shutdown().await;
    if !report.aborted.is_empty() {
        tracing::warn!(aborted = ?report.aborted, "some units were aborted during shutdown");
    }
    pool.close().await;

    served?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
