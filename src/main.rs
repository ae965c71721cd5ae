use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sensor_watch_service::{
    api::{self, AppState},
    catalog::Catalog,
    config::Config,
    db,
    ingest::IngestService,
    liveness::{LivenessRegistry, LivenessScanner},
    notify::{telegram::TelegramSink, Notifier},
    status::StatusService,
    thresholds::evaluator::Evaluator,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    // Initialise tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config and the monitoring catalog
    let config = Config::from_env()?;
    let catalog = Catalog::load(&config.catalog_path)
        .with_context(|| format!("failed to load catalog from {}", config.catalog_path.display()))?;
    let catalog = Arc::new(catalog);
    info!(
        path = %config.catalog_path.display(),
        ladders = catalog.thresholds.len(),
        "Catalog loaded"
    );

    // Connect to DB, run migrations, mirror areas and doors
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    db::sync_sites(&pool, &catalog.sites).await?;
    info!("Database ready");

    // Notification queue
    let notifier = match &config.telegram {
        Some(tg) => {
            let sink = TelegramSink::new(&tg.api_base, &tg.bot_token, tg.chat_id);
            info!(workers = config.notify_workers, "Telegram notifications enabled");
            Notifier::spawn(sink, config.notify_queue_capacity, config.notify_workers)
        }
        None => {
            warn!("Running without a notification transport");
            Notifier::disabled()
        }
    };

    // Shared services
    let registry = LivenessRegistry::new(
        config.liveness_policy(),
        Arc::clone(&catalog),
        notifier.clone(),
        config.display_offset,
    );
    let evaluator = Evaluator::new(catalog);
    let state = AppState {
        ingest: IngestService::new(
            pool.clone(),
            registry.clone(),
            evaluator.clone(),
            notifier,
            config.statement_timeout(),
        ),
        status: StatusService::new(pool, evaluator, registry.clone(), config.display_offset),
        registry: registry.clone(),
    };

    // Spawn offline detection
    tokio::spawn(LivenessScanner::new(registry, config.scan_interval_secs).run());

    // Start HTTP server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
