//! catalog-sync service entry point

use catalog_sync::jobs::{PeriodicScheduler, SyncWorker};
use catalog_sync::pipeline::MirrorRelay;
use catalog_sync::tasks::{BackgroundTasks, TaskKind};
use catalog_sync::{AppState, Config, api, logger};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    logger::init_logger(
        &config.log_level,
        config.is_production(),
        config.log_dir.as_deref(),
    );

    tracing::info!("Starting catalog-sync (env: {})", config.environment);

    let state = AppState::new(&config).await?;

    // Background tasks
    let mut tasks = BackgroundTasks::new();
    let token = tasks.shutdown_token();

    for id in 0..config.workers {
        let worker = SyncWorker::new(
            id,
            state.job_rx.clone(),
            state.pipeline.clone(),
            state.registry.clone(),
            state.locks.clone(),
        );
        tasks.spawn("sync_worker", TaskKind::Worker, worker.run(token.clone()));
    }

    if let Some(mirror) = state.stores.mirror.clone() {
        let relay = MirrorRelay::new(
            state.stores.outbox.clone(),
            mirror,
            state.stores.mirror_locks.clone(),
            config.mirror_max_attempts,
        );
        tasks.spawn(
            "mirror_relay",
            TaskKind::Periodic,
            relay.run(config.mirror_relay_interval, token.clone()),
        );
    }

    if let Some(interval) = config.sync_interval {
        let scheduler =
            PeriodicScheduler::new(state.queue.clone(), state.stores.ledger.clone(), interval);
        tasks.spawn(
            "periodic_sync",
            TaskKind::Periodic,
            scheduler.run(token.clone()),
        );
        tracing::info!(interval_secs = interval.as_secs(), "Scheduled sync enabled");
    }

    tasks.log_summary();

    // HTTP server
    let app = api::create_router(state);
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("catalog-sync HTTP listening on {http_addr}");

    let shutdown = token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received, shutting down");
                }
                _ = shutdown.cancelled() => {}
            }
        })
        .await?;

    tasks.shutdown().await;
    Ok(())
}
