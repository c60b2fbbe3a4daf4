mod handlers;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use lokey_api::Config;
use lokey_fortuna::{FortunaConfig, FortunaCore};
use lokey_queue::{FortunaQueue, TrngQueue};
use lokey_trng::{MockBus, TrngProducer};
use parking_lot::Mutex;
use state::AppState;
use tokio::sync::watch;

/// Fatal startup failure: no viable TRNG mode.
const EXIT_NO_VIABLE_MODE: i32 = 1;
/// Fatal startup failure: storage unreachable.
const EXIT_STORAGE_UNAVAILABLE: i32 = 2;

/// Base chunk size for both TRNG hashes and Fortuna output blocks.
const CHUNK_SIZE: u32 = 32;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env().context("loading configuration from the environment") {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(EXIT_NO_VIABLE_MODE);
        }
    };

    let pool = match lokey_queue::open(&config.db_path, config.db_memory_limit_kb)
        .await
        .with_context(|| format!("opening queue storage at {}", config.db_path))
    {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(EXIT_STORAGE_UNAVAILABLE);
        }
    };

    let trng_queue = Arc::new(TrngQueue::with_retention(
        pool.clone(),
        config.trng_queue_size,
        config.retention_days,
    ));
    let fortuna_queue =
        Arc::new(FortunaQueue::with_retention(pool, config.fortuna_queue_size, config.retention_days));
    let fortuna_core = Arc::new(Mutex::new(FortunaCore::new(FortunaConfig::default())));

    let producer = TrngProducer::init(Box::new(MockBus::new()), config.force_mock_mode, trng_queue.clone());
    let producer = Arc::new(tokio::sync::Mutex::new(producer));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let trng_task = tokio::spawn(lokey_trng::run_scheduler(
        producer.clone(),
        config.hash_interval_ms,
        shutdown_rx.clone(),
    ));

    let fortuna_batch_size = fortuna_core.lock().config().batch_size;
    let fortuna_task = tokio::spawn(lokey_fortuna::run_scheduler(
        fortuna_core.clone(),
        trng_queue.clone(),
        fortuna_queue.clone(),
        config.process_interval_ms,
        fortuna_batch_size,
        config.seed_count,
        CHUNK_SIZE,
        config.amplification_factor,
        shutdown_rx.clone(),
    ));

    let app_state = AppState { trng_queue, fortuna_queue, fortuna_core };
    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/trng/hashes", get(handlers::trng_hashes))
        .route("/fortuna/data", get(handlers::fortuna_data))
        .route("/stats", get(handlers::stats))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    log::info!("listening on {addr}");
    let listener = match tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding listener on {addr}"))
    {
        Ok(l) => l,
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(EXIT_STORAGE_UNAVAILABLE);
        }
    };

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                log::error!("http server error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            log::info!("received SIGINT, shutting down");
        }
        _ = sigterm.recv() => {
            log::info!("received SIGTERM, shutting down");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(trng_task, fortuna_task);
    log::info!("shutdown complete");
}
