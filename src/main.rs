// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use confidential_risk_server::{
    api::router,
    config::{AppConfig, LogFormat, StorageBackend, DEFAULT_LOG_FILTER},
    expiry::ExpirySweeper,
    fhe::LocalFhe,
    protocol::WorkflowPolicy,
    relay::OracleRelay,
    state::AppState,
    storage::{InMemoryStore, KeyedStore, RedbStore},
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env();
    init_tracing(config.log_format);
    config.log_warnings();

    let store: Arc<dyn KeyedStore> = match config.storage_backend {
        StorageBackend::Redb => {
            let path = config.database_path();
            tracing::info!(path = %path.display(), "Opening redb record store");
            Arc::new(RedbStore::open(&path)?)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory record store; records are lost on restart");
            Arc::new(InMemoryStore::new())
        }
    };

    let (relay_tx, relay_rx) = tokio::sync::mpsc::unbounded_channel();
    let fhe = match &config.oracle_signing_key {
        Some(key) => LocalFhe::new(key.clone()),
        None => {
            tracing::warn!("No ORACLE_SIGNING_KEY set; using an ephemeral oracle key");
            LocalFhe::with_random_key()
        }
    };
    let fhe = Arc::new(fhe.with_relay(relay_tx));

    let policy = WorkflowPolicy {
        request_ttl: chrono::Duration::from_std(config.decryption_ttl)?,
        ..WorkflowPolicy::default()
    };
    let mut state = AppState::local(store, fhe.clone(), policy);
    if config.storage_backend == StorageBackend::Redb {
        state = state.with_data_dir(config.data_dir.clone());
    }

    let shutdown = CancellationToken::new();
    let sweeper = ExpirySweeper::new(state.workflow.clone()).with_interval(config.expiry_sweep_interval);
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.clone()));
    let relay = OracleRelay::new(fhe, state.workflow.clone(), config.oracle_latency);
    let relay_task = tokio::spawn(relay.run(relay_rx, shutdown.clone()));

    let app = router(state);
    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Confidential risk server listening (docs at /docs)");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    let (sweeper, relay) = tokio::join!(sweeper_task, relay_task);
    for (task, result) in [("expiry sweeper", sweeper), ("oracle relay", relay)] {
        if let Err(e) = result {
            tracing::error!(task, error = %e, "Background task failed");
        }
    }
    tracing::info!("Server stopped");
    Ok(())
}
