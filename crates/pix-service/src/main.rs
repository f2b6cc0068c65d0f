//! Pix-Bank Service - HTTP API plus settlement workers.
//!
//! This is the main entry point for the pix-bank service.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pix_queue::{MemoryQueue, SettlementQueue};
use pix_service::{create_router, AppState, ServiceConfig, SettlementConsumer};
use pix_store::{MemoryStore, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pix_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pix-Bank Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        settlement_workers = config.settlement_workers,
        "Service configuration loaded"
    );

    // Collaborators: in-memory store and broker. Durable backends plug in
    // behind the same traits.
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let queue: Arc<dyn SettlementQueue> = Arc::new(MemoryQueue::new());

    // Spawn competing settlement consumers
    for worker in 0..config.settlement_workers {
        let consumer = SettlementConsumer::new(Arc::clone(&store), Arc::clone(&queue));
        tokio::spawn(async move {
            tracing::info!(worker, "settlement consumer started");
            consumer.run().await;
        });
    }

    // Build app state and router
    let state = AppState::new(store, queue, config.clone());
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
