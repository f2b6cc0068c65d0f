//! Application state.

use std::sync::Arc;

use pix_queue::SettlementQueue;
use pix_store::Store;

use crate::config::ServiceConfig;
use crate::pipeline::TransactionPipeline;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage collaborator.
    pub store: Arc<dyn Store>,

    /// The settlement queue collaborator.
    pub queue: Arc<dyn SettlementQueue>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn SettlementQueue>, config: ServiceConfig) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Build a transaction pipeline over this state's collaborators.
    #[must_use]
    pub fn pipeline(&self) -> TransactionPipeline {
        TransactionPipeline::new(Arc::clone(&self.store), Arc::clone(&self.queue))
    }
}
