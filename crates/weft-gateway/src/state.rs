use std::sync::Arc;

use weft_core::config::GatewayConfig;
use weft_core::traits::{DefinitionStore, LogStore};
use weft_engine::TriggerDispatcher;

/// Shared application state for axum handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub dispatcher: Arc<TriggerDispatcher>,
    pub definitions: Arc<dyn DefinitionStore>,
    pub logs: Arc<dyn LogStore>,
}
