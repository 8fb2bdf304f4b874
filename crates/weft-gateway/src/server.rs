use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use weft_core::config::GatewayConfig;
use weft_core::traits::{DefinitionStore, LogStore};
use weft_engine::TriggerDispatcher;

use crate::routes;
use crate::state::AppState;

/// HTTP event gateway built on axum: event intake feeding the trigger
/// dispatcher plus a read-only execution log API.
pub struct EventGateway {
    config: GatewayConfig,
    dispatcher: Arc<TriggerDispatcher>,
    definitions: Arc<dyn DefinitionStore>,
    logs: Arc<dyn LogStore>,
}

impl EventGateway {
    pub fn new(
        config: GatewayConfig,
        dispatcher: Arc<TriggerDispatcher>,
        definitions: Arc<dyn DefinitionStore>,
        logs: Arc<dyn LogStore>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            definitions,
            logs,
        }
    }

    /// Run the gateway until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            config: self.config.clone(),
            dispatcher: self.dispatcher.clone(),
            definitions: self.definitions.clone(),
            logs: self.logs.clone(),
        });

        let app = Router::new()
            .route("/api/health", get(routes::health))
            .route("/api/events/{trigger_id}", post(routes::ingest_event))
            .route("/api/workflows", get(routes::list_workflows))
            .route("/api/executions", get(routes::list_executions))
            .route("/api/executions/{id}", get(routes::execution_detail))
            .layer(CorsLayer::permissive())
            .with_state(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Event gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Event gateway shut down");
        Ok(())
    }
}
