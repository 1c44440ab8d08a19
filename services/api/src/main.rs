mod config;
mod error;
mod routes;
mod state;

use crate::config::{Config, EvaluatorProvider};
use crate::state::AppState;
use anyhow::Context;
use interview_core::evaluator::{Evaluator, OpenAiEvaluator, StubEvaluator};
use interview_core::registry::SessionRegistry;
use interview_core::transport::{RoomTransport, SimulatedRoom};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    let evaluator: Arc<dyn Evaluator> = match config.provider {
        EvaluatorProvider::OpenAi => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY must be set for 'openai' evaluator")?;
            Arc::new(OpenAiEvaluator::new(
                SecretString::from(api_key),
                config.chat_model.clone(),
            ))
        }
        EvaluatorProvider::Stub => Arc::new(StubEvaluator),
    };

    // The simulated room stands in for the real media platform SDK here;
    // a production deployment swaps this factory for the platform adapter.
    let rooms: state::TransportFactory =
        Arc::new(|| Box::new(SimulatedRoom::new(Duration::from_secs(2))) as Box<dyn RoomTransport>);

    let state = AppState {
        registry: SessionRegistry::new(),
        config: Arc::new(config.clone()),
        evaluator,
        rooms,
    };

    // Permissive CORS so the interview frontend can connect from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::router(state).layer(cors);

    info!(
        "Starting interview agent backend, listening on {}",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
