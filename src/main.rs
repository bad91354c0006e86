//! Virtual Vince proxy server
//!
//! Relays chat requests to the completion API with the persona instruction
//! prepended, and serves the stub endpoint for credential-free testing.

use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use virtual_vince::api::{create_router, AppState};
use virtual_vince::env;
use virtual_vince::llm::{build_service, LlmConfig};
use virtual_vince::persona::Persona;
use virtual_vince::proxy::{CompletionProxy, DEFAULT_EXAMPLE_DELAY};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "virtual_vince=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let port: u16 = env::parsed(&env::process_env, "VINCE_PORT")?.unwrap_or(8000);
    let example_delay = env::parsed(&env::process_env, "VINCE_EXAMPLE_DELAY_MS")?
        .map_or(DEFAULT_EXAMPLE_DELAY, Duration::from_millis);

    let persona = Persona::from_env()?;
    let llm_config = LlmConfig::from_env()?;
    let llm = build_service(&llm_config);

    if let Some(service) = &llm {
        tracing::info!(
            model = %service.model_id(),
            base_url = %llm_config.base_url,
            persona = %persona.name,
            "Completion service initialized"
        );
    } else {
        tracing::warn!("No completion API key configured. Set OPENAI_API_KEY.");
    }

    let proxy = CompletionProxy::new(llm, &persona).with_example_delay(example_delay);
    let state = AppState::new(proxy);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Virtual Vince server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
