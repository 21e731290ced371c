mod config;
mod errors;
mod form;
mod generation;
mod notifications;
mod pinning;
mod remote;
mod routes;
mod save;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::form::models::ModelParams;
use crate::form::state::FormState;
use crate::generation::consumer::StreamingConsumer;
use crate::notifications::Notifier;
use crate::pinning::PinService;
use crate::remote::RemoteClient;
use crate::routes::build_router;
use crate::save::controller::SaveController;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Studio API v{}", env!("CARGO_PKG_VERSION"));

    // One HTTP client backs every remote seam
    let remote = Arc::new(RemoteClient::new(&config.api_base_url, config.http_timeout)?);
    info!("Remote client initialized ({})", config.api_base_url);

    let notifier = Notifier::default();

    let consumer = Arc::new(StreamingConsumer::new(
        remote.clone(),
        notifier.clone(),
        config.resubmit_policy,
    ));
    info!("Resubmit policy: {:?}", config.resubmit_policy);

    let saver = Arc::new(SaveController::new(
        remote.clone(),
        remote.clone(),
        notifier.clone(),
        config.wallet_address.clone(),
        config.save_dialog_dismiss,
    ));

    let pins = Arc::new(PinService::new(
        remote.clone(),
        remote.clone(),
        notifier.clone(),
    ));

    // Build app state
    let state = AppState {
        form: Arc::new(RwLock::new(FormState::default())),
        model_params: Arc::new(RwLock::new(ModelParams::default())),
        consumer,
        saver,
        pins,
        notifier,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
