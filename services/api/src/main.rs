mod config;
mod routes;
mod state;
mod ws;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

use crate::config::Config;
use crate::state::AppState;

/// Resume uploads are small documents; cap the body well below anything
/// pathological.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Parser)]
#[command(about = "AI voice interviewer service")]
struct Cli {
    /// Host to bind the server to (overrides HOST)
    #[arg(long)]
    host: Option<String>,
    /// Port to run the server on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let host = args.host.unwrap_or_else(|| config.host.clone());
    let port = args.port.unwrap_or(config.port);

    // --- 4. Build Application State ---
    let state = AppState::new(&config);
    info!(
        "Configuration loaded. Oracle model: {}, starting interviewer service...",
        config.chat_model
    );

    // Permissive CORS so a separately-served frontend can connect.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/interviews", post(routes::create))
        .route("/upload-resume/", post(routes::upload_resume))
        .route("/insights/{interview_id}", get(routes::insights))
        .route("/health", get(routes::health))
        .route("/interview/{interview_id}", get(ws::interview_ws))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(state);

    let addr = format!("{host}:{port}");
    info!("Starting interviewer server, listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
