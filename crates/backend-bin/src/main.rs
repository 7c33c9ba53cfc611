// ============================
// taskchat-backend-bin/src/main.rs
// ============================
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use taskchat_backend_lib::{
    config::Settings, records, store::FlatFileStore, ws_router, AppState,
};

#[derive(Parser, Debug)]
#[command(name = "taskchat-server", about = "Real-time conversation and record server")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the bind address from config
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if let Some(bind) = cli.bind {
        settings.bind_addr = bind;
    }

    // RUST_LOG wins; the configured level is the fallback
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let store = FlatFileStore::new(&settings.data_dir)?;
    let state = Arc::new(AppState::new(store, settings));
    let bind_addr = state.settings.bind_addr;

    // the original server ran with a wide-open CORS policy; keep that
    let app = records::create_router(Arc::clone(&state))
        .merge(ws_router::create_router(state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!(%bind_addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
