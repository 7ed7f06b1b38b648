use std::net::SocketAddr;

use deployctl::adapters::Adapters;
use deployctl::config::Config;
use deployctl::{AppState, api};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("debug,axum=info,reqwest=info,hyper_util=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .compact()
        .init();

    let config = Config::load()?;
    let adapters = Adapters::from_config(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(adapters, config);

    let app = axum::Router::new()
        .nest("/api", api::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}


