use std::sync::Arc;

use backend::{
    config::{self, Settings},
    routes,
    state::AppState,
};
use research_relay::observability::init_observability;
use research_upstream::UpstreamClient;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::init();
    init_observability();

    let settings = Settings::load();
    let client = UpstreamClient::new(settings.upstream_config())?;
    let state = AppState::new(Arc::new(client), settings.driver_config());

    let app = routes::router(state);
    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, engine = %settings.engine, "research relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
