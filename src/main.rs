//! Agentcast 服务入口

use agentcast_lib::config::AppConfig;
use agentcast_lib::{server, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("agentcast_lib=info,agentcast=info")),
        )
        .init();

    let config = AppConfig::load();
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config);
    let app = server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Agentcast 服务已启动: http://{addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
