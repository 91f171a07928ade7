use anyhow::{Context, Result};
use planner_app::{build_state, router};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = planner_config::load_from_env()?;
    let state = build_state(&config)?;
    let bind_address = config.server.bind_address.as_str();
    let listener = TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("failed to bind sprint planner to '{bind_address}'"))?;

    info!(address = %listener.local_addr()?, "sprint planner listening");
    axum::serve(listener, router(state))
        .await
        .context("sprint planner server exited with an error")?;
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
