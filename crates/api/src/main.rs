use std::sync::Arc;

use anyhow::Context;

use gatekeep_api::app::{build_app, services};
use gatekeep_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; real environments set variables directly.
    let _ = dotenvy::dotenv();
    gatekeep_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let mut app_services = services::build_services(&config).await?;
    let liveness = services::connect_liveness(&config).await;
    if let Some(probe) = &liveness {
        app_services = app_services.with_liveness(Arc::new(probe.clone()));
    }

    let app = build_app(app_services);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(probe) = liveness {
        probe.close();
    }
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
