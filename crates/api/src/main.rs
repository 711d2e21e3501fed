use anyhow::Context;
use secrecy::ExposeSecret;

use mercato_api::app::{self, services::AppServices};
use mercato_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    mercato_observability::init(config.log_format);

    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; using in-memory stores");
    }

    let services = AppServices::from_config(&config)
        .await
        .context("failed to initialise storage")?;
    let app = app::build_app(services, config.jwt_secret.expose_secret());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        environment = %config.environment,
        "listening"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
