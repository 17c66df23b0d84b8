use deskbridge_server::config::ServerConfig;
use deskbridge_server::error::StartupError;
use rootcause::Report;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Report<StartupError>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        reason: e.to_string(),
    })?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        relay = %config.relay.base_url,
        identity_policy = ?config.relay.identity_policy,
        managed_identity = config.bot.uses_managed_identity(),
        "Loaded configuration"
    );

    deskbridge_server::run(config).await
}
