//! deskbridge HTTP server.
//!
//! Wires configuration, credentials, the relay client and the reply sender
//! into the conversation handlers and serves them over axum.

pub mod app;
pub mod config;
pub mod error;
pub mod instructions;

use crate::app::AppState;
use crate::config::{BotConfig, ServerConfig};
use crate::error::StartupError;
use crate::instructions::Instructions;
use deskbridge_channel::ConnectorReplySender;
use deskbridge_conversation::{ConversationHandler, FeedbackHandler, HistoryStore, IdentityPolicy};
use deskbridge_integration::{
    CredentialProvider, HttpRelayClient, ManagedIdentityCredential, StaticCredential,
};
use rootcause::Report;
use std::sync::Arc;

/// Picks the credential provider for outbound calls.
///
/// Managed identity wins when enabled; otherwise a configured fixed token is
/// used. `None` means calls go out unauthenticated.
///
/// # Errors
///
/// Returns an error if the managed identity client cannot be built.
pub fn credential_provider(
    bot: &BotConfig,
) -> Result<Option<Arc<dyn CredentialProvider>>, Report<StartupError>> {
    if bot.uses_managed_identity() {
        let credential = match &bot.identity_endpoint {
            Some(endpoint) => {
                ManagedIdentityCredential::with_endpoint(bot.client_id.clone(), endpoint.clone())
            }
            None => ManagedIdentityCredential::new(bot.client_id.clone()),
        }
        .map_err(|report| StartupError::Credential {
            reason: report.to_string(),
        })?;
        return Ok(Some(Arc::new(credential)));
    }
    Ok(bot
        .access_token
        .as_ref()
        .map(|token| Arc::new(StaticCredential::new(token.clone())) as Arc<dyn CredentialProvider>))
}

/// Builds the application state from configuration.
///
/// # Errors
///
/// Returns an error if the relay client or credentials cannot be built.
pub fn build_state(
    config: &ServerConfig,
    instructions: Instructions,
) -> Result<AppState, Report<StartupError>> {
    let credentials = credential_provider(&config.bot)?;

    let mut relay = HttpRelayClient::new(&config.relay.client_config()).map_err(|report| {
        StartupError::Relay {
            reason: report.to_string(),
        }
    })?;
    match (&config.relay.token_scope, &credentials) {
        (Some(_), Some(credentials)) => relay = relay.with_credentials(Arc::clone(credentials)),
        (Some(scope), None) => {
            tracing::warn!(%scope, "relay token scope set but no credentials configured");
        }
        (None, _) => {}
    }

    let sender = match &credentials {
        Some(credentials) => {
            ConnectorReplySender::new(Arc::clone(credentials), config.bot.scope.clone())
        }
        None => {
            tracing::warn!("no bot credentials configured; replies are sent unauthenticated");
            ConnectorReplySender::anonymous()
        }
    };

    if config.relay.identity_policy == IdentityPolicy::Blank {
        tracing::warn!("identity policy is blank; relay requests carry no user email or thread id");
    }

    let conversations = ConversationHandler::new(
        Arc::new(HistoryStore::new()),
        Arc::new(relay),
        Arc::new(sender),
    )
    .with_identity_policy(config.relay.identity_policy);

    Ok(AppState::new(conversations, FeedbackHandler::new(), instructions))
}

/// Loads instructions, binds the listener and serves until shutdown.
///
/// # Errors
///
/// Returns an error if startup fails or the server stops with an error.
pub async fn run(config: ServerConfig) -> Result<(), Report<StartupError>> {
    let instructions = Instructions::load(&config.instructions_path).await?;
    tracing::info!(
        path = %config.instructions_path.display(),
        chars = instructions.as_str().chars().count(),
        "Loaded instructions"
    );

    let state = Arc::new(build_state(&config, instructions)?);
    let app = app::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| StartupError::Serve {
            reason: format!("failed to bind to {}: {e}", config.bind_addr),
        })?;

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Serve {
            reason: e.to_string(),
        })?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
