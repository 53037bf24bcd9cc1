//! Login, logout and session checks.
//!
//! Tokens are issued by the storefront's own auth flow; `login` only stores
//! one and lets the cart merge the guest lines into the account cart.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use timberline_storefront::api::SessionEndpoint;
use timberline_storefront::models::storage_keys;
use timberline_storefront::services::{AuthEvent, SessionStatus};

use super::{CliError, Context};

/// Store a token and reconcile the guest cart with the account cart.
pub async fn login(ctx: &Context, token: SecretString) -> Result<(), CliError> {
    let token = token.expose_secret().trim();
    if token.is_empty() {
        return Err(CliError::InvalidArgument(
            "token must not be empty".to_string(),
        ));
    }

    ctx.storage.set(storage_keys::AUTH_TOKEN, token)?;
    ctx.storage
        .set(storage_keys::SESSION_MARKER, &Utc::now().to_rfc3339())?;
    tracing::info!("Logged in");

    if let Some(outcome) = ctx.cart.on_auth_event(AuthEvent::LoggedIn).await? {
        tracing::info!(?outcome, "Guest cart merged");
    }
    Ok(())
}

/// End the server session, drop the token and clear the local cart.
pub async fn logout(ctx: &Context) -> Result<(), CliError> {
    if let Err(e) = ctx.gateway.clear_session().await {
        tracing::warn!(error = %e, "Server session could not be cleared");
    }

    ctx.storage.remove(storage_keys::AUTH_TOKEN)?;
    ctx.storage.remove(storage_keys::SESSION_MARKER)?;
    ctx.cart.on_auth_event(AuthEvent::LoggedOut).await?;
    tracing::info!("Logged out");
    Ok(())
}

/// Report the session state, clearing a zombie session if one is found.
pub async fn check(ctx: &Context) {
    match ctx.sessions.check().await {
        SessionStatus::Guest => tracing::info!("No active session"),
        SessionStatus::Authenticated => tracing::info!("Logged in"),
        SessionStatus::Zombie { remote_cleared } => {
            tracing::warn!(remote_cleared, "Stale server session found and cleared");
        }
    }
}
