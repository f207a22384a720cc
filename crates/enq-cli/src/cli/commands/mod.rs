//! Command handlers and shared session plumbing.

pub mod auth;
pub mod config;
pub mod enquiries;

use anyhow::{Result, anyhow, bail};
use enq_core::api::{ApiClient, ApiError};
use enq_core::config::Config;
use enq_core::session::{Session, SessionStore};

/// Builds a client for the configured backend with an optional token.
pub fn build_client(config: &Config, token: Option<String>) -> Result<ApiClient> {
    let base_url = config.effective_base_url()?;
    ApiClient::new(base_url, token, config.request_timeout())
        .map_err(|err| anyhow!(err.to_string()))
}

/// Route guard for protected commands.
///
/// A convenience gate only: the backend independently rejects unauthorized
/// requests, and the 401 path is the actual enforcement point.
pub fn require_session(store: &SessionStore) -> Result<Session> {
    match store.load() {
        Some(session) => Ok(session),
        None => bail!("Not logged in. Run `enq login` first."),
    }
}

/// Maps an API failure from a protected command to a user-facing error.
///
/// A 401 always escalates to session teardown (the logout procedure) and is
/// never retried; anything else is surfaced with a manual retry suggestion.
pub async fn fail_protected(
    err: ApiError,
    client: &ApiClient,
    store: &SessionStore,
) -> anyhow::Error {
    match err {
        ApiError::Unauthorized => {
            if let Err(clear_err) = enq_core::auth::logout(client, store).await {
                return clear_err;
            }
            anyhow!("Session expired. Please log in again.")
        }
        ApiError::Connection(msg) => {
            anyhow!("{msg}. Check the backend connection and retry.")
        }
        ApiError::Server { message } => anyhow!(message),
    }
}
