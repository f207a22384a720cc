//! Login/logout flow for the admin session.
//!
//! The flow is an explicit state machine so transitions can be driven
//! directly in tests: `Anonymous -> Submitting -> Authenticated | Failed`.

use serde::Deserialize;
use serde_json::json;

use crate::api::{ApiClient, ApiError, Envelope};
use crate::session::{Session, SessionStore, UserProfile};

/// Fallback message when the backend gives no usable error.
pub const GENERIC_LOGIN_ERROR: &str = "Invalid username or password";

/// Login flow states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Anonymous,
    Submitting,
    Authenticated,
    Failed(String),
}

/// The login form's state machine.
#[derive(Debug)]
pub struct LoginFlow {
    state: LoginState,
}

impl LoginFlow {
    /// Mounts the flow against the store.
    ///
    /// If a token is already present, starts out `Authenticated` without
    /// re-validating against the backend; an expired-but-present token is
    /// only discovered by the first 401.
    pub fn mount(store: &SessionStore) -> Self {
        let state = if store.load().is_some() {
            LoginState::Authenticated
        } else {
            LoginState::Anonymous
        };
        Self { state }
    }

    pub fn state(&self) -> &LoginState {
        &self.state
    }

    /// Attempts to start a submission.
    ///
    /// Returns `true` when the caller should issue the login request.
    /// While a submission is in flight (or the flow is already
    /// authenticated) this is a no-op returning `false`, so rapid repeated
    /// submits produce exactly one network call. Empty credentials are
    /// rejected without ever reaching the network.
    pub fn begin(&mut self, username: &str, password: &str) -> bool {
        match self.state {
            LoginState::Submitting | LoginState::Authenticated => false,
            LoginState::Anonymous | LoginState::Failed(_) => {
                if username.trim().is_empty() || password.is_empty() {
                    self.state =
                        LoginState::Failed("Username and password are required".to_string());
                    return false;
                }
                self.state = LoginState::Submitting;
                true
            }
        }
    }

    /// Records the outcome of an in-flight submission.
    pub fn complete(&mut self, outcome: Result<(), String>) {
        self.state = match outcome {
            Ok(()) => LoginState::Authenticated,
            Err(message) => LoginState::Failed(message),
        };
    }
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    success: bool,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
    #[serde(default)]
    error: Option<String>,
}

/// Submits credentials and persists the session on success.
///
/// Drives the [`LoginFlow`] through its transitions. On any failure the
/// store is left untouched and the flow ends up `Failed` with the server's
/// message or the generic fallback.
pub async fn login(
    client: &ApiClient,
    store: &SessionStore,
    flow: &mut LoginFlow,
    username: &str,
    password: &str,
) -> Result<Session, ApiError> {
    if !flow.begin(username, password) {
        let message = match flow.state() {
            LoginState::Failed(msg) => msg.clone(),
            LoginState::Authenticated => "Already logged in".to_string(),
            _ => "Login already in progress".to_string(),
        };
        return Err(ApiError::Server { message });
    }

    let body = json!({ "username": username, "password": password });
    let outcome = submit(client, &body).await;

    match outcome {
        Ok(session) => {
            store
                .save(&session)
                .map_err(|err| ApiError::Connection(err.to_string()))?;
            flow.complete(Ok(()));
            tracing::debug!(username = %session.user.username, "Login succeeded");
            Ok(session)
        }
        Err(err) => {
            let message = match &err {
                // A 401 on the login endpoint itself means bad credentials,
                // not a stale session.
                ApiError::Unauthorized => GENERIC_LOGIN_ERROR.to_string(),
                other => other.to_string(),
            };
            flow.complete(Err(message.clone()));
            Err(ApiError::Server { message })
        }
    }
}

async fn submit(client: &ApiClient, body: &serde_json::Value) -> Result<Session, ApiError> {
    let envelope: LoginEnvelope = client.post_json("/api/auth/login", body).await?;

    if !envelope.success {
        return Err(ApiError::Server {
            message: envelope.error.unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string()),
        });
    }

    match (envelope.token, envelope.user) {
        (Some(token), Some(user)) => Ok(Session { token, user }),
        _ => Err(ApiError::Connection(
            "Login response missing token or user".to_string(),
        )),
    }
}

/// The logout procedure, callable from any authenticated state.
///
/// Best-effort POST to `/api/auth/logout` whose failure is ignored, then an
/// unconditional clear of the store. Logout always succeeds locally even if
/// the backend is unreachable. Also invoked whenever any API call returns
/// 401.
pub async fn logout(client: &ApiClient, store: &SessionStore) -> anyhow::Result<()> {
    match client.post_empty::<Envelope>("/api/auth/logout").await {
        Ok(_) => {}
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring logout request failure");
        }
    }
    store.clear()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn anon_flow() -> LoginFlow {
        LoginFlow {
            state: LoginState::Anonymous,
        }
    }

    fn client(base_url: &str) -> ApiClient {
        ApiClient::new(base_url, None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_mount_short_circuits_when_token_present() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        store
            .save(&Session {
                token: "tok".to_string(),
                user: UserProfile {
                    username: "admin".to_string(),
                    extra: serde_json::Map::new(),
                },
            })
            .unwrap();

        let flow = LoginFlow::mount(&store);
        assert_eq!(*flow.state(), LoginState::Authenticated);
    }

    #[test]
    fn test_mount_is_anonymous_without_session() {
        let dir = tempdir().unwrap();
        let flow = LoginFlow::mount(&SessionStore::at(dir.path()));
        assert_eq!(*flow.state(), LoginState::Anonymous);
    }

    #[test]
    fn test_begin_rejects_empty_credentials() {
        let mut flow = anon_flow();
        assert!(!flow.begin("", "secret"));
        assert!(matches!(flow.state(), LoginState::Failed(_)));

        let mut flow = anon_flow();
        assert!(!flow.begin("admin", ""));
        assert!(matches!(flow.state(), LoginState::Failed(_)));
    }

    #[test]
    fn test_second_submit_while_in_flight_is_a_no_op() {
        let mut flow = anon_flow();
        assert!(flow.begin("admin", "secret"));
        assert_eq!(*flow.state(), LoginState::Submitting);
        // Rapid second submit: exactly one request goes out.
        assert!(!flow.begin("admin", "secret"));
        assert_eq!(*flow.state(), LoginState::Submitting);
    }

    #[test]
    fn test_failed_flow_can_resubmit() {
        let mut flow = anon_flow();
        assert!(flow.begin("admin", "wrong"));
        flow.complete(Err("Invalid credentials".to_string()));
        assert_eq!(
            *flow.state(),
            LoginState::Failed("Invalid credentials".to_string())
        );
        assert!(flow.begin("admin", "right"));
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({
                "username": "admin",
                "password": "secret"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "token": "tok-1",
                "user": { "username": "admin" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        let mut flow = LoginFlow::mount(&store);

        let session = login(&client(&server.uri()), &store, &mut flow, "admin", "secret")
            .await
            .unwrap();

        assert_eq!(session.token, "tok-1");
        assert_eq!(*flow.state(), LoginState::Authenticated);
        assert_eq!(store.load().unwrap().user.username, "admin");
        assert!(store.admin_hint());
    }

    #[tokio::test]
    async fn test_login_failure_leaves_store_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "Invalid credentials"
            })))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        let mut flow = LoginFlow::mount(&store);

        let err = login(&client(&server.uri()), &store, &mut flow, "admin", "wrong")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(
            *flow.state(),
            LoginState::Failed("Invalid credentials".to_string())
        );
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_login_401_reads_as_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        let mut flow = LoginFlow::mount(&store);

        let err = login(&client(&server.uri()), &store, &mut flow, "admin", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), GENERIC_LOGIN_ERROR);
        assert!(store.load().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_store_even_when_backend_is_down() {
        let dir = tempdir().unwrap();
        let store = SessionStore::at(dir.path());
        store
            .save(&Session {
                token: "tok".to_string(),
                user: UserProfile {
                    username: "admin".to_string(),
                    extra: serde_json::Map::new(),
                },
            })
            .unwrap();

        // Nothing is listening on this port.
        let unreachable = client("http://127.0.0.1:9");
        logout(&unreachable, &store).await.unwrap();

        assert!(store.load().is_none());
        assert!(!store.admin_hint());
    }
}
