//! HTTP client for the enquiries backend.
//!
//! Wraps `reqwest` with a base URL and attaches a bearer token to every
//! outgoing request when one is present. The client maps transport and
//! status failures into [`ApiError`] but never touches the session store
//! itself; callers react to `Unauthorized` by running the logout procedure.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Error taxonomy at the API boundary.
#[derive(Debug)]
pub enum ApiError {
    /// HTTP 401 from any endpoint. Reserved for "session invalid, force
    /// logout" — never retried silently.
    Unauthorized,
    /// Transport failure, timeout, or an unexpected status with no usable
    /// error body. User-visible with a manual retry action.
    Connection(String),
    /// A well-formed `{success: false, error}` payload from the backend.
    Server { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Session is no longer valid (401)"),
            ApiError::Connection(msg) => write!(f, "Connection error: {msg}"),
            ApiError::Server { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Minimal success/error envelope shared by mutation endpoints.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl Envelope {
    /// Converts a non-success envelope into a server error.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Server {
                message: self
                    .error
                    .unwrap_or_else(|| "Request failed".to_string()),
            })
        }
    }
}

/// HTTP client bound to a base URL and an optional bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a client with the given base URL, token, and request timeout.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ApiError::Connection(err.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token,
        })
    }

    /// GET a JSON payload.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.get(self.url(path))).await?;
        decode(response).await
    }

    /// POST a JSON body, expecting a JSON payload back.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self.send(self.http.post(self.url(path)).json(body)).await?;
        decode(response).await
    }

    /// POST with no body, expecting a JSON payload back.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.post(self.url(path))).await?;
        decode(response).await
    }

    /// PATCH a JSON body, expecting a JSON payload back.
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let response = self.send(self.http.patch(self.url(path)).json(body)).await?;
        decode(response).await
    }

    /// DELETE, expecting a JSON payload back.
    pub async fn delete_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(self.http.delete(self.url(path))).await?;
        decode(response).await
    }

    /// GET a raw (non-JSON) payload, e.g. the CSV export stream.
    pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let response = self.send(self.http.get(self.url(path))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Sends a request with the bearer token attached and maps the status.
    async fn send(
        &self,
        mut builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ApiError> {
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Connection(err.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            tracing::debug!(%status, "Request rejected, session invalid");
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            // HTTP errors may still carry a {success: false, error} body.
            let body = response.text().await.unwrap_or_default();
            if let Ok(envelope) = serde_json::from_str::<Envelope>(&body) {
                if let Some(message) = envelope.error {
                    return Err(ApiError::Server { message });
                }
            }
            return Err(ApiError::Connection(format!(
                "Unexpected status {status}"
            )));
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    response
        .json::<T>()
        .await
        .map_err(|err| ApiError::Connection(format!("Invalid response body: {err}")))
}
