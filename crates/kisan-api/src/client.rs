//! Portal REST API client
//!
//! A thin typed wrapper around `reqwest::Client` that builds URLs from the
//! configured base URL, attaches bearer credentials, and maps HTTP failures
//! to [`ApiError`] variants using the server-provided message when there is
//! one.
//!
//! This client never retries. Token renewal lives in
//! [`SessionManager`](crate::session::SessionManager).

use std::time::Duration;

use kisan_core::{config::ApiConfig, domain::User};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{ApiError, ApiResult};

/// Path of the token renewal endpoint
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Token pair returned by login and renewal
#[derive(Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("user", &self.user.as_ref().map(|u| u.id))
            .finish_non_exhaustive()
    }
}

/// HTTP client for the portal REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL without a trailing slash
    base_url: String,
}

impl ApiClient {
    /// Creates a client for `base_url` with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url.into()),
        })
    }

    /// Creates a client with default transport settings (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: normalize_base_url(base_url.into()),
        }
    }

    /// Creates a client from the `api` configuration section
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an unauthenticated request builder for `path`
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, &url)
    }

    /// Sends one request and returns the decoded JSON body
    ///
    /// An empty success body is returned as `Value::Null`.
    ///
    /// # Errors
    ///
    /// Non-success statuses are mapped by [`error_for_status`]; connection
    /// failures and timeouts become [`ApiError::Transport`].
    pub async fn send<B>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> ApiResult<Value>
    where
        B: Serialize + ?Sized,
    {
        let mut builder = self.request(method.clone(), path);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        debug!(%method, path, authenticated = token.is_some(), "Sending request");

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text)
                .map_err(|e| ApiError::InvalidResponse(format!("{method} {path}: {e}")));
        }

        debug!(%method, path, status = status.as_u16(), "Request failed");
        Err(error_for_status(status, &text))
    }

    /// Exchanges a refresh token for a new token pair
    ///
    /// Issued directly, never through the renewing request path.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenResponse> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let value = self
            .send(Method::POST, REFRESH_PATH, None, Some(&body))
            .await?;
        decode(value, "token renewal response")
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Decodes a JSON value into `T`, reporting `what` on failure
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(format!("{what}: {e}")))
}

/// Appends URL-encoded query parameters to `path`, skipping unset values
pub fn with_query(path: &str, params: &[(&str, Option<String>)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    let mut any = false;
    for (key, value) in params {
        if let Some(value) = value {
            query.append_pair(key, value);
            any = true;
        }
    }
    if any {
        format!("{path}?{}", query.finish())
    } else {
        path.to_string()
    }
}

/// Maps a non-success status and body to an [`ApiError`]
pub fn error_for_status(status: StatusCode, body: &str) -> ApiError {
    let message = server_message(body)
        .unwrap_or_else(|| format!("request failed with status {}", status.as_u16()));

    match status {
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        StatusCode::FORBIDDEN => ApiError::Forbidden(message),
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::CONFLICT => ApiError::Conflict(message),
        s if s.is_server_error() => ApiError::Server(message),
        s => ApiError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

/// Extracts the human-readable message from an error body
///
/// Looks at `detail`, `message` and `msg` in that order. A list of
/// field errors (`[{"msg": ...}, ...]`) is joined with `; `.
pub fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["detail", "message", "msg"]
        .into_iter()
        .filter_map(|key| value.get(key))
        .find_map(|field| match field {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(Value::as_str).or(item.as_str()))
                    .collect::<Vec<_>>()
                    .join("; ");
                (!joined.is_empty()).then_some(joined)
            }
            _ => None,
        })
}
