//! HTTP client for the OS REST API.
//!
//! Wraps an injected [`HttpTransport`] with the two interception points of
//! the API: the bearer token is attached to every outgoing request, and a
//! 401 response ends the session (token removed, login navigation) before
//! the error is handed back to the caller.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::AppConfig;
use crate::ports::{HttpRequest, HttpResponse, HttpTransport, Navigator, TokenStorage, TransportError};

/// Errors that can occur when calling the API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("request failed with status code 401: session expired")]
    Unauthorized { url: String },
    #[error("request failed with status code {code}: {message}", code = .status.as_u16())]
    Status { status: StatusCode, message: String },
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to parse response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    /// HTTP status carried by the error, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

/// Configured API client. Construct once and share by reference or `Arc`.
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    tokens: Arc<dyn TokenStorage>,
    navigator: Arc<dyn Navigator>,
    base_url: Url,
    timeout: Duration,
    token_key: String,
    login_url: String,
}

impl ApiClient {
    /// Create a new API client.
    pub fn new(
        config: &AppConfig,
        transport: Arc<dyn HttpTransport>,
        tokens: Arc<dyn TokenStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.api.full_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", config.api.full_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.api.full_url.clone()));
        }

        Ok(Self {
            transport,
            tokens,
            navigator,
            base_url,
            timeout: config.api.timeout(),
            token_key: config.auth.jwt_storage_key.clone(),
            login_url: config.auth.login_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Token storage the client reads its bearer token from.
    pub fn tokens(&self) -> &Arc<dyn TokenStorage> {
        &self.tokens
    }

    /// Build the URL of `segments` below the base URL.
    ///
    /// Each segment is percent-encoded as a single path segment, so values
    /// containing `/`, `#` or `?` cannot escape their position.
    pub fn url(&self, segments: &[&str], query: &[(String, String)]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    pub async fn get(
        &self,
        segments: &[&str],
        query: &[(String, String)],
    ) -> Result<HttpResponse, ClientError> {
        let url = self.url(segments, query)?;
        self.execute(Method::GET, url, None).await
    }

    pub async fn delete(&self, segments: &[&str]) -> Result<HttpResponse, ClientError> {
        let url = self.url(segments, &[])?;
        self.execute(Method::DELETE, url, None).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<HttpResponse, ClientError> {
        self.send_json(Method::POST, segments, body).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<HttpResponse, ClientError> {
        self.send_json(Method::PUT, segments, body).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<HttpResponse, ClientError> {
        self.send_json(Method::PATCH, segments, body).await
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<HttpResponse, ClientError> {
        let url = self.url(segments, &[])?;
        let body = serde_json::to_vec(body).map_err(ClientError::Encode)?;
        self.execute(method, url, Some(Bytes::from(body))).await
    }

    /// Run one request through both interceptors.
    pub async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Bytes>,
    ) -> Result<HttpResponse, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, */*"));
        self.authorize(&mut headers);

        debug!(%method, path = url.path(), "sending request");

        let request = HttpRequest {
            method,
            url: url.clone(),
            headers,
            body,
            timeout: self.timeout,
        };

        let response = self.transport.send(request).await?;
        self.intercept(&url, response)
    }

    /// Outgoing interceptor: attach the stored bearer token, if any.
    fn authorize(&self, headers: &mut HeaderMap) {
        let Some(token) = self.tokens.get(&self.token_key) else {
            return;
        };

        match HeaderValue::from_str(&format!("Bearer {}", token)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => warn!("stored token is not a valid header value, sending without it"),
        }
    }

    /// Incoming interceptor.
    fn intercept(&self, url: &Url, response: HttpResponse) -> Result<HttpResponse, ClientError> {
        if response.status == StatusCode::UNAUTHORIZED {
            warn!(path = url.path(), "received 401, ending session");
            if let Err(e) = self.tokens.remove(&self.token_key) {
                warn!(error = %e, "failed to clear stored token");
            }
            self.navigator.navigate(&self.login_url);
            return Err(ClientError::Unauthorized {
                url: url.to_string(),
            });
        }

        if !response.is_success() {
            return Err(ClientError::Status {
                status: response.status,
                message: error_message(&response),
            });
        }

        Ok(response)
    }
}

/// Best-effort message from an error body: `{"error": ..}` or
/// `{"message": ..}` if JSON, else the raw text, else the reason phrase.
fn error_message(response: &HttpResponse) -> String {
    if let Ok(value) = response.json::<serde_json::Value>() {
        for key in ["error", "message", "mensagem"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }

    let text = response.text();
    let text = text.trim();
    if !text.is_empty() && text.len() <= 200 {
        return text.to_string();
    }

    response
        .status
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string()
}
