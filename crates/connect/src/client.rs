//! Signifyd case API client.
//!
//! # API Reference
//!
//! - Base URL: `https://api.signifyd.com/v2` (configurable)
//! - Authentication: HTTP basic auth, API key as user name, empty password
//! - `POST /cases` creates a case and answers `{"investigationId": <id>}`
//! - `PUT /cases/{id}/guarantee` with `{"guaranteeDisposition": "CANCELED"}`
//!   answers `{"disposition": "<DISPOSITION>"}`

use std::future::Future;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use signifyd_connect_core::Case;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ApiConfig;

/// Disposition requested when cancelling a guarantee.
pub const CANCELED_DISPOSITION: &str = "CANCELED";

/// Errors that can occur when talking to the Signifyd API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Unauthorized (invalid API key).
    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Outbound case submission transport.
pub trait CaseApi: Send + Sync {
    /// Submit a case. Returns the investigation id assigned by the service,
    /// or `None` when the response carries none.
    fn create_case(
        &self,
        case: &Case,
    ) -> impl Future<Output = Result<Option<String>, ApiError>> + Send;

    /// Ask the service to cancel the guarantee of a case. Returns the
    /// disposition the service reports back.
    fn cancel_guarantee(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<String, ApiError>> + Send;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCaseResponse {
    #[serde(default)]
    investigation_id: Option<serde_json::Value>,
}

impl CreateCaseResponse {
    /// The id may come back as a number or a string.
    fn into_id(self) -> Option<String> {
        match self.investigation_id? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GuaranteeRequest<'a> {
    guarantee_disposition: &'a str,
}

#[derive(Debug, Deserialize)]
struct GuaranteeResponse {
    #[serde(default)]
    disposition: String,
}

/// [`CaseApi`] over HTTPS with reqwest.
#[derive(Clone)]
pub struct HttpCaseClient {
    inner: Arc<HttpCaseClientInner>,
}

struct HttpCaseClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCaseClient {
    /// Create a new client from API configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the API key cannot be used as a header value or the
    /// HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        let credentials = STANDARD.encode(format!("{}:", config.api_key.expose_secret()));
        let mut auth_value = HeaderValue::from_str(&format!("Basic {credentials}"))
            .map_err(|e| ApiError::Parse(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpCaseClientInner {
                client,
                base_url: config.base_url.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Handle API response and parse JSON.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            return response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")));
        }

        Err(Self::parse_error(response).await)
    }

    async fn parse_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return ApiError::RateLimited(retry_after);
        }

        if status == 401 || status == 403 {
            return ApiError::Unauthorized;
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        ApiError::Api { status, message }
    }
}

impl CaseApi for HttpCaseClient {
    #[instrument(skip_all, fields(order_id = %case.purchase.order_id))]
    async fn create_case(&self, case: &Case) -> Result<Option<String>, ApiError> {
        let url = self.endpoint("cases");
        let response = self.inner.client.post(&url).json(case).send().await?;
        let body: CreateCaseResponse = Self::handle_response(response).await?;

        let id = body.into_id();
        debug!(investigation_id = ?id, "Case created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn cancel_guarantee(&self, code: &str) -> Result<String, ApiError> {
        let url = self.endpoint(&format!("cases/{code}/guarantee"));
        let request = GuaranteeRequest {
            guarantee_disposition: CANCELED_DISPOSITION,
        };
        let response = self.inner.client.put(&url).json(&request).send().await?;
        let body: GuaranteeResponse = Self::handle_response(response).await?;

        debug!(disposition = %body.disposition, "Guarantee cancellation answered");
        Ok(body.disposition)
    }
}

impl std::fmt::Debug for HttpCaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCaseClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
