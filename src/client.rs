use std::error::Error as _;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Method;
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Per-request timeout applied when the builder is not told otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const USER_AGENT: &str = concat!("door-notify/", env!("CARGO_PKG_VERSION"));

/// How a provider authenticates requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Auth {
    /// The token is already part of the base URL (Telegram's `/bot<token>/`).
    InPath,
    /// `Authorization: Bearer <token>` on every request.
    Bearer(String),
}

/// Thin JSON-over-HTTPS client bound to one provider base URL.
///
/// Every call is a single request with no retries. Transport outcomes are
/// normalized into [`ApiResult`]; interpreting provider-level `ok` /
/// `success` flags is left to the provider adapters.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url: base_url.into(),
            auth: Auth::InPath,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Full URLs pass through untouched; anything else is treated as a
    /// method name or path relative to the base URL.
    pub fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        format!("{}/{}", self.base_url, target.trim_start_matches('/'))
    }

    /// POST `payload` as JSON when present, otherwise GET.
    pub async fn call(&self, target: &str, payload: Option<&Value>) -> ApiResult {
        let method = if payload.is_some() {
            Method::POST
        } else {
            Method::GET
        };
        self.execute(method, target, &[], payload).await
    }

    /// GET with query-string parameters.
    pub async fn get_with_query(&self, target: &str, query: &[(&str, &str)]) -> ApiResult {
        self.execute(Method::GET, target, query, None).await
    }

    /// POST with an empty body, for action endpoints that take no input.
    pub async fn post_empty(&self, target: &str) -> ApiResult {
        self.execute(Method::POST, target, &[], None).await
    }

    async fn execute(
        &self,
        method: Method,
        target: &str,
        query: &[(&str, &str)],
        payload: Option<&Value>,
    ) -> ApiResult {
        let url = self.resolve_url(target);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        if let Auth::Bearer(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = payload {
            // Sets Content-Type: application/json
            request = request.json(body);
        }

        // The URL may embed a token, so only the target is logged.
        debug!(%method, endpoint = target, "sending API request");

        let response = request.send().await.map_err(|err| {
            if err.is_builder() {
                ApiError::InvalidInput(format!("cannot build request for {target}"))
            } else {
                ApiError::Network(network_reason(err))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| ApiError::Network(network_reason(err)))?;

        debug!(%method, endpoint = target, status = status.as_u16(), "received API response");

        if !status.is_success() {
            return Err(ApiError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|_| ApiError::Parse {
            status: status.as_u16(),
            body,
        })
    }
}

/// Flatten a reqwest error and its causes into one line, without the URL.
fn network_reason(err: reqwest::Error) -> String {
    let err = err.without_url();
    let mut reason = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        reason.push_str(": ");
        reason.push_str(&cause.to_string());
        source = cause.source();
    }
    reason
}

/// Builder for [`ApiClient`].
#[derive(Debug)]
pub struct ApiClientBuilder {
    base_url: String,
    auth: Auth,
    timeout: Duration,
}

impl ApiClientBuilder {
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn bearer(self, token: impl Into<String>) -> Self {
        self.auth(Auth::Bearer(token.into()))
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ApiResult<ApiClient> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| ApiError::Network(network_reason(err)))?;

        Ok(ApiClient {
            http,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            auth: self.auth,
        })
    }
}
