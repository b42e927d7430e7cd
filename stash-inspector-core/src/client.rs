//! Authenticated client for the repository server's REST API.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use log::debug;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;

use crate::endpoint::{Endpoint, RequestParams};
use crate::error::{Result, StashError};

const DEFAULT_USER_AGENT: &str = "stash-inspector";

/// Boxed future returned by [`StashClient`] lookups.
pub type JsonFuture<'a> = Pin<Box<dyn Future<Output = Result<Value>> + Send + 'a>>;

/// Issues GET requests against the repository server and returns parsed JSON.
pub trait StashClient {
    /// Fetch an endpoint with the given parameters.
    fn get_json<'a>(&'a self, endpoint: Endpoint, params: &'a RequestParams) -> JsonFuture<'a>;
}

/// Username and password used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Bundle a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Account name.
    pub fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Transport settings for [`HttpStashClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Accept self-signed and otherwise untrusted TLS certificates.
    pub accept_invalid_certs: bool,
    /// Per-request timeout. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    /// User agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            accept_invalid_certs: true,
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Reqwest-backed repository server client.
#[derive(Debug, Clone)]
pub struct HttpStashClient {
    base_url: String,
    credentials: Credentials,
    client: Client,
}

impl HttpStashClient {
    /// Build a client with the default transport settings.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        Self::with_config(base_url, credentials, ClientConfig::default())
    }

    /// Build a client with explicit transport settings.
    pub fn with_config(
        base_url: &str,
        credentials: Credentials,
        config: ClientConfig,
    ) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        let mut builder = Client::builder()
            .user_agent(config.user_agent)
            .danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| StashError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self {
            base_url,
            credentials,
            client,
        })
    }

    /// Server base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, endpoint: Endpoint, params: &RequestParams) -> Result<Value> {
        let url = endpoint.render(&self.base_url, params)?;
        debug!("GET {url} [{}]", endpoint.as_str());
        let response = self
            .client
            .get(&url)
            .basic_auth(self.credentials.username(), Some(self.credentials.password()))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                StashError::Transport(format!("{} request failed: {err}", endpoint.as_str()))
            })?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StashError::Authentication(format!(
                "server returned {status} for {url}"
            )));
        }
        if !status.is_success() {
            debug!("{} returned {status}", endpoint.as_str());
        }
        let body = response.text().await.map_err(|err| {
            StashError::Transport(format!("{} body read failed: {err}", endpoint.as_str()))
        })?;
        parse_body(endpoint, status, &body)
    }
}

impl StashClient for HttpStashClient {
    fn get_json<'a>(&'a self, endpoint: Endpoint, params: &'a RequestParams) -> JsonFuture<'a> {
        Box::pin(self.fetch(endpoint, params))
    }
}

/// Validate the server URL and strip trailing slashes.
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(StashError::Other("server url is required".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| StashError::Other(format!("invalid server url {trimmed}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(StashError::Other(format!(
            "unsupported server url scheme: {}",
            parsed.scheme()
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn parse_body(endpoint: Endpoint, status: StatusCode, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|err| {
        StashError::MalformedResponse(format!(
            "{} returned a non-JSON body ({status}): {err}",
            endpoint.as_str()
        ))
    })
}
