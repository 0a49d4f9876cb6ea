//! REST API client for controllers
//!
//! Controllers expose a JSON management API on a dedicated HTTPS port.
//! Login hands back a session token pair (UIDARUBA plus a CSRF token);
//! every show command carries both.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use aps_core::error::FetchError;
use aps_core::traits::ConvertStatusSource;
use aps_core::Credentials;

/// Header carrying the CSRF token on authenticated requests
const CSRF_HEADER: &str = "X-CSRF-Token";

/// Upper bound on a single API request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Show command that reports AP conversion progress
pub const SHOW_AP_CONVERT_STATUS: &str = "show ap convert-status";

/// HTTP client for the controller management API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    port: u16,
}

impl ApiClient {
    /// Build a client for the given API port
    pub fn new(port: u16) -> Result<Self, FetchError> {
        // Controllers ship self-signed certificates
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .cookie_store(true)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { http, port })
    }

    /// Log in to one controller and return an authenticated session
    pub async fn login(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<ApiSession, FetchError> {
        let base = format!("https://{}:{}", address, self.port);
        let url = format!("{}/v1/api/login", base);

        debug!(address, "logging in to controller API");
        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                address: address.to_string(),
                detail: e.to_string(),
            })?;

        let payload: Value = response.json().await.map_err(|e| FetchError::Payload {
            address: address.to_string(),
            detail: format!("login response was not JSON: {}", e),
        })?;

        let (uidaruba, csrf_token) = session_tokens(address, &payload)?;
        Ok(ApiSession {
            http: self.http.clone(),
            base,
            address: address.to_string(),
            uidaruba,
            csrf_token,
        })
    }
}

/// An authenticated API session on one controller
#[derive(Debug, Clone)]
pub struct ApiSession {
    http: reqwest::Client,
    base: String,
    address: String,
    uidaruba: String,
    csrf_token: String,
}

impl ApiSession {
    /// Controller this session is authenticated against
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Run a CLI show command through the API and return its JSON payload
    pub async fn show_command(&self, command: &str) -> Result<Value, FetchError> {
        let url = showcommand_url(&self.base, command, &self.uidaruba);
        debug!(address = %self.address, command, "running show command");

        let response = self
            .http
            .get(&url)
            .header(CSRF_HEADER, self.csrf_token.as_str())
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                address: self.address.clone(),
                detail: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| FetchError::Transport {
                address: self.address.clone(),
                detail: e.to_string(),
            })?;

        response.json().await.map_err(|e| FetchError::Payload {
            address: self.address.clone(),
            detail: format!("show command response was not JSON: {}", e),
        })
    }
}

/// Build a showcommand URL.
///
/// The API expects spaces in the command encoded as '+'.
fn showcommand_url(base: &str, command: &str, uidaruba: &str) -> String {
    format!(
        "{}/v1/configuration/showcommand?command={}&UIDARUBA={}",
        base,
        command.replace(' ', "+"),
        uidaruba
    )
}

/// Pull the session token pair out of a login response.
///
/// A successful login reports `_global_result.status` as the string "0"
/// and carries both UIDARUBA and the CSRF token alongside it.
fn session_tokens(address: &str, payload: &Value) -> Result<(String, String), FetchError> {
    let global = payload
        .get("_global_result")
        .ok_or_else(|| FetchError::Payload {
            address: address.to_string(),
            detail: "login response missing _global_result".to_string(),
        })?;

    let status = global.get("status").and_then(Value::as_str).unwrap_or("");
    if status != "0" {
        return Err(FetchError::LoginRejected {
            address: address.to_string(),
        });
    }

    let uidaruba = global.get("UIDARUBA").and_then(Value::as_str);
    let csrf_token = global.get(CSRF_HEADER).and_then(Value::as_str);
    match (uidaruba, csrf_token) {
        (Some(uidaruba), Some(csrf_token)) => Ok((uidaruba.to_string(), csrf_token.to_string())),
        _ => Err(FetchError::MissingToken {
            address: address.to_string(),
        }),
    }
}

/// Conversion status source backed by the REST API.
///
/// Controller API sessions expire well inside a monitoring run, so each
/// poll authenticates from scratch.
#[derive(Debug, Clone)]
pub struct RestStatusSource {
    client: ApiClient,
}

impl RestStatusSource {
    /// Create a status source on top of an API client
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConvertStatusSource for RestStatusSource {
    async fn fetch_convert_status(
        &self,
        address: &str,
        credentials: &Credentials,
    ) -> Result<Value, FetchError> {
        let session = self.client.login(address, credentials).await?;
        session.show_command(SHOW_AP_CONVERT_STATUS).await
    }
}
