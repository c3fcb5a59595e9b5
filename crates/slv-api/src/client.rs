//! ---
//! slv_section: "02-remote-api"
//! slv_subsection: "module"
//! slv_type: "source"
//! slv_scope: "code"
//! slv_description: "Request dispatch over HTTP basic authentication."
//! slv_version: "v0.0.0-prealpha"
//! slv_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::operation::{Format, HttpMethod, Operation};
use crate::params::ParameterSet;
use crate::{ApiError, Result};

/// Static identifier/secret pair used for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
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

/// Fully resolved request handed to a [`Transport`].
#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub method: HttpMethod,
    pub url: String,
    pub credentials: Credentials,
    /// Sent as the query string for GET and as a form body for POST.
    pub params: ParameterSet,
}

/// Verb-agnostic result of a call. Status codes are not interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body parsed as structured data.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(ApiError::Decode)
    }

    /// Body as markup text.
    pub fn text(&self) -> &str {
        &self.body
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A completed call: the response plus the exact parameters that produced it.
#[derive(Debug, Clone)]
pub struct Dispatched {
    pub operation: Operation,
    pub format: Format,
    pub params: ParameterSet,
    pub response: RawResponse,
}

/// Network seam used by [`SlvClient`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Perform the request once. Implementations must not retry.
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport, optionally bounding every request by `timeout`.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutgoingRequest) -> Result<RawResponse> {
        let pairs = request.params.to_pairs();
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url).query(&pairs),
            HttpMethod::Post => self.client.post(&request.url).form(&pairs),
        };
        let response = builder
            .basic_auth(
                &request.credentials.username,
                Some(&request.credentials.password),
            )
            .send()
            .await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Dispatcher for SLV operations against one installation.
#[derive(Clone)]
pub struct SlvClient {
    base_url: String,
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl SlvClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            transport,
        }
    }

    /// Client using [`ReqwestTransport`].
    pub fn with_reqwest(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::new(base_url, credentials, Arc::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue `operation` requesting the `format` serialization.
    ///
    /// `format` is validated before anything touches the network. Transport
    /// failures propagate unchanged; non-2xx responses are returned as-is.
    pub async fn call(&self, operation: Operation, format: &str) -> Result<Dispatched> {
        let format: Format = format.parse()?;
        let params = operation.parameters(format);
        let request = OutgoingRequest {
            method: operation.http_method(),
            url: operation.url(&self.base_url),
            credentials: self.credentials.clone(),
            params: params.clone(),
        };
        info!(
            operation = operation.method_name(),
            method = %request.method,
            pairs = params.len(),
            "calling slv"
        );
        let response = self.transport.send(request).await?;
        debug!(
            operation = operation.method_name(),
            status = response.status,
            bytes = response.body.len(),
            "slv responded"
        );
        Ok(Dispatched {
            operation,
            format,
            params,
            response,
        })
    }
}

impl fmt::Debug for SlvClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlvClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("operator", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("operator"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = RawResponse {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: "[]".into(),
        };
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert!(response.is_success());
    }

    #[test]
    fn json_decode_failure_is_reported() {
        let response = RawResponse {
            status: 500,
            headers: Vec::new(),
            body: "<html>oops</html>".into(),
        };
        assert!(!response.is_success());
        assert!(matches!(
            response.json::<serde_json::Value>(),
            Err(ApiError::Decode(_))
        ));
    }
}
