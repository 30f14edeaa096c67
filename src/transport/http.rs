//! reqwest-backed transport.

use std::sync::Arc;

use log::debug;
use url::Url;

use super::{HttpRequest, HttpResponse, Method, Transport};
use crate::config::Config;
use crate::error_handling::{InitializationError, TransportError};
use crate::initialization::init_client;

/// Transport sending requests with a shared `reqwest::Client`.
///
/// The client is built with redirects disabled and without a cookie store;
/// paths are resolved against the configured base URL.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Arc<reqwest::Client>,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a transport for the base URL and client settings in `config`.
    ///
    /// # Errors
    ///
    /// Returns `InitializationError::InvalidBaseUrl` if the base URL does not
    /// parse, or `HttpClientError` if the client cannot be built.
    pub fn new(config: &Config) -> Result<Self, InitializationError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|_| InitializationError::InvalidBaseUrl(config.base_url.clone()))?;
        let client = init_client(config)?;
        Ok(Self { client, base_url })
    }

    /// Creates a transport around an existing client.
    pub fn with_client(client: Arc<reqwest::Client>, base_url: Url) -> Self {
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|_| TransportError::InvalidUrl(request.path.clone()))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url.clone()),
            Method::Post => self.client.post(url.clone()),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(form) = &request.form {
            builder = builder.form(form);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;
        debug!(
            "{:?} {} -> {} ({} bytes)",
            request.method,
            url,
            status,
            body.len()
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
