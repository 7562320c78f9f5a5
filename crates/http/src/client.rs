//! reqwest transport
//!
//! Wraps `reqwest::Client` and implements the HttpTransport trait from pcloud-core.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pcloud_core::config::DEFAULT_TIMEOUT_SECONDS;
use pcloud_core::{Error, Form, HttpRequest, HttpTransport, Method, Result};
use reqwest::multipart;

#[derive(Debug, Clone)]
enum Clients {
    /// One client per timeout value, each bounding connect and read separately
    PerTimeout(Arc<Mutex<HashMap<Duration, reqwest::Client>>>),
    /// Caller-supplied client; the timeout becomes a whole-request deadline
    Fixed(reqwest::Client),
}

/// HTTP transport backed by reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    clients: Clients,
}

impl ReqwestTransport {
    /// Create a transport whose timeout bounds the connect phase and the
    /// read phase independently
    pub fn new() -> Result<Self> {
        let transport = Self {
            clients: Clients::PerTimeout(Arc::new(Mutex::new(HashMap::new()))),
        };
        transport.client_for(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS))?;
        Ok(transport)
    }

    /// Use an existing reqwest client (proxies, custom TLS, ...)
    ///
    /// Its own connect and read settings are left alone, so the request
    /// timeout is applied as a deadline for the whole call.
    pub fn with_client(inner: reqwest::Client) -> Self {
        Self {
            clients: Clients::Fixed(inner),
        }
    }

    fn client_for(&self, timeout: Duration) -> Result<reqwest::Client> {
        let cache = match &self.clients {
            Clients::Fixed(client) => return Ok(client.clone()),
            Clients::PerTimeout(cache) => cache,
        };

        let mut cache = cache
            .lock()
            .map_err(|_| Error::Network("HTTP client cache is poisoned".to_string()))?;
        if let Some(client) = cache.get(&timeout) {
            return Ok(client.clone());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("pcloud-client/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to build HTTP client: {e}")))?;
        tracing::debug!(timeout_secs = timeout.as_secs(), "Built HTTP client");
        cache.insert(timeout, client.clone());
        Ok(client)
    }

    /// Translate a core request into a reqwest request
    fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let client = self.client_for(request.timeout)?;
        let mut builder = client.request(method, request.url.as_str());
        if let Clients::Fixed(_) = self.clients {
            builder = builder.timeout(request.timeout);
        }

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(query) = &request.query {
            let pairs: Vec<(&str, &str)> = query.iter().collect();
            builder = builder.query(&pairs);
        }

        if let Some(body) = request.body {
            builder = builder.multipart(to_multipart(body));
        }

        Ok(builder)
    }

    /// Format a reqwest error into a detailed error message
    fn format_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            format!("Connection failed: {error}")
        } else if error.is_body() || error.is_decode() {
            format!("Failed to read response body: {error}")
        } else {
            error.to_string()
        }
    }
}

fn to_multipart(body: Form) -> multipart::Form {
    let mut form = multipart::Form::new();
    for (key, value) in body.fields.iter() {
        form = form.text(key.to_string(), value.to_string());
    }
    for file in body.files {
        let part = multipart::Part::bytes(file.content.to_vec()).file_name(file.filename);
        form = form.part(file.field, part);
    }
    form
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<String> {
        let url = request.url.clone();
        let response = self
            .build(request)?
            .send()
            .await
            .map_err(|e| Error::Network(Self::format_error(&e)))?;

        // Status codes are not interpreted; the JSON body decides success.
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(Self::format_error(&e)))?;

        tracing::debug!(%url, status = status.as_u16(), bytes = body.len(), "pCloud response received");
        Ok(body)
    }
}
