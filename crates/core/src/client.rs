//! Request execution
//!
//! [`Client`] turns an operation name plus parameters into exactly one HTTP
//! call and surfaces provider-reported errors as [`Error::Api`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::{Config, DataRegion};
use crate::error::{Error, Result};
use crate::parser::EntityParser;
use crate::time::TimeNormalizer;
use crate::transport::{Form, HttpRequest, HttpTransport, Method, Params};

/// The only operation that writes a request body
pub const UPLOAD_OPERATION: &str = "uploadfile";

/// pCloud API client
pub struct Client {
    config: Config,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(config: Config, transport: impl HttpTransport + 'static) -> Self {
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: Config, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the explicit configuration and drop every memoized value
    ///
    /// Takes `&mut self`, so it cannot run while requests borrow the client.
    pub fn configure(
        &mut self,
        access_token: Option<String>,
        data_region: Option<DataRegion>,
        timeout_seconds: Option<u64>,
    ) {
        self.config
            .configure(access_token, data_region, timeout_seconds);
    }

    /// Verb used for an operation
    pub fn method_for(operation: &str) -> Method {
        if operation == UPLOAD_OPERATION {
            Method::Post
        } else {
            Method::Get
        }
    }

    /// Parser that presents timestamps in the configured time zone
    pub fn parser(&self) -> Result<EntityParser> {
        let time_zone = self.config.resolve_time_zone()?;
        Ok(EntityParser::new(TimeNormalizer::new(time_zone)))
    }

    /// Call `operation` with query parameters only
    pub async fn get(&self, operation: &str, query: Params) -> Result<Value> {
        self.execute(operation, query, Form::new()).await
    }

    /// Issue one request for `operation`
    ///
    /// Empty `query` or `body` are left off the request entirely. Any
    /// response carrying a top-level `error` field fails with [`Error::Api`].
    pub async fn execute(&self, operation: &str, query: Params, body: Form) -> Result<Value> {
        let token = self.config.resolve_access_token()?;
        let timeout = self.config.resolve_timeout_seconds()?;
        let host = self.config.resolve_host()?;

        let url = Url::parse(&format!("https://{host}/{operation}"))
            .map_err(|e| Error::Config(format!("Invalid pCloud API host '{host}': {e}")))?;
        let method = Self::method_for(operation);

        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: vec![("Authorization".to_string(), format!("Bearer {token}"))],
            timeout: Duration::from_secs(timeout),
            query: (!query.is_empty()).then_some(query),
            body: (!body.is_empty()).then_some(body),
        };

        tracing::debug!(operation, %method, %host, "Dispatching pCloud request");
        let raw = self.transport.send(request).await?;

        let response: Value = serde_json::from_str(&raw).map_err(|e| {
            Error::InvalidResponse(format!("{operation} returned a non-JSON body: {e}"))
        })?;

        // `null` and `false` mean no error
        if let Some(error) = response
            .get("error")
            .filter(|e| !matches!(e, Value::Null | Value::Bool(false)))
        {
            let message = match error {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            tracing::warn!(operation, error = %message, "pCloud reported an error");
            return Err(Error::Api(message));
        }

        Ok(response)
    }
}
