//! Signed proxy operations
//!
//! Forwards list and search calls to the provider with signed headers and
//! relays the JSON body back. The signing secret never leaves this layer.

use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::provider::{ProviderClient, ProviderError};
use crate::utils::errors::{shorten_for_log, ErrorBody};
use crate::utils::page::UpstreamPage;

/// Which proxy operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOperation {
    List,
    Search,
}

impl ProxyOperation {
    pub fn label(self) -> &'static str {
        match self {
            ProxyOperation::List => "Failed to fetch transactions",
            ProxyOperation::Search => "Failed to search transactions",
        }
    }
}

impl fmt::Display for ProxyOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("{operation}: {source}")]
pub struct ProxyError {
    pub operation: ProxyOperation,
    #[source]
    pub source: ProviderError,
}

impl ProxyError {
    fn new(operation: ProxyOperation, source: ProviderError) -> Self {
        Self { operation, source }
    }

    /// Caller-facing body. Carries the upstream status but never its body.
    pub fn to_error_body(&self) -> ErrorBody {
        let details = match self.source.status() {
            Some(status) => format!("Upstream request failed with status {}: {}", status, self.source),
            None => self.source.to_string(),
        };
        ErrorBody {
            error: self.operation.label().to_string(),
            details,
            upstream_status: self.source.status(),
        }
    }
}

/// Stateless forwarder; safe to share across concurrent requests
#[derive(Debug, Clone)]
pub struct SignedProxy {
    client: ProviderClient,
    search_echo_page: bool,
}

impl SignedProxy {
    pub fn new(client: ProviderClient, search_echo_page: bool) -> Self {
        Self {
            client,
            search_echo_page,
        }
    }

    /// Forward a list request for upstream page `page`
    ///
    /// The returned body gets a `page` field holding the caller's 1-based
    /// number for the same page.
    pub async fn forward_list(&self, page: UpstreamPage) -> Result<Value, ProxyError> {
        let body = self.client.find_by_user(page).await.map_err(|e| {
            warn!(
                upstream_page = page.get(),
                upstream_body = %upstream_excerpt(&e),
                "List request failed: {}",
                e
            );
            ProxyError::new(ProxyOperation::List, e)
        })?;

        let caller_page = page.to_caller();
        debug!(upstream_page = page.get(), caller_page = caller_page.get(), "List request succeeded");
        Ok(with_page(body, Value::from(caller_page.get())))
    }

    /// Forward search criteria verbatim
    ///
    /// The body is relayed unchanged unless `search_echo_page` is set, in which
    /// case the criteria's own `page` value is copied into the response.
    pub async fn forward_search(&self, criteria: &Value) -> Result<Value, ProxyError> {
        let serialized = criteria.to_string();
        let body = self.client.search(serialized).await.map_err(|e| {
            warn!(upstream_body = %upstream_excerpt(&e), "Search request failed: {}", e);
            ProxyError::new(ProxyOperation::Search, e)
        })?;

        debug!("Search request succeeded");
        match criteria.get("page") {
            Some(page) if self.search_echo_page => Ok(with_page(body, page.clone())),
            _ => Ok(body),
        }
    }
}

/// Shortened upstream body for log lines, empty when the provider never answered
fn upstream_excerpt(err: &ProviderError) -> String {
    err.upstream_body().map(shorten_for_log).unwrap_or_default()
}

/// Set `page` on an object body; other bodies are wrapped as `{data, page}`
fn with_page(body: Value, page: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            map.insert("page".to_string(), page);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert("data".to_string(), other);
            map.insert("page".to_string(), page);
            Value::Object(map)
        }
    }
}
