//! Inbound HTTP surface
//!
//! - `GET  /transactions?p=<n>`        raw list, `page` set to `n + 1`
//! - `POST /transactions`              raw search, body forwarded verbatim
//! - `GET  /transactions/history?...`  normalized page for the dashboard
//! - `GET  /health`

mod handlers;

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use tracing::{error, info};
use warp::http::{Method, StatusCode};
use warp::{Filter, Rejection, Reply};

use crate::config::{Config, ConfigError};
use crate::models::transaction::SearchParams;
use crate::services::proxy_service::SignedProxy;
use crate::utils::errors::ErrorBody;
use handlers::InvalidRequest;

/// Largest accepted search criteria body
const MAX_SEARCH_BODY_BYTES: u64 = 16 * 1024;

/// HTTP server fronting the signed proxy
pub struct ApiServer {
    config: Arc<Config>,
    proxy: Arc<SignedProxy>,
}

impl ApiServer {
    pub fn new(config: Arc<Config>, proxy: SignedProxy) -> Self {
        Self {
            config,
            proxy: Arc::new(proxy),
        }
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<(), ConfigError> {
        let addr = self.config.listen_addr()?;
        info!("Starting API server on {}", addr);

        warp::serve(self.routes()).run(addr).await;
        Ok(())
    }

    pub(crate) fn routes(
        &self,
    ) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

        let history = warp::path!("transactions" / "history")
            .and(warp::get())
            .and(warp::query::<SearchParams>())
            .and(with_proxy(self.proxy.clone()))
            .and_then(handlers::history_handler);

        let list = warp::path("transactions")
            .and(warp::path::end())
            .and(warp::get())
            .and(warp::query::<HashMap<String, String>>())
            .and(with_proxy(self.proxy.clone()))
            .and_then(handlers::list_handler);

        let search = warp::path("transactions")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::content_length_limit(MAX_SEARCH_BODY_BYTES))
            .and(warp::body::bytes())
            .and(with_proxy(self.proxy.clone()))
            .and_then(handlers::search_handler);

        health
            .or(history)
            .or(list)
            .or(search)
            .with(cors())
            .recover(handle_rejection)
    }
}

fn with_proxy(
    proxy: Arc<SignedProxy>,
) -> impl Filter<Extract = (Arc<SignedProxy>,), Error = Infallible> + Clone {
    warp::any().map(move || proxy.clone())
}

fn cors() -> warp::cors::Builder {
    warp::cors()
        .allow_any_origin()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec!["content-type"])
}

/// Turn rejections into `{error, details}` bodies
async fn handle_rejection(rej: Rejection) -> Result<impl Reply, Infallible> {
    let (status, body) = if let Some(err) = rej.find::<InvalidRequest>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new("Invalid request", err.0.clone()))
    } else if let Some(err) = rej.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, ErrorBody::new("Invalid request", err.to_string()))
    } else if rej.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorBody::new(
                "Invalid request",
                format!("Search body exceeds {} bytes", MAX_SEARCH_BODY_BYTES),
            ),
        )
    } else if rej.find::<warp::reject::LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            ErrorBody::new("Invalid request", "A content-length header is required"),
        )
    } else if rej.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorBody::new("Not found", "Endpoint not found"))
    } else if rej.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorBody::new("Method not allowed", "Method not allowed"),
        )
    } else {
        error!("Unhandled rejection: {:?}", rej);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal server error", "Internal server error"),
        )
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
