use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::Response;
use warp::{Rejection, Reply};

use crate::models::transaction::SearchParams;
use crate::services::proxy_service::{ProxyError, SignedProxy};
use crate::services::transaction_service;
use crate::utils::page::UpstreamPage;

/// Malformed inbound request, answered with 400
#[derive(Debug)]
pub struct InvalidRequest(pub String);

impl warp::reject::Reject for InvalidRequest {}

/// GET /transactions?p=<n>
///
/// `p` is the provider's 0-based page index and defaults to 0. `p` must leave
/// room for the 1-based `page` echoed back, so `u32::MAX` is rejected.
pub async fn list_handler(
    query: HashMap<String, String>,
    proxy: Arc<SignedProxy>,
) -> Result<Response, Rejection> {
    let page = parse_upstream_page(query.get("p").map(String::as_str))
        .map_err(|e| warp::reject::custom(InvalidRequest(e)))?;

    let span = info_span!("list", request_id = %Uuid::new_v4(), p = page.get());
    async move {
        debug!("GET /transactions");
        match proxy.forward_list(page).await {
            Ok(body) => Ok(warp::reply::json(&body).into_response()),
            Err(e) => Ok(proxy_failure(&e)),
        }
    }
    .instrument(span)
    .await
}

/// POST /transactions
///
/// Body must be a JSON object; it is forwarded to the provider's search.
pub async fn search_handler(body: Bytes, proxy: Arc<SignedProxy>) -> Result<Response, Rejection> {
    let criteria: Value = serde_json::from_slice(&body)
        .map_err(|e| warp::reject::custom(InvalidRequest(format!("Invalid JSON: {}", e))))?;
    if !criteria.is_object() {
        return Err(warp::reject::custom(InvalidRequest(
            "Search criteria must be a JSON object".to_string(),
        )));
    }

    let span = info_span!("search", request_id = %Uuid::new_v4());
    async move {
        debug!("POST /transactions");
        match proxy.forward_search(&criteria).await {
            Ok(body) => Ok(warp::reply::json(&body).into_response()),
            Err(e) => Ok(proxy_failure(&e)),
        }
    }
    .instrument(span)
    .await
}

/// GET /transactions/history?page=<n>&search=...
///
/// Normalized page for the dashboard; `page` is 1-based.
pub async fn history_handler(
    params: SearchParams,
    proxy: Arc<SignedProxy>,
) -> Result<Response, Rejection> {
    let span = info_span!(
        "history",
        request_id = %Uuid::new_v4(),
        page = params.page.get(),
        search = params.has_filters()
    );
    async move {
        debug!("GET /transactions/history");
        match transaction_service::load_transactions(&proxy, &params).await {
            Ok(page) => Ok(warp::reply::json(&page).into_response()),
            Err(e) => Ok(proxy_failure(&e)),
        }
    }
    .instrument(span)
    .await
}

/// Every proxy failure is a 500 with `{error, details, upstream_status?}`
fn proxy_failure(err: &ProxyError) -> Response {
    warp::reply::with_status(
        warp::reply::json(&err.to_error_body()),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .into_response()
}

fn parse_upstream_page(raw: Option<&str>) -> Result<UpstreamPage, String> {
    match raw.map(str::trim) {
        None | Some("") => Ok(UpstreamPage::new(0)),
        Some(value) => match value.parse::<u32>() {
            Ok(index) if index < u32::MAX => Ok(UpstreamPage::new(index)),
            Ok(_) => Err(format!("p must be below {}, got '{}'", u32::MAX, value)),
            Err(_) => Err(format!("p must be a non-negative integer, got '{}'", value)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_upstream_page() {
        assert_eq!(parse_upstream_page(None), Ok(UpstreamPage::new(0)));
        assert_eq!(parse_upstream_page(Some("")), Ok(UpstreamPage::new(0)));
        assert_eq!(parse_upstream_page(Some("4")), Ok(UpstreamPage::new(4)));
        assert!(parse_upstream_page(Some("-1")).is_err());
        assert!(parse_upstream_page(Some("two")).is_err());
        assert_eq!(
            parse_upstream_page(Some("4294967294")),
            Ok(UpstreamPage::new(u32::MAX - 1))
        );
        assert!(parse_upstream_page(Some("4294967295")).is_err());
    }
}
