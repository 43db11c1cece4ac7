use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as HttpClient, Method};
use serde_json::Value;
use tracing::{debug, warn};

use super::models::{AuthHeaderNames, ProviderError, FIND_BY_USER_PATH, SEARCH_PATH};
use super::signing::{signature_preview, RequestSigner};
use crate::config::ProviderConfig;
use crate::utils::errors::shorten_for_log;
use crate::utils::page::UpstreamPage;

/// A request that has been signed and must be sent exactly as built
#[derive(Debug)]
pub struct SignedRequest {
    pub method: Method,
    /// Signed path, prefix included
    pub path: String,
    pub query: Option<String>,
    /// Exact bytes covered by the signature
    pub body: String,
    pub timestamp: String,
    pub signature: String,
    pub headers: HeaderMap,
}

/// HTTP client for the payment provider's transaction API
///
/// Every call carries the API key, a millisecond timestamp and an HMAC
/// signature over `timestamp + METHOD + path + body`.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    http_client: HttpClient,
    api_key: String,
    signer: RequestSigner,
    base_url: String,
    path_prefix: String,
    header_names: AuthHeaderNames,
}

impl ProviderClient {
    /// Create a client from provider settings
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            signer: RequestSigner::new(config.api_secret.clone()),
            base_url: config.base_url.clone(),
            path_prefix: config.path_prefix.clone(),
            header_names: AuthHeaderNames::with_prefix(&config.header_prefix),
        })
    }

    /// GET /transaction/find-by-user?p={page}
    ///
    /// Lists the current user's transactions. `page` is the provider's
    /// 0-based index.
    pub async fn find_by_user(&self, page: UpstreamPage) -> Result<Value, ProviderError> {
        let request = self.signed_request(
            Method::GET,
            FIND_BY_USER_PATH,
            Some(format!("p={}", page)),
            String::new(),
            &current_timestamp(),
        )?;
        self.send(request).await
    }

    /// POST /transaction/search
    ///
    /// `body` is the already serialized criteria object. It is signed and sent
    /// byte for byte.
    pub async fn search(&self, body: String) -> Result<Value, ProviderError> {
        let request = self.signed_request(
            Method::POST,
            SEARCH_PATH,
            None,
            body,
            &current_timestamp(),
        )?;
        self.send(request).await
    }

    /// Build the header set and signature for one call
    pub fn signed_request(
        &self,
        method: Method,
        endpoint: &str,
        query: Option<String>,
        body: String,
        timestamp: &str,
    ) -> Result<SignedRequest, ProviderError> {
        let path = format!("{}{}", self.path_prefix, endpoint);
        let signature = self.signer.sign(timestamp, method.as_str(), &path, &body);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        insert_header(&mut headers, &self.header_names.key, &self.api_key)?;
        insert_header(&mut headers, &self.header_names.timestamp, timestamp)?;
        insert_header(&mut headers, &self.header_names.sign, &signature)?;

        Ok(SignedRequest {
            method,
            path,
            query,
            body,
            timestamp: timestamp.to_string(),
            signature,
            headers,
        })
    }

    async fn send(&self, request: SignedRequest) -> Result<Value, ProviderError> {
        let url = match &request.query {
            Some(query) => format!("{}{}?{}", self.base_url, request.path, query),
            None => format!("{}{}", self.base_url, request.path),
        };

        debug!(
            method = %request.method,
            path = %request.path,
            query = request.query.as_deref().unwrap_or(""),
            timestamp = %request.timestamp,
            signature = %signature_preview(&request.signature),
            "Calling provider API"
        );

        let mut builder = self
            .http_client
            .request(request.method.clone(), &url)
            .headers(request.headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::Request(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                path = %request.path,
                "Provider API error response: {}",
                shorten_for_log(&body)
            );
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Deserialization(format!("Failed to parse response: {}", e)))
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ProviderError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ProviderError::Request(format!("Invalid header name {}: {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Request(format!("Invalid value for header {}: {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}

/// Milliseconds since the Unix epoch
fn current_timestamp() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiSecret;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    /// Recomputes `API-SIGN` from what actually arrived on the wire
    struct SignatureMatchesWire {
        signer: RequestSigner,
    }

    impl SignatureMatchesWire {
        fn new(secret: &str) -> Self {
            Self {
                signer: RequestSigner::new(ApiSecret::new(secret)),
            }
        }
    }

    fn header_value(request: &Request, name: &str) -> Option<String> {
        request
            .headers
            .iter()
            .find(|(key, _)| key.as_str().eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.iter().next())
            .map(|value| value.as_str().to_string())
    }

    impl Match for SignatureMatchesWire {
        fn matches(&self, request: &Request) -> bool {
            let (Some(timestamp), Some(signature)) = (
                header_value(request, "API-TIMESTAMP"),
                header_value(request, "API-SIGN"),
            ) else {
                return false;
            };
            let body = String::from_utf8_lossy(&request.body);
            let expected = self.signer.sign(
                &timestamp,
                &request.method.to_string(),
                request.url.path(),
                &body,
            );
            expected == signature
        }
    }

    fn test_config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            api_key: "test-key".to_string(),
            api_secret: ApiSecret::new("test-secret"),
            base_url: base_url.to_string(),
            path_prefix: String::new(),
            header_prefix: String::new(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_signed_request_headers() {
        let client = ProviderClient::new(&test_config("http://localhost")).unwrap();
        let request = client
            .signed_request(
                Method::GET,
                FIND_BY_USER_PATH,
                Some("p=0".to_string()),
                String::new(),
                "1700000000000",
            )
            .unwrap();

        assert_eq!(request.path, "/transaction/find-by-user");
        assert_eq!(request.headers["API-KEY"], "test-key");
        assert_eq!(request.headers["API-TIMESTAMP"], "1700000000000");
        assert_eq!(
            request.headers["API-SIGN"],
            "c1n/FpCoVMmNWH3+VkqvHQPLtZFP2QPswbujRrre6ug="
        );
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_signed_request_covers_exact_body() {
        let client = ProviderClient::new(&test_config("http://localhost")).unwrap();
        let body = r#"{"page":1,"query":"coffee"}"#.to_string();
        let request = client
            .signed_request(Method::POST, SEARCH_PATH, None, body.clone(), "1700000000000")
            .unwrap();

        assert_eq!(request.body, body);
        assert_eq!(request.signature, "mZLKBCb1DkCmjbZoNhu5rbchR0HMcfhdR4B6vYZrdeY=");
    }

    #[test]
    fn test_prefixes_apply_to_headers_and_signed_path() {
        let mut config = test_config("http://localhost");
        config.path_prefix = "/api/en".to_string();
        config.header_prefix = "ACME-".to_string();
        let client = ProviderClient::new(&config).unwrap();

        let request = client
            .signed_request(Method::GET, FIND_BY_USER_PATH, None, String::new(), "1")
            .unwrap();
        assert_eq!(request.path, "/api/en/transaction/find-by-user");
        assert!(request.headers.contains_key("ACME-API-SIGN"));

        let expected = RequestSigner::new(ApiSecret::new("test-secret")).sign(
            "1",
            "GET",
            "/api/en/transaction/find-by-user",
            "",
        );
        assert_eq!(request.signature, expected);
    }

    #[tokio::test]
    async fn test_find_by_user_sends_signed_get() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/find-by-user"))
            .and(query_param("p", "2"))
            .and(header("API-KEY", "test-key"))
            .and(header_exists("API-TIMESTAMP"))
            .and(header_exists("API-SIGN"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "id": "t1" }],
                "total": 1
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        let body = client.find_by_user(UpstreamPage::new(2)).await.unwrap();
        assert_eq!(body["total"], 1);
        assert_eq!(body["data"][0]["id"], "t1");
    }

    #[tokio::test]
    async fn test_search_sends_body_verbatim() {
        let mock_server = MockServer::start().await;
        let body = r#"{"page":1,"query":"coffee"}"#;
        Mock::given(method("POST"))
            .and(path("/transaction/search"))
            .and(body_string(body))
            .and(header_exists("API-SIGN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        let response = client.search(body.to_string()).await.unwrap();
        assert_eq!(response, json!({ "data": [] }));
    }

    #[tokio::test]
    async fn test_wire_signature_matches_received_get() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/en/transaction/find-by-user"))
            .and(query_param("p", "0"))
            .and(SignatureMatchesWire::new("test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut config = test_config(&mock_server.uri());
        config.path_prefix = "/api/en".to_string();
        let client = ProviderClient::new(&config).unwrap();
        client.find_by_user(UpstreamPage::new(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_wire_signature_matches_received_post() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transaction/search"))
            .and(SignatureMatchesWire::new("test-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        client
            .search(r#"{"page":2,"query":"coffee","sender":"acc-1"}"#.to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wire_signature_rejects_other_secret() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(SignatureMatchesWire::new("some-other-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.search("{}".to_string()).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_error_status_is_classified() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/transaction/find-by-user"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.find_by_user(UpstreamPage::new(0)).await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(err.upstream_body(), Some("slow down"));
    }

    #[tokio::test]
    async fn test_non_json_success_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&mock_server)
            .await;

        let client = ProviderClient::new(&test_config(&mock_server.uri())).unwrap();
        let err = client.find_by_user(UpstreamPage::new(0)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Deserialization(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider() {
        // Nothing listens on port 9 locally
        let client = ProviderClient::new(&test_config("http://127.0.0.1:9")).unwrap();
        let err = client.find_by_user(UpstreamPage::new(0)).await.unwrap_err();
        assert!(matches!(err, ProviderError::Request(_)));
        assert_eq!(err.status(), None);
    }
}
