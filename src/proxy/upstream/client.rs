use std::sync::Arc;

use axum::http::StatusCode;
use reqwest::{header, Client, Method};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::proxy::token_manager::TokenManager;

/// Executes proxied requests against the upstream REST API.
///
/// Every call terminates in a `(body, status)` pair; nothing escapes as a
/// panic or error. The client carries the 30-second timeout and TLS policy
/// set at construction.
pub struct UpstreamClient {
    http: Client,
    token_manager: Arc<TokenManager>,
}

impl UpstreamClient {
    pub fn new(http: Client, token_manager: Arc<TokenManager>) -> Self {
        Self {
            http,
            token_manager,
        }
    }

    /// Forward a request to the upstream API, attaching the session's bearer
    /// token when `require_auth` is set, and normalize the response.
    pub async fn execute(
        &self,
        session_id: &str,
        method: Method,
        url: &str,
        payload: Option<&Value>,
        query: Option<&[(String, String)]>,
        require_auth: bool,
    ) -> (Value, StatusCode) {
        let mut request = self
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");

        if require_auth {
            // Short-circuit before touching upstream when no token can be had
            if !self.token_manager.validate_token(session_id).await {
                return auth_failure();
            }
            let Some(record) = self.token_manager.current(session_id) else {
                return auth_failure();
            };
            request = request.bearer_auth(record.access_token);
        }

        if let Some(body) = payload {
            request = request.json(body);
        }
        if let Some(params) = query {
            request = request.query(params);
        }

        info!("Forwarding {} {}", method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return map_transport_error(e),
        };

        let status = response.status();
        info!("Upstream responded {} for {} {}", status.as_u16(), method, url);

        if status == StatusCode::OK {
            match response.json::<Value>().await {
                // Legacy upstream contract: some endpoints still answer 200
                // with a [data, status] pair. Unwrap it until upstream
                // finishes migrating off the old shape.
                Ok(Value::Array(items)) if items.len() >= 2 => {
                    let embedded = items[1]
                        .as_u64()
                        .and_then(|code| u16::try_from(code).ok())
                        .and_then(|code| StatusCode::from_u16(code).ok());
                    match embedded {
                        Some(code) => (items[0].clone(), code),
                        None => (Value::Array(items), StatusCode::OK),
                    }
                }
                Ok(body) => (body, StatusCode::OK),
                Err(_) => (json!({}), StatusCode::OK),
            }
        } else {
            match response.json::<Value>().await {
                Ok(body) => (body, status),
                Err(_) => (
                    json!({ "error": format!("HTTP {}", status.as_u16()) }),
                    status,
                ),
            }
        }
    }
}

fn auth_failure() -> (Value, StatusCode) {
    error!("Failed to obtain authentication token for proxied request");
    (
        json!({ "error": "failed to obtain authentication token" }),
        StatusCode::INTERNAL_SERVER_ERROR,
    )
}

fn map_transport_error(err: reqwest::Error) -> (Value, StatusCode) {
    let (status, msg) = if err.is_connect() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Connection error while reaching upstream API: {}", err),
        )
    } else if err.is_timeout() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            format!("Upstream API request timed out: {}", err),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Upstream API request failed: {}", err),
        )
    };
    error!("{}", msg);
    (json!({ "error": msg }), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::session::{MemorySessionStore, SessionStore, TokenRecord};
    use chrono::Utc;
    use wiremock::matchers::{any, header as header_matcher, method as method_matcher, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn stack(authority_url: &str) -> (Arc<MemorySessionStore>, UpstreamClient) {
        let store = Arc::new(MemorySessionStore::new(30));
        let manager = Arc::new(TokenManager::new(
            store.clone(),
            Client::new(),
            authority_url.to_string(),
            "svc".to_string(),
            "secret".to_string(),
        ));
        (store, UpstreamClient::new(Client::new(), manager))
    }

    fn valid_record() -> TokenRecord {
        TokenRecord {
            access_token: "tok-123".to_string(),
            token_type: "Bearer".to_string(),
            expire_minutes: 30,
            valid_until: Utc::now().timestamp() + 1800,
        }
    }

    #[tokio::test]
    async fn unwraps_legacy_data_status_pair() {
        let upstream = MockServer::start().await;
        Mock::given(method_matcher("GET"))
            .and(path("/items"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["hello", 201])))
            .mount(&upstream)
            .await;

        let (store, client) = stack("http://127.0.0.1:1/token");
        store.set("s1", valid_record());

        let (body, status) = client
            .execute(
                "s1",
                Method::GET,
                &format!("{}/items", upstream.uri()),
                None,
                None,
                true,
            )
            .await;
        assert_eq!(body, json!("hello"));
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn array_without_embedded_status_passes_through() {
        let upstream = MockServer::start().await;
        Mock::given(method_matcher("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["a", "b"])))
            .mount(&upstream)
            .await;

        let (store, client) = stack("http://127.0.0.1:1/token");
        store.set("s1", valid_record());

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, true)
            .await;
        assert_eq!(body, json!(["a", "b"]));
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn attaches_bearer_header_from_session_record() {
        let upstream = MockServer::start().await;
        Mock::given(method_matcher("GET"))
            .and(header_matcher("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&upstream)
            .await;

        let (store, client) = stack("http://127.0.0.1:1/token");
        store.set("s1", valid_record());

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, true)
            .await;
        assert_eq!(body, json!({ "ok": true }));
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn propagates_json_error_bodies_verbatim() {
        let upstream = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({ "detail": "not found" })),
            )
            .mount(&upstream)
            .await;

        let (_, client) = stack("http://127.0.0.1:1/token");

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, false)
            .await;
        assert_eq!(body, json!({ "detail": "not found" }));
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn degrades_unparseable_success_body_to_empty_object() {
        let upstream = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&upstream)
            .await;

        let (_, client) = stack("http://127.0.0.1:1/token");

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, false)
            .await;
        assert_eq!(body, json!({}));
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn synthesizes_error_for_unparseable_failure_body() {
        let upstream = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&upstream)
            .await;

        let (_, client) = stack("http://127.0.0.1:1/token");

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, false)
            .await;
        assert_eq!(body, json!({ "error": "HTTP 500" }));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn maps_connection_failure_to_503() {
        let (store, client) = stack("http://127.0.0.1:1/token");
        store.set("s1", valid_record());

        let (body, status) = client
            .execute(
                "s1",
                Method::GET,
                "http://127.0.0.1:9/unreachable",
                None,
                None,
                true,
            )
            .await;
        assert!(body["error"].is_string());
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn maps_timeout_to_504() {
        let upstream = MockServer::start().await;
        Mock::given(any())
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "ok": true }))
                    .set_delay(std::time::Duration::from_secs(5)),
            )
            .mount(&upstream)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let manager = Arc::new(TokenManager::new(
            store,
            Client::new(),
            "http://127.0.0.1:1/token".to_string(),
            "svc".to_string(),
            "secret".to_string(),
        ));
        let short_timeout = Client::builder()
            .timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let client = UpstreamClient::new(short_timeout, manager);

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, false)
            .await;
        assert!(body["error"].is_string());
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn maps_other_transport_failures_to_500() {
        let (_, client) = stack("http://127.0.0.1:1/token");

        // Unparseable URL: fails before any connection is attempted
        let (body, status) = client
            .execute("s1", Method::GET, "not a url", None, None, false)
            .await;
        assert!(body["error"].is_string());
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn auth_failure_short_circuits_without_upstream_call() {
        let authority = MockServer::start().await;
        Mock::given(method_matcher("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&authority)
            .await;

        let upstream = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&upstream)
            .await;

        let (_, client) = stack(&authority.uri());

        let (body, status) = client
            .execute("s1", Method::GET, &upstream.uri(), None, None, true)
            .await;
        assert_eq!(
            body,
            json!({ "error": "failed to obtain authentication token" })
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
