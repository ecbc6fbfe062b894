use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use reqwest::{header, Client};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::proxy::session::{SessionStore, TokenRecord};

/// Failed token acquisition: a structured error body paired with the status
/// the route layer should answer with. Authority HTTP errors keep the
/// authority's status; everything else maps to 500.
#[derive(Debug, Clone)]
pub struct TokenFailure {
    pub body: Value,
    pub status: StatusCode,
}

impl TokenFailure {
    fn internal(msg: String) -> Self {
        Self {
            body: json!({ "error": msg }),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Acquires, caches and validates the bearer token for each user session.
///
/// Never panics or propagates errors past its boundary: every failure path
/// resolves to a [`TokenFailure`] or a boolean `false`.
pub struct TokenManager {
    store: Arc<dyn SessionStore>,
    http: Client,
    authority_url: String,
    username: String,
    password: String,
}

impl TokenManager {
    pub fn new(
        store: Arc<dyn SessionStore>,
        http: Client,
        authority_url: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            store,
            http,
            authority_url,
            username,
            password,
        }
    }

    /// Request a fresh token from the authority endpoint and cache it for
    /// this session. Returns the raw authority response body on success.
    pub async fn acquire_token(&self, session_id: &str) -> Result<Value, TokenFailure> {
        // Discard any previous token state before requesting a fresh one
        self.store.clear(session_id);
        info!("Requesting new token from {}", self.authority_url);

        let response = match self
            .http
            .post(&self.authority_url)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let msg = format!("Unexpected error while requesting token: {}", e);
                error!("{}", msg);
                return Err(TokenFailure::internal(msg));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let msg = format!("HTTP error {}: {}", status.as_u16(), text);
            error!("Token request failed: {}", msg);
            return Err(TokenFailure {
                body: json!({ "error": msg }),
                status,
            });
        }

        let token_data: Value = match response.json().await {
            Ok(value) => value,
            Err(e) => {
                let msg = format!("Failed to parse authority response: {}", e);
                error!("{}", msg);
                return Err(TokenFailure::internal(msg));
            }
        };

        // The authority guarantees access_token only semantically; a 2xx
        // body without it is still a failure for this call
        let Some(access_token) = token_data.get("access_token").and_then(Value::as_str) else {
            let msg = format!(
                "'access_token' missing from authority response: {}",
                token_data
            );
            error!("{}", msg);
            return Err(TokenFailure::internal(msg));
        };

        let (Some(expire_minutes), Some(token_type)) = (
            token_data.get("expire_minutes").and_then(Value::as_i64),
            token_data.get("token_type").and_then(Value::as_str),
        ) else {
            let msg = format!(
                "Malformed token payload from authority: {}",
                token_data
            );
            error!("{}", msg);
            return Err(TokenFailure::internal(msg));
        };

        self.store.set(
            session_id,
            TokenRecord {
                access_token: access_token.to_string(),
                token_type: token_type.to_string(),
                expire_minutes,
                valid_until: Utc::now().timestamp() + expire_minutes * 60,
            },
        );
        info!("Token acquired, valid for {} minutes", expire_minutes);

        Ok(token_data)
    }

    /// True when the session holds a token within its validity window,
    /// acquiring a fresh one if needed.
    pub async fn validate_token(&self, session_id: &str) -> bool {
        // Two passes at most: a transient authority hiccup gets exactly one
        // retry, never an unbounded loop
        for _ in 0..2 {
            if let Some(record) = self.store.get(session_id) {
                if record.is_valid() {
                    return true;
                }
            }

            if let Ok(body) = self.acquire_token(session_id).await {
                if body.get("access_token").is_some() {
                    return true;
                }
            }
        }

        false
    }

    /// Current session record, if any. Read-only.
    pub fn current(&self, session_id: &str) -> Option<TokenRecord> {
        self.store.get(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::session::MemorySessionStore;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager(store: Arc<MemorySessionStore>, authority_url: String) -> TokenManager {
        TokenManager::new(
            store,
            Client::new(),
            authority_url,
            "svc".to_string(),
            "secret".to_string(),
        )
    }

    fn token_body() -> Value {
        json!({ "access_token": "t", "expire_minutes": 5, "token_type": "Bearer" })
    }

    #[tokio::test]
    async fn acquire_persists_record_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=svc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let mgr = manager(store.clone(), format!("{}/token", server.uri()));

        let body = mgr.acquire_token("s1").await.expect("acquisition succeeds");
        assert_eq!(body, token_body());

        let record = store.get("s1").expect("record persisted");
        assert_eq!(record.access_token, "t");
        assert_eq!(record.token_type, "Bearer");
        assert_eq!(record.expire_minutes, 5);
        let expected = Utc::now().timestamp() + 5 * 60;
        assert!((record.valid_until - expected).abs() <= 2);
    }

    #[tokio::test]
    async fn acquire_rejects_2xx_body_without_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "ok" })))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let mgr = manager(store.clone(), server.uri());

        let failure = mgr.acquire_token("s1").await.unwrap_err();
        assert_eq!(failure.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(failure.body["error"].is_string());
        assert!(store.get("s1").is_none(), "no partial record may persist");
    }

    #[tokio::test]
    async fn acquire_propagates_authority_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let mgr = manager(store, server.uri());

        let failure = mgr.acquire_token("s1").await.unwrap_err();
        assert_eq!(failure.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validate_acquires_once_when_no_record_exists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let mgr = manager(store, server.uri());

        assert!(mgr.validate_token("s1").await);
    }

    #[tokio::test]
    async fn validate_gives_up_after_exactly_two_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let mgr = manager(store, server.uri());

        assert!(!mgr.validate_token("s1").await);
    }

    #[tokio::test]
    async fn validate_with_fresh_record_never_contacts_authority() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySessionStore::new(30));
        let record = TokenRecord {
            access_token: "cached".to_string(),
            token_type: "Bearer".to_string(),
            expire_minutes: 30,
            valid_until: Utc::now().timestamp() + 1800,
        };
        store.set("s1", record.clone());

        let mgr = manager(store.clone(), server.uri());
        for _ in 0..3 {
            assert!(mgr.validate_token("s1").await);
        }
        // Repeated validation never mutates a valid record
        assert_eq!(store.get("s1").unwrap(), record);
    }
}
