use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gateway_session";

/// Session identifier attached to every request as an extension.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

/// Assign each browser a session id: reuse the session cookie when present,
/// otherwise mint one and set it on the response. The frontend runs on a
/// different origin, so the cookie needs SameSite=None and Secure.
pub async fn session_middleware(mut request: Request, next: Next) -> Response {
    let existing = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(cookie_session_id);

    let (session_id, fresh) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().simple().to_string(), true),
    };

    request.extensions_mut().insert(SessionId(session_id.clone()));
    let mut response = next.run(request).await;

    if fresh {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=None; Secure",
            SESSION_COOKIE, session_id
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }

    response
}

fn cookie_session_id(raw: &str) -> Option<String> {
    raw.split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}
