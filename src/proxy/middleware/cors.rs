use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tracing::warn;

/// CORS restricted to the configured frontend origin, with credentials so
/// the session cookie travels on cross-origin requests.
pub fn cors_layer(frontend_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    match frontend_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin).allow_credentials(true),
        Err(_) => {
            warn!(
                "Invalid frontend origin {:?}; cross-origin requests will be refused",
                frontend_origin
            );
            base
        }
    }
}
