// Axum middleware for the gateway routes.

pub mod cors;
pub mod session;

pub use cors::cors_layer;
pub use session::{session_middleware, SessionId, SESSION_COOKIE};
