// Route handlers. Each performs structural validation (JSON body, required
// fields) before calling the proxy core, and returns whatever (body, status)
// pair the core normalized.

pub mod customer;
pub mod employee;
pub mod product;
pub mod token;

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::modules::security::hash_password;

pub type ApiResponse = (StatusCode, Json<Value>);

pub(crate) fn reply(body: Value, status: StatusCode) -> ApiResponse {
    (status, Json(body))
}

pub(crate) fn bad_request(message: String) -> ApiResponse {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

/// 400 unless every required field is present in the JSON body.
pub(crate) fn require_fields(data: &Value, required: &[&str]) -> Result<(), ApiResponse> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|field| data.get(*field).is_none())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(bad_request(format!(
            "Missing required fields: {:?}",
            missing
        )))
    }
}

pub(crate) fn require_query_param(
    params: &HashMap<String, String>,
    name: &str,
) -> Result<String, ApiResponse> {
    match params.get(name) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(bad_request(format!(
            "Query parameter '{}' is required",
            name
        ))),
    }
}

/// Entity ids arrive as JSON numbers or strings depending on the frontend.
pub(crate) fn id_from_body(data: &Value, field: &str) -> Result<String, ApiResponse> {
    match data.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(bad_request(format!(
            "Field '{}' is required in the JSON body",
            field
        ))),
    }
}

/// Hash the password field in place when proxy-side hashing is enabled.
///
/// bcrypt burns ~100ms of CPU per hash, so it runs on the blocking pool
/// instead of stalling the async runtime under concurrent writes.
pub(crate) async fn process_create_password(
    hash_passwords: bool,
    mut data: Value,
) -> Result<Value, ApiResponse> {
    if !hash_passwords {
        return Ok(data);
    }

    let plain = data
        .get("password")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(plain) = plain {
        let hashed = match tokio::task::spawn_blocking(move || hash_password(&plain)).await {
            Ok(Ok(hashed)) => hashed,
            Ok(Err(e)) => {
                error!("Password hashing failed: {}", e);
                return Err(hashing_failure());
            }
            Err(e) => {
                error!("Password hashing task failed: {}", e);
                return Err(hashing_failure());
            }
        };
        data["password"] = Value::String(hashed);
    }
    Ok(data)
}

fn hashing_failure() -> ApiResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "failed to hash password" })),
    )
}

/// Update flow: an explicit keep_password flag, or an absent/empty password,
/// strips the password entirely so upstream keeps the stored hash. Anything
/// else is processed like a create.
pub(crate) async fn process_update_password(
    hash_passwords: bool,
    mut data: Value,
) -> Result<Value, ApiResponse> {
    let keep = data
        .get("keep_password")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || data
            .get("password")
            .and_then(Value::as_str)
            .map_or(true, str::is_empty);

    if keep {
        if let Some(map) = data.as_object_mut() {
            map.remove("password");
            map.insert("keep_password".to_string(), Value::Bool(true));
        }
        return Ok(data);
    }

    process_create_password(hash_passwords, data).await
}
