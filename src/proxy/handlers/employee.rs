use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use reqwest::Method;
use serde_json::Value;

use super::{
    bad_request, id_from_body, process_create_password, process_update_password, reply,
    require_fields, require_query_param, ApiResponse,
};
use crate::proxy::middleware::SessionId;
use crate::proxy::server::AppState;

const CREATE_FIELDS: [&str; 6] = ["name", "registration", "document", "password", "role", "phone"];
const UPDATE_FIELDS: [&str; 6] = ["id", "name", "registration", "document", "role", "phone"];

pub async fn list_employees(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResponse {
    let (body, status) = state
        .upstream
        .execute(
            &session.0,
            Method::GET,
            &state.config.employee_api_url,
            None,
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn get_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.employee_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::GET, &url, None, None, true)
        .await;
    reply(body, status)
}

pub async fn create_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(data)) = body else {
        return bad_request("Request body must be JSON".to_string());
    };
    if let Err(resp) = require_fields(&data, &CREATE_FIELDS) {
        return resp;
    }
    let payload = match process_create_password(state.config.hash_passwords, data).await {
        Ok(payload) => payload,
        Err(resp) => return resp,
    };

    let (body, status) = state
        .upstream
        .execute(
            &session.0,
            Method::POST,
            &state.config.employee_api_url,
            Some(&payload),
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn update_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(data)) = body else {
        return bad_request("Request body must be JSON".to_string());
    };
    if let Err(resp) = require_fields(&data, &UPDATE_FIELDS) {
        return resp;
    }
    let id = match id_from_body(&data, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let payload = match process_update_password(state.config.hash_passwords, data).await {
        Ok(payload) => payload,
        Err(resp) => return resp,
    };

    let url = format!("{}{}", state.config.employee_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::PUT, &url, Some(&payload), None, true)
        .await;
    reply(body, status)
}

pub async fn delete_employee(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.employee_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::DELETE, &url, None, None, true)
        .await;
    reply(body, status)
}

/// Existence check used by the frontend before registering a document number.
pub async fn check_document(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let document = match require_query_param(&params, "document") {
        Ok(document) => document,
        Err(resp) => return resp,
    };
    let url = format!("{}document/{}", state.config.employee_api_url, document);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::GET, &url, None, None, true)
        .await;
    reply(body, status)
}

/// Credential check against the upstream login sub-route. Anonymous: this is
/// the one proxied call made without a bearer token, and the password is
/// forwarded untouched so upstream can verify it against its stored hash.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse {
    let Ok(Json(data)) = body else {
        return bad_request("Request body must be JSON".to_string());
    };
    if let Err(resp) = require_fields(&data, &["document", "password"]) {
        return resp;
    }

    let url = format!("{}login/", state.config.employee_api_url);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::POST, &url, Some(&data), None, false)
        .await;
    reply(body, status)
}
