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

const CREATE_FIELDS: [&str; 5] = ["name", "document", "password", "phone", "email"];
const UPDATE_FIELDS: [&str; 5] = ["id", "name", "document", "phone", "email"];

pub async fn list_customers(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResponse {
    let (body, status) = state
        .upstream
        .execute(
            &session.0,
            Method::GET,
            &state.config.customer_api_url,
            None,
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn get_customer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.customer_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::GET, &url, None, None, true)
        .await;
    reply(body, status)
}

pub async fn create_customer(
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
            &state.config.customer_api_url,
            Some(&payload),
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn update_customer(
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

    let url = format!("{}{}", state.config.customer_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::PUT, &url, Some(&payload), None, true)
        .await;
    reply(body, status)
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.customer_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::DELETE, &url, None, None, true)
        .await;
    reply(body, status)
}
