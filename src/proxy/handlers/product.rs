use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::{Extension, Json};
use reqwest::Method;
use serde_json::Value;

use super::{
    bad_request, id_from_body, reply, require_fields, require_query_param, ApiResponse,
};
use crate::proxy::middleware::SessionId;
use crate::proxy::server::AppState;

const CREATE_FIELDS: [&str; 4] = ["name", "description", "price", "stock"];
const UPDATE_FIELDS: [&str; 5] = ["id", "name", "description", "price", "stock"];

pub async fn list_products(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> ApiResponse {
    let (body, status) = state
        .upstream
        .execute(
            &session.0,
            Method::GET,
            &state.config.product_api_url,
            None,
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn get_product(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.product_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::GET, &url, None, None, true)
        .await;
    reply(body, status)
}

pub async fn create_product(
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

    let (body, status) = state
        .upstream
        .execute(
            &session.0,
            Method::POST,
            &state.config.product_api_url,
            Some(&data),
            None,
            true,
        )
        .await;
    reply(body, status)
}

pub async fn update_product(
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

    let url = format!("{}{}", state.config.product_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::PUT, &url, Some(&data), None, true)
        .await;
    reply(body, status)
}

pub async fn delete_product(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResponse {
    let id = match require_query_param(&params, "id") {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let url = format!("{}{}", state.config.product_api_url, id);
    let (body, status) = state
        .upstream
        .execute(&session.0, Method::DELETE, &url, None, None, true)
        .await;
    reply(body, status)
}
