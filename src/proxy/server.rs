use std::sync::Arc;

use axum::{
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

use crate::error::AppResult;
use crate::modules::config::GatewayConfig;
use crate::proxy::handlers;
use crate::proxy::middleware;
use crate::proxy::session::MemorySessionStore;
use crate::proxy::token_manager::TokenManager;
use crate::proxy::upstream::UpstreamClient;
use crate::utils::http::create_client;

/// Hard cap on each proxied upstream call.
pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub token_manager: Arc<TokenManager>,
    pub upstream: Arc<UpstreamClient>,
    pub config: Arc<GatewayConfig>,
}

/// Gateway server instance
pub struct GatewayServer {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl GatewayServer {
    /// Start the gateway, returning the running instance and its task handle.
    pub async fn start(
        config: GatewayConfig,
    ) -> AppResult<(Self, tokio::task::JoinHandle<()>)> {
        let config = Arc::new(config);
        let http = create_client(UPSTREAM_TIMEOUT_SECS, config.verify_tls);

        let store = Arc::new(MemorySessionStore::new(config.session_minutes));
        let token_manager = Arc::new(TokenManager::new(
            store,
            http.clone(),
            config.token_endpoint.clone(),
            config.token_username.clone(),
            config.token_password.clone(),
        ));
        let upstream = Arc::new(UpstreamClient::new(http, token_manager.clone()));

        let state = AppState {
            token_manager,
            upstream,
            config: config.clone(),
        };
        let app = router(state);

        let addr = format!("{}:{}", config.bind_address, config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("ERP gateway listening on http://{}", addr);

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let server = Self {
            shutdown_tx: Some(shutdown_tx),
        };

        let handle = tokio::spawn(async move {
            use hyper::server::conn::http1;
            use hyper_util::rt::TokioIo;
            use hyper_util::service::TowerToHyperService;

            loop {
                tokio::select! {
                    res = listener.accept() => {
                        match res {
                            Ok((stream, _)) => {
                                let io = TokioIo::new(stream);
                                let service = TowerToHyperService::new(app.clone());

                                tokio::task::spawn(async move {
                                    if let Err(err) = http1::Builder::new()
                                        .serve_connection(io, service)
                                        .await
                                    {
                                        debug!("Connection handling finished or errored: {:?}", err);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept connection: {:?}", e);
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("Gateway stopped listening");
                        break;
                    }
                }
            }
        });

        Ok((server, handle))
    }

    /// Stop the server
    pub fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = middleware::cors_layer(&state.config.frontend_origin);

    Router::new()
        .route("/healthz", get(health_check_handler))
        .route("/api/token/check", post(handlers::token::check_token))
        // Employee
        .route("/api/employee/all", get(handlers::employee::list_employees))
        .route("/api/employee/one", get(handlers::employee::get_employee))
        .route(
            "/api/employee",
            post(handlers::employee::create_employee)
                .put(handlers::employee::update_employee)
                .delete(handlers::employee::delete_employee),
        )
        .route(
            "/api/employee/check-document",
            get(handlers::employee::check_document),
        )
        .route("/api/employee/login", post(handlers::employee::login))
        // Customer
        .route("/api/customer/all", get(handlers::customer::list_customers))
        .route("/api/customer/one", get(handlers::customer::get_customer))
        .route(
            "/api/customer",
            post(handlers::customer::create_customer)
                .put(handlers::customer::update_customer)
                .delete(handlers::customer::delete_customer),
        )
        // Product
        .route("/api/product/all", get(handlers::product::list_products))
        .route("/api/product/one", get(handlers::product::get_product))
        .route(
            "/api/product",
            post(handlers::product::create_product)
                .put(handlers::product::update_product)
                .delete(handlers::product::delete_product),
        )
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::session_middleware))
        .layer(cors)
        .with_state(state)
}

/// Health check handler
async fn health_check_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}
