//! Application startup and lifecycle management.

use crate::config::Config;
use crate::handlers;
use crate::middleware::auth_middleware;
use crate::services::{AuthService, Database, JwtService, get_metrics, init_metrics};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::metrics::metrics_middleware;
use service_core::middleware::rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware};
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::request_id_middleware;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub jwt: JwtService,
    pub auth: AuthService,
}

/// Health check endpoint for liveness probes.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": "billing-api",
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": "billing-api",
                    "error": e.to_string()
                })),
            )
        }
    }
}

/// Readiness check endpoint.
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Prometheus metrics endpoint.
async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

fn build_router(state: AppState) -> Router {
    let auth_limiter = create_ip_rate_limiter(
        state.config.rate_limit.auth_attempts,
        state.config.rate_limit.window_seconds,
    );

    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route_layer(middleware::from_fn_with_state(
            auth_limiter,
            ip_rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .route(
            "/clients",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/clients/:client_id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route(
            "/companies",
            post(handlers::companies::create_company).get(handlers::companies::list_companies),
        )
        .route(
            "/companies/:company_id",
            get(handlers::companies::get_company)
                .put(handlers::companies::update_company)
                .delete(handlers::companies::delete_company),
        )
        .route(
            "/bank-details",
            post(handlers::bank_details::create_bank_detail)
                .get(handlers::bank_details::list_bank_details),
        )
        .route(
            "/bank-details/:bank_detail_id",
            get(handlers::bank_details::get_bank_detail)
                .put(handlers::bank_details::update_bank_detail)
                .delete(handlers::bank_details::delete_bank_detail),
        )
        .route(
            "/invoices",
            post(handlers::invoices::create_invoice).get(handlers::invoices::list_invoices),
        )
        .route(
            "/invoices/:invoice_id",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route(
            "/invoices/:invoice_id/finalize",
            post(handlers::invoices::finalize_invoice),
        )
        .route(
            "/invoices/:invoice_id/cancel",
            post(handlers::invoices::cancel_invoice),
        )
        .route(
            "/invoices/:invoice_id/items",
            post(handlers::invoice_items::add_invoice_item)
                .get(handlers::invoice_items::list_invoice_items),
        )
        .route(
            "/invoices/:invoice_id/items/:item_id",
            get(handlers::invoice_items::get_invoice_item)
                .put(handlers::invoice_items::update_invoice_item)
                .delete(handlers::invoice_items::remove_invoice_item),
        )
        .route(
            "/invoices/:invoice_id/payments",
            post(handlers::payments::record_payment).get(handlers::payments::list_payments),
        )
        .route(
            "/invoices/:invoice_id/payments/:payment_id",
            get(handlers::payments::get_payment)
                .put(handlers::payments::update_payment)
                .delete(handlers::payments::delete_payment),
        )
        .route(
            "/activity-logs",
            post(handlers::activity_logs::create_activity_log)
                .get(handlers::activity_logs::list_activity_logs),
        )
        .route(
            "/activity-logs/:log_id",
            get(handlers::activity_logs::get_activity_log),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_endpoint))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: Config) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build without running migrations. Use in tests when the harness has
    /// already applied them.
    pub async fn build_without_migrations(config: Config) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(config: Config, run_migrations: bool) -> Result<Self, AppError> {
        init_metrics();

        let db = Database::new(
            config.database.url.expose_secret(),
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let jwt = JwtService::new(&config.jwt);
        let auth = AuthService::new(db.clone(), jwt.clone());

        let state = AppState {
            config: config.clone(),
            db,
            jwt,
            auth,
        };

        // Port 0 binds a random free port, used by the test harness.
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("billing-api listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get the application state for test harnesses.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(
            self.listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
