//! HTTP API server with observability for the authorization ledger.
//!
//! Provides REST endpoints for account administration and funds
//! authorization, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{delete, get, post};
use dispatcher::{InMemoryIdleScaling, InMemoryQueueClient, OutboxDispatcher};
use ledger_store::LedgerStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::accounts::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: LedgerStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/v1/account", post(routes::accounts::open::<S>))
        .route("/api/v1/account/{id}", get(routes::accounts::get::<S>))
        .route("/api/v1/account/{id}", delete(routes::accounts::close::<S>))
        .route(
            "/api/v1/account/{id}/credit",
            post(routes::accounts::credit::<S>),
        )
        .route(
            "/api/v1/account/{id}/debit",
            post(routes::accounts::debit::<S>),
        )
        .route(
            "/api/v1/account/{id}/release",
            post(routes::accounts::release::<S>),
        )
        .route("/api/v1/authorize", post(routes::authorize::authorize::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state plus the outbox dispatcher that
/// drains decisions the coordinator commits into the same store.
pub fn create_default_state<S: LedgerStore + Clone + 'static>(
    store: S,
    authorize_timeout: Duration,
) -> (
    Arc<AppState<S>>,
    OutboxDispatcher<S, InMemoryQueueClient, InMemoryIdleScaling>,
) {
    use authorizer::{AccountService, AuthorizationCoordinator, InMemoryNotificationService};

    let accounts = AccountService::new(store.clone());
    let coordinator = AuthorizationCoordinator::with_timeout(
        store.clone(),
        InMemoryNotificationService::new(),
        authorize_timeout,
    );
    let outbox_dispatcher = OutboxDispatcher::new(
        store.clone(),
        InMemoryQueueClient::new(),
        InMemoryIdleScaling::new(),
    );

    let state = Arc::new(AppState {
        accounts,
        coordinator,
        store,
    });

    (state, outbox_dispatcher)
}
