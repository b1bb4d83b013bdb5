use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    // Outermost first: CORS, then request id, then the trace span that reads it
    let layers = ServiceBuilder::new()
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/feed", get(handlers::feed))
        .nest("/api/v1", api_routes())
        .fallback(handlers::not_found)
        .layer(layers)
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/feed", get(handlers::feed))
        .route("/sync", post(handlers::sync))
}
