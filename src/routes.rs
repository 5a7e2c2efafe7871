// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::session, state::AppState, utils::jwt::auth_middleware};

/// Assembles the main application router.
///
/// * Every route requires a bearer token identifying the exam taker.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (engine and configuration).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let assignment_routes = Router::new()
        .route("/{assignment_id}/modules", get(session::list_module_statuses))
        .route(
            "/{assignment_id}/slots/{slot_id}/progress",
            post(session::start_module),
        )
        .route(
            "/{assignment_id}/module-versions/{version_id}/content",
            get(session::get_module_content),
        );

    let progress_routes = Router::new()
        .route("/{progress_id}/answers", post(session::submit_answer))
        .route("/{progress_id}/complete", post(session::complete_module));

    Router::new()
        .nest("/api/assignments", assignment_routes)
        .nest("/api/progress", progress_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
