use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; connect-src 'self'"),
    );
    response
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    // Base64 inflates the PDF by a third.
    let body_limit = app_state.config.upload_limit_bytes / 3 * 4 + 1024;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/metrics",
            get(handlers::metrics_handler).layer(middleware::from_fn_with_state(
                app_state.clone(),
                handlers::metrics_auth_middleware,
            )),
        )
        .nest("/api/v1", api_routes(body_limit).layer(cors))
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes(body_limit: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/state", get(handlers::quiz::get_state))
        .route(
            "/notes",
            post(handlers::notes::upload_notes).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/quiz/answer", post(handlers::quiz::select_answer))
        .route("/quiz/advance", post(handlers::quiz::advance))
        .route("/quiz/restart", post(handlers::quiz::restart))
        .route("/quiz/stream", get(handlers::sse::quiz_stream))
        .route("/navigate", post(handlers::quiz::navigate))
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/history", get(handlers::dashboard::get_history))
        // The default predicate leaves event streams uncompressed.
        .layer(CompressionLayer::new())
}
