use crate::AppState;
use crate::api::handlers;
use axum::{
    Json, Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// OpenAPI description of the HTTP surface
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::models::list_models,
        handlers::research::research,
    ),
    components(schemas(
        crate::types::HealthResponse,
        crate::types::ModelsResponse,
        crate::types::ResearchRequest,
        crate::research::ProgressEvent,
    )),
    tags(
        (name = "system", description = "Health and configuration"),
        (name = "research", description = "Streaming web research")
    )
)]
pub struct ApiDoc;

/// Routes relative to `/api`
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/models", get(handlers::models::list_models))
        .route("/research", post(handlers::research::research))
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}

/// Full application: `/api` routes, tracing and permissive CORS
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api", create_router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
