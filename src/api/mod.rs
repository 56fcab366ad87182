//! HTTP API
//!
//! A small Axum surface over the research engine.
//!
//! # API Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/models` - Oracle rotation and current model
//! - `POST /api/research` - Run a query; progress arrives as Server-Sent
//!   Events named `progress`, `failure` and `done`
//! - `GET /api/openapi.json` - OpenAPI document
//!
//! ```text
//! curl -N -X POST localhost:3000/api/research \
//!      -H 'content-type: application/json' \
//!      -d '{"query": "benefits of static typing", "max_articles": 3}'
//! ```

/// Request handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::{ApiDoc, create_app, create_router};
