use crate::{AppState, types::ModelsResponse};
use axum::{Json, extract::State};

/// List the oracle rotation and the model the next dispatch starts with
#[utoipa::path(
    get,
    path = "/api/models",
    responses((status = 200, description = "Configured oracle rotation", body = ModelsResponse)),
    tag = "system"
)]
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    Json(ModelsResponse {
        rotation: state.gateway.rotation(),
        current: state.gateway.current_model().to_string(),
    })
}
