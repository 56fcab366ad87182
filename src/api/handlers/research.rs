use crate::{
    AppState,
    research::ProgressEvent,
    types::{AppError, ResearchRequest, Result},
};
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

/// Run a research query, streaming progress as Server-Sent Events
///
/// Event names are `progress`, `failure` and `done`; each payload is the JSON
/// form of the event. Closing the connection abandons the run.
#[utoipa::path(
    post,
    path = "/api/research",
    request_body = ResearchRequest,
    responses(
        (status = 200, description = "Event stream of research progress", content_type = "text/event-stream", body = ProgressEvent),
        (status = 400, description = "Invalid query, budget or model")
    ),
    tag = "research"
)]
pub async fn research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if payload.query.trim().is_empty() {
        return Err(AppError::InvalidInput("Query must not be empty".to_string()));
    }

    let budget = payload.budget(state.config.research.budget());
    budget.validate()?;

    if let Some(model) = payload.model.as_deref() {
        state.gateway.select_model(model)?;
    }

    info!(query = %payload.query, ?budget, "Starting research stream");
    let progress = state.orchestrator.run(&payload.query, budget)?;

    let events = progress.map(|event| Ok::<_, Infallible>(to_sse_event(&event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn to_sse_event(event: &ProgressEvent) -> Event {
    match Event::default().event(event.kind()).json_data(event) {
        Ok(sse) => sse,
        Err(e) => {
            warn!(error = %e, "Failed to encode progress event");
            Event::default()
                .event("failure")
                .data(r#"{"type":"failure","reason":"event encoding failed"}"#)
        }
    }
}

