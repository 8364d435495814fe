//! GET /events: build lifecycle events over SSE
//!
//! Forwards everything emitted on the event bus. `?build_id=` restricts the
//! stream to one build.

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct EventQuery {
    pub build_id: Option<Uuid>,
}

pub async fn event_stream(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(build_id = ?query.build_id, "New SSE client connected to build events");

    let mut rx = state.event_bus.subscribe();
    let filter = query.build_id;

    let stream = async_stream::stream! {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE: subscriber lagged, events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            if filter.is_some_and(|id| id != event.build_id()) {
                continue;
            }

            let event_type = event.event_type();
            match serde_json::to_string(&event) {
                Ok(event_json) => {
                    debug!("SSE: Broadcasting build event: {}", event_type);
                    yield Ok(Event::default().event(event_type).data(event_json));
                }
                Err(e) => {
                    warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
