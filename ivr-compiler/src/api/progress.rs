//! GET /progress/:id: per-build progress over SSE
//!
//! Polls the registry at a fixed cadence and forwards `{completed, total,
//! done}` snapshots. After the first snapshot with `done=true` one `done`
//! event is sent and the stream closes.

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, warn};

use super::parse_build_id;
use crate::error::ApiResult;
use crate::AppState;

pub async fn progress_stream(
    State(state): State<AppState>,
    Path(build_id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let build_id = parse_build_id(&build_id)?;

    // Unknown builds are rejected before the stream opens
    state.registry.get_progress(build_id).await?;

    let registry = state.registry.clone();
    let interval = state.progress_interval;

    let stream = async_stream::stream! {
        debug!(%build_id, "SSE: progress stream started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let progress = match registry.get_progress(build_id).await {
                Ok(progress) => progress,
                Err(e) => {
                    warn!(%build_id, error = %e, "SSE: build disappeared from registry");
                    break;
                }
            };

            match Event::default().json_data(progress) {
                Ok(event) => yield Ok(event),
                Err(e) => warn!(%build_id, error = %e, "SSE: failed to serialize progress"),
            }

            if progress.done {
                debug!(%build_id, completed = progress.completed, total = progress.total, "SSE: build done");
                if let Ok(event) = Event::default().event("done").json_data(progress) {
                    yield Ok(event);
                }
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}
