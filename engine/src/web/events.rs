//! Live event feed as Server-Sent Events.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{future, Stream, StreamExt};
use tracing::{info, warn};

use super::{ApiError, AppState};
use crate::model::CampaignEvent;

/// Stream every event published after the client connects.
///
/// The SSE event name is the wire event name and the data is its JSON payload.
/// Nothing published earlier is replayed.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let events = state.events.subscribe().await?;
    info!("event_observer_connected");

    let stream = events.filter_map(|event| future::ready(to_sse(&event).map(Ok)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse(event: &CampaignEvent) -> Option<Event> {
    match event.payload_json() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            warn!(event = event.name(), error = %e, "sse_event_encode_failed");
            None
        }
    }
}
