use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{error::RecvError, Receiver};

use crate::{metrics::SSE_CONNECTIONS_ACTIVE, models::timer::TimerEvent, services::AppState};

/// SSE endpoint for countdown events
/// GET /api/v1/quiz/stream
pub async fn quiz_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    tracing::info!("Client connected to timer stream");

    let stream = timer_stream(state.study.subscribe(), ConnectionGuard::new());
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Keeps the active-connection gauge in step with open streams.
struct ConnectionGuard;

impl ConnectionGuard {
    fn new() -> Self {
        SSE_CONNECTIONS_ACTIVE.inc();
        Self
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        SSE_CONNECTIONS_ACTIVE.dec();
        tracing::info!("Timer stream closed");
    }
}

fn timer_stream(
    receiver: Receiver<TimerEvent>,
    guard: ConnectionGuard,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((receiver, guard), |(mut receiver, guard)| async move {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    let sse = Event::default()
                        .event(event.event_name())
                        .data(event.to_sse_data());
                    return Some((Ok(sse), (receiver, guard)));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Timer stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}
