use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::events::{Handshake, ServerEvent},
    state::SharedState,
};

const EVENT_HANDSHAKE: &str = "handshake";

/// Which events an SSE client receives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamScope {
    /// Every match.
    All,
    /// A single match identified by its external id.
    Match(String),
}

impl StreamScope {
    fn label(&self) -> &str {
        match self {
            StreamScope::All => "all",
            StreamScope::Match(id) => id,
        }
    }

    /// Whether `event` belongs on a stream with this scope.
    ///
    /// Events that carry no match id (system status) reach every stream.
    pub fn admits(&self, event: &ServerEvent) -> bool {
        match self {
            StreamScope::All => true,
            StreamScope::Match(id) => event.match_id.is_none() || event.concerns(id),
        }
    }
}

/// Subscribe to the shared event hub.
pub fn subscribe(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.event_hub().subscribe()
}

fn to_sse_event(payload: &ServerEvent) -> Event {
    Event::default()
        .event(payload.event.clone())
        .data(payload.data.to_string())
}

fn handshake_event(state: &SharedState, scope: &StreamScope) -> Option<Event> {
    let message = match scope {
        StreamScope::All => "subscribed to all matches".to_owned(),
        StreamScope::Match(id) => format!("subscribed to match {id}"),
    };
    let handshake = Handshake {
        stream: scope.label().to_owned(),
        message,
        degraded: state.is_degraded(),
    };
    match ServerEvent::json(EVENT_HANDSHAKE, None, &handshake) {
        Ok(payload) => Some(to_sse_event(&payload)),
        Err(err) => {
            warn!(error = %err, "failed to serialize SSE handshake");
            None
        }
    }
}

/// Convert a hub receiver into an SSE response, forwarding the events the
/// scope admits until the client disconnects.
pub fn to_sse_stream(
    state: &SharedState,
    mut receiver: broadcast::Receiver<ServerEvent>,
    scope: StreamScope,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);
    let handshake = handshake_event(state, &scope);

    tokio::spawn(async move {
        if let Some(event) = handshake {
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if !scope.admits(&payload) {
                                continue;
                            }
                            if tx.send(Ok(to_sse_event(&payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            // Best effort: the client refetches state when it notices a gap.
                            warn!(skipped, stream = scope.label(), "SSE subscriber lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!(stream = scope.label(), "SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
