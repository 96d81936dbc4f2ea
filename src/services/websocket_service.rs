use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ViewerInboundMessage, ViewerOutboundMessage},
    state::{SharedState, ViewerConnection},
};

/// Failure while pushing to a viewer.
#[derive(Debug, Error)]
enum ViewerError {
    /// Writer channel closed; the connection should be torn down.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle of one viewer WebSocket connection.
///
/// Viewers are read-only: they receive relayed match events and may narrow
/// them with `joinMatch`/`leaveMatch`. Nothing they send mutates a match.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let viewer = ViewerConnection::new(Uuid::new_v4().simple().to_string(), outbound_tx.clone());
    let viewer_id = viewer.id.clone();
    state.viewers().insert(viewer_id.clone(), viewer.clone());
    info!(id = %viewer_id, viewers = state.viewers().len(), "viewer connected");

    if send_message(
        &outbound_tx,
        &ViewerOutboundMessage::Connected {
            viewer_id: viewer_id.clone(),
        },
    )
    .is_err()
    {
        state.viewers().remove(&viewer_id);
        drop(viewer);
        finalize(writer_task, outbound_tx).await;
        return;
    }

    let relay_task = spawn_relay(&state, viewer.clone());

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ViewerInboundMessage>(&text) {
                    Ok(inbound) => handle_inbound(&viewer, inbound),
                    Err(err) => {
                        warn!(id = %viewer_id, error = %err, "failed to parse viewer message");
                        Some(ViewerOutboundMessage::Error {
                            message: "malformed message".into(),
                        })
                    }
                };
                if let Some(reply) = reply {
                    if send_message(&outbound_tx, &reply).is_err() {
                        break;
                    }
                }
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(id = %viewer_id, error = %err, "websocket error");
                break;
            }
        }
    }

    relay_task.abort();
    let _ = relay_task.await;
    state.viewers().remove(&viewer_id);
    drop(viewer);
    info!(id = %viewer_id, "viewer disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Apply a viewer request and build the acknowledgement to send back.
fn handle_inbound(
    viewer: &ViewerConnection,
    message: ViewerInboundMessage,
) -> Option<ViewerOutboundMessage> {
    match message {
        ViewerInboundMessage::JoinMatch { match_id } => {
            debug!(id = %viewer.id, %match_id, "viewer joined match");
            viewer.joined.insert(match_id.clone());
            Some(ViewerOutboundMessage::Joined { match_id })
        }
        ViewerInboundMessage::LeaveMatch { match_id } => {
            debug!(id = %viewer.id, %match_id, "viewer left match");
            viewer.joined.remove(&match_id);
            Some(ViewerOutboundMessage::Left { match_id })
        }
        ViewerInboundMessage::Ping => Some(ViewerOutboundMessage::Pong),
        ViewerInboundMessage::Unknown => {
            debug!(id = %viewer.id, "ignoring unknown viewer message");
            None
        }
    }
}

/// Forward hub events the viewer wants onto its writer channel.
fn spawn_relay(state: &SharedState, viewer: ViewerConnection) -> JoinHandle<()> {
    let mut events = state.event_hub().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if !viewer.wants(&event) {
                        continue;
                    }
                    let message = ViewerOutboundMessage::Event {
                        event: event.event,
                        match_id: event.match_id,
                        data: event.data,
                    };
                    if send_message(&viewer.tx, &message).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(id = %viewer.id, skipped, "viewer lagged behind; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

/// Serialize a payload and push it onto the viewer's writer channel.
///
/// Fails only when the writer is gone; serialization failures are logged and dropped.
fn send_message(
    tx: &mpsc::UnboundedSender<Message>,
    value: &ViewerOutboundMessage,
) -> Result<(), ViewerError> {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize viewer message `{value:?}`");
            return Ok(());
        }
    };
    tx.send(Message::Text(payload.into()))
        .map_err(|_| ViewerError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
///
/// Every other clone of the sender must already be dropped.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
