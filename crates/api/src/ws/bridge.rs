use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use courier_core::dispatch::validate_identifier;
use courier_core::types::WorkerId;
use courier_events::{parse_status_event, BusError, CommandMessage, EventBus, StatusEvent};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;

use crate::error::AppResult;
use crate::state::AppState;

/// Query parameters for `GET /ws/workers`.
#[derive(Debug, Deserialize)]
pub struct BridgeParams {
    pub worker_id: WorkerId,
}

/// Reasons an inbound frame is dropped instead of reaching the bus.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Malformed status event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Worker {connected} may not report status for {claimed}")]
    WorkerMismatch { connected: String, claimed: String },
}

/// HTTP handler that upgrades a remote worker's connection to WebSocket.
///
/// The worker id is validated before the upgrade so a bad id gets a plain
/// 400 instead of a socket that closes immediately.
pub async fn worker_bridge(
    ws: WebSocketUpgrade,
    Query(params): Query<BridgeParams>,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    validate_identifier("Worker id", &params.worker_id)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, params.worker_id, state.bus)))
}

/// Manage a single worker connection after upgrade.
///
/// Outbound: every [`CommandMessage`] addressed to this worker, as JSON text.
/// Inbound: [`StatusEvent`] JSON text frames, republished on the status
/// channel. Bad frames are logged and skipped.
async fn handle_socket(socket: WebSocket, worker_id: WorkerId, bus: Arc<EventBus>) {
    let mut commands = bus.subscribe_commands();
    tracing::info!(
        worker_id = %worker_id,
        command_subscribers = bus.command_subscriber_count(),
        "Worker bridge connected",
    );
    let (mut sink, mut stream) = socket.split();

    // Sender task: forward this worker's commands to the socket.
    let sender_worker_id = worker_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            match commands.recv().await {
                Ok(command) => {
                    if !command.is_for(&sender_worker_id) {
                        continue;
                    }
                    let text = match encode_command(&command) {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::warn!(job_id = %command.job_id, error = %e, "Dropping command");
                            continue;
                        }
                    };
                    if sink.send(Message::Text(text.into())).await.is_err() {
                        tracing::debug!(worker_id = %sender_worker_id, "Worker bridge sink closed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        worker_id = %sender_worker_id,
                        skipped = n,
                        "Worker bridge lagged, some commands were not forwarded",
                    );
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Receiver loop: inbound status events.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match decode_frame(&worker_id, text.as_str()) {
                Ok(event) => {
                    tracing::trace!(worker_id = %worker_id, kind = event.kind(), "Status event received");
                    bus.publish_status(event);
                }
                Err(e) => {
                    tracing::warn!(worker_id = %worker_id, error = %e, "Ignoring inbound frame");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {
                tracing::debug!(worker_id = %worker_id, "Binary frame ignored");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(worker_id = %worker_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    tracing::info!(worker_id = %worker_id, "Worker bridge disconnected");
}

fn encode_command(command: &CommandMessage) -> Result<String, BusError> {
    Ok(serde_json::to_string(command)?)
}

/// Parse an inbound frame and check a `worker_status` is about this worker.
fn decode_frame(worker_id: &str, text: &str) -> Result<StatusEvent, FrameError> {
    let event = parse_status_event(text)?;
    if let StatusEvent::WorkerStatus(status) = &event {
        if status.worker_id != worker_id {
            return Err(FrameError::WorkerMismatch {
                connected: worker_id.to_string(),
                claimed: status.worker_id.clone(),
            });
        }
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use courier_core::status::{Availability, CommandState};

    use super::*;

    #[test]
    fn own_worker_status_is_accepted() {
        let event = decode_frame(
            "w-1",
            r#"{"type":"worker_status","data":{"worker_id":"w-1","availability":"idle"}}"#,
        )
        .unwrap();
        assert_eq!(event, StatusEvent::worker_status("w-1", Availability::Idle));
    }

    #[test]
    fn status_for_another_worker_is_rejected() {
        let err = decode_frame(
            "w-1",
            r#"{"type":"worker_status","data":{"worker_id":"w-2","availability":"idle"}}"#,
        )
        .unwrap_err();
        assert_matches!(err, FrameError::WorkerMismatch { claimed, .. } if claimed == "w-2");
    }

    #[test]
    fn acks_are_not_tied_to_the_connection() {
        let event = decode_frame(
            "w-1",
            r#"{"type":"command_ack","data":{"command_id":"job-1","state":"SUCCESS"}}"#,
        )
        .unwrap();
        assert_matches!(event, StatusEvent::CommandAck(ack) if ack.state == CommandState::Success);
    }

    #[test]
    fn garbage_is_malformed() {
        assert_matches!(decode_frame("w-1", "not json"), Err(FrameError::Malformed(_)));
    }

    #[test]
    fn commands_encode_as_json_objects() {
        let command = CommandMessage::new("job-1".into(), "w-1".into(), serde_json::json!({"a": 1}));
        let text = encode_command(&command).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["job_id"], "job-1");
        assert_eq!(value["assigned_worker_id"], "w-1");
        assert_eq!(value["payload"]["a"], 1);
    }
}
