//! The main client channel: `/connect`.
//!
//! Each connection gets a reader task (decode + dispatch) and a writer task
//! draining the bounded per-connection queue; writes to the socket happen
//! only in the writer, preserving per-recipient ordering.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::pool::OutboundFrame;
use crate::protocol::{
    types::MULTIPLE_CLIENTS_REASON, ConnectionState, MessagePayload, WebSocketMessage,
    MULTIPLE_CLIENTS_CLOSE_CODE,
};
use crate::server::ConnectError;
use crate::store::PlayerRecord;

use super::auth::AuthedPlayer;
use super::AppState;

pub async fn connect(
    State(state): State<AppState>,
    auth: AuthedPlayer,
    upgrade: WebSocketUpgrade,
) -> Response {
    upgrade.on_upgrade(move |socket| handle_socket(socket, state, auth.record))
}

async fn handle_socket(socket: WebSocket, state: AppState, record: PlayerRecord) {
    let (mut sink, mut stream) = socket.split();
    let queue_capacity = state.server.settings().send_queue_capacity.max(1);
    let (tx, mut rx) = mpsc::channel::<OutboundFrame>(queue_capacity);

    let player_id = record.id;
    match state.server.register_client(&record, tx).await {
        Ok(()) => {}
        Err(ConnectError::AlreadyConnected) => {
            // Tell the duplicate client why, then close with the custom
            // code. The original session was warned by the server.
            let payload = MessagePayload::ConnectionState(ConnectionState {
                code: MULTIPLE_CLIENTS_CLOSE_CODE,
                reason: MULTIPLE_CLIENTS_REASON.to_string(),
            });
            if let Ok(frame) = serde_json::to_string(&WebSocketMessage { payload }) {
                let _ = sink.send(Message::Text(frame.into())).await;
            }
            let _ = sink
                .send(Message::Close(Some(CloseFrame {
                    code: MULTIPLE_CLIENTS_CLOSE_CODE,
                    reason: MULTIPLE_CLIENTS_REASON.into(),
                })))
                .await;
            return;
        }
        Err(err) => {
            tracing::error!(player_id = %player_id, error = %err, "failed to register connection");
            let _ = sink.close().await;
            return;
        }
    }

    // Writer: the only task touching the sink after registration.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink
                .send(Message::Text(frame.to_string().into()))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Reader: decode and dispatch until the peer goes away. Handler and
    // decode errors are logged and the loop continues.
    let server = state.server.clone();
    let receive_task = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            let message = match message {
                Ok(message) => message,
                Err(err) => {
                    tracing::debug!(player_id = %player_id, error = %err, "websocket read error");
                    break;
                }
            };
            match message {
                Message::Text(text) => {
                    match serde_json::from_str::<WebSocketMessage>(&text) {
                        Ok(envelope) => {
                            server.handle_client_message(player_id, envelope.payload).await;
                        }
                        Err(err) => {
                            tracing::warn!(player_id = %player_id, error = %err, "undecodable inbound frame");
                        }
                    }
                }
                Message::Close(_) => break,
                // Binary frames are not part of the protocol; control
                // frames are handled by the transport.
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    state.server.unregister_client(player_id).await;
}
