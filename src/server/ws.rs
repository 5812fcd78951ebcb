//! `/ws` streaming channel.
//!
//! On accept the server sends one greeting, `{"msg": "connected", "time": ...}`,
//! then idles receiving client frames without replying. Client frames are
//! ignored. A client going away (close frame, end of stream, reset) is the
//! normal end of a connection; any other fault is logged at `warn`.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use thiserror::Error;
use uuid::Uuid;

use super::unix_time;

/// Per-connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Greeted,
    Idle,
    Closed,
}

/// A channel fault that is not a client disconnect.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to send greeting: {0}")]
    Greeting(#[source] axum::Error),

    #[error("receive failed: {0}")]
    Receive(#[source] axum::Error),
}

/// How a connection ended without fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSummary {
    pub frames_received: u64,
    pub final_state: ConnectionState,
}

pub async fn ws_handler(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(|socket| async move {
        let connection_id = Uuid::new_v4();
        tracing::debug!(%connection_id, "websocket accepted");
        match run_channel(socket).await {
            Ok(summary) => tracing::debug!(
                %connection_id,
                frames = summary.frames_received,
                "websocket closed by client"
            ),
            Err(e) => tracing::warn!(%connection_id, error = %e, "websocket channel fault"),
        }
    })
}

/// Drive one connection: greet, then receive until the client goes away.
pub async fn run_channel(mut socket: WebSocket) -> Result<ChannelSummary, ChannelError> {
    let mut state = ConnectionState::Open;
    let mut frames_received = 0u64;
    tracing::trace!(?state, "channel open");

    let greeting = serde_json::json!({ "msg": "connected", "time": unix_time() });
    match socket.send(Message::Text(greeting.to_string().into())).await {
        Ok(()) => state = ConnectionState::Greeted,
        Err(e) if is_disconnect(&e) => {
            return Ok(ChannelSummary {
                frames_received,
                final_state: ConnectionState::Closed,
            })
        }
        Err(e) => return Err(ChannelError::Greeting(e)),
    }
    tracing::trace!(?state, "greeting sent");

    loop {
        state = ConnectionState::Idle;
        match socket.recv().await {
            None | Some(Ok(Message::Close(_))) => break,
            Some(Ok(_)) => frames_received += 1,
            Some(Err(e)) if is_disconnect(&e) => break,
            Some(Err(e)) => return Err(ChannelError::Receive(e)),
        }
    }
    tracing::trace!(from = ?state, "channel closing");

    Ok(ChannelSummary {
        frames_received,
        final_state: ConnectionState::Closed,
    })
}

/// Whether a socket error just means the peer went away.
fn is_disconnect(err: &axum::Error) -> bool {
    use tungstenite::error::ProtocolError;

    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(ws) = e.downcast_ref::<tungstenite::Error>() {
            return match ws {
                tungstenite::Error::ConnectionClosed
                | tungstenite::Error::AlreadyClosed
                | tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
                    true
                }
                tungstenite::Error::Io(io) => is_disconnect_kind(io.kind()),
                _ => false,
            };
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if is_disconnect_kind(io.kind()) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

fn is_disconnect_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::BrokenPipe
            | std::io::ErrorKind::UnexpectedEof
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_is_disconnect() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "peer reset",
        ));
        assert!(is_disconnect(&err));
    }

    #[test]
    fn test_closed_socket_is_disconnect() {
        assert!(is_disconnect(&axum::Error::new(
            tungstenite::Error::ConnectionClosed
        )));
        assert!(is_disconnect(&axum::Error::new(tungstenite::Error::AlreadyClosed)));
        assert!(is_disconnect(&axum::Error::new(tungstenite::Error::Protocol(
            tungstenite::error::ProtocolError::ResetWithoutClosingHandshake
        ))));
    }

    #[test]
    fn test_wrapped_io_reset_is_disconnect() {
        let err = axum::Error::new(tungstenite::Error::Io(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "pipe",
        )));
        assert!(is_disconnect(&err));
    }

    #[test]
    fn test_protocol_violation_is_fault() {
        let err = axum::Error::new(tungstenite::Error::Protocol(
            tungstenite::error::ProtocolError::NonZeroReservedBits,
        ));
        assert!(!is_disconnect(&err));

        // Wording alone does not make an error a disconnect.
        let err = axum::Error::new(std::io::Error::other("Connection closed normally"));
        assert!(!is_disconnect(&err));
    }

    #[test]
    fn test_other_io_error_is_fault() {
        let err = axum::Error::new(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(!is_disconnect(&err));
    }
}
