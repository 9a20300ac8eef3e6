//! WebSocket upgrade handler and per-connection relay loop

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::session::SessionRegistry;
use crate::util::rate_limit::MessageRateLimiter;
use crate::ws::protocol::{ClientMsg, Envelope, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Run one connection: register the participant, pump its outbox to the
/// socket, and feed inbound frames through the relay until the transport
/// closes.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();

    let (outbox_tx, mut outbox_rx) = tokio::sync::mpsc::unbounded_channel::<ServerMsg>();
    let player_id = state.registry.register(outbox_tx);

    // Writer task: outbox -> WebSocket. Ends when the outbox closes or the
    // peer stops accepting frames.
    let writer_player_id = player_id;
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let rate_limiter = MessageRateLimiter::new();

    // Reader loop: WebSocket -> relay dispatch.
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_message() {
                    warn!(player_id = %player_id, "Rate limited inbound frame");
                    continue;
                }
                handle_frame(&state.registry, player_id, &text);
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary frame, ignoring");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Transport gone: run disconnect cleanup exactly once. The registry
    // removal is idempotent, so racing an in-flight frame is harmless.
    state.registry.remove_participant(player_id);
    writer_handle.abort();
}

/// Parse one text frame and dispatch it. Parse failures answer with an
/// `error` frame and keep the connection alive; spoofed sender ids are
/// dropped without acknowledgement.
pub fn handle_frame(registry: &SessionRegistry, player_id: Uuid, text: &str) {
    let envelope = match serde_json::from_str::<Envelope>(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(player_id = %player_id, error = %e, "Failed to parse client frame");
            registry.send_to(
                player_id,
                ServerMsg::Error {
                    message: "Invalid message format".to_string(),
                },
            );
            return;
        }
    };

    if let Some(claimed) = envelope.player_id {
        if claimed != player_id {
            warn!(
                player_id = %player_id,
                claimed_id = %claimed,
                "Spoof attempt: frame carries a foreign player id"
            );
            return;
        }
    }

    dispatch(registry, player_id, envelope);
}

/// Route a validated envelope to the session registry.
pub fn dispatch(registry: &SessionRegistry, player_id: Uuid, envelope: Envelope) {
    let room_code = envelope.room_code.as_deref();
    match envelope.msg {
        ClientMsg::CreateRoom { player_name } => {
            registry.create_room(player_id, player_name);
        }
        ClientMsg::JoinRoom { player_name } => {
            let result = match room_code {
                Some(code) => registry.join_room(player_id, code, player_name),
                None => Err(crate::session::JoinError::NotFound),
            };
            if let Err(e) = result {
                registry.send_to(
                    player_id,
                    ServerMsg::Error {
                        message: e.to_string(),
                    },
                );
            }
        }
        ClientMsg::PlayerState { state } => {
            registry.relay_pose(
                player_id,
                room_code,
                state,
                envelope.timestamp.unwrap_or_default(),
            );
        }
        ClientMsg::SaberClash { position } => {
            registry.relay_clash(player_id, room_code, position);
        }
        // The embedded damage is only a hint; the registry recomputes it.
        ClientMsg::PlayerHit { part_name, .. } => {
            registry.apply_hit(player_id, room_code, &part_name);
        }
        ClientMsg::RequestRematch => {
            registry.request_rematch(player_id, room_code);
        }
        ClientMsg::Ping { client_timestamp } => {
            registry.send_to(player_id, ServerMsg::Pong { client_timestamp });
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
