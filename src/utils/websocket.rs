use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::state::AppState;

pub async fn handler(
    State(state): State<AppState>,
    Path(participant_id): Path<String>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, participant_id))
}

/// Streams every public event plus the participant's private ones. Inbound
/// frames are only read to notice the close; submissions go through HTTP.
pub async fn handle_socket(ws: WebSocket, state: AppState, participant_id: String) {
    info!("Event stream opened for participant {}", participant_id);
    let (mut sender, mut receiver) = ws.split();
    let mut rx = state.events.subscribe();

    let send_participant = participant_id.clone();
    let mut send_task = tokio::spawn(async move {
        loop {
            let envelope = match rx.recv().await {
                Ok(envelope) => envelope,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event stream for {} skipped {} events", send_participant, skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !envelope.audience.includes(&send_participant) {
                continue;
            }
            let Ok(text) = serde_json::to_string(&envelope) else {
                continue;
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                warn!("Error sending event to {}: {}", send_participant, e);
                break;
            }
        }
    });

    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("Event stream closed for participant {}", participant_id);
}
