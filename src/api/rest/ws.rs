use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub courier_id: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state, params.courier_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, courier_filter: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.job_events_tx.subscribe());

    info!(courier_id = ?courier_filter, "job event feed connected");

    let send_task = tokio::spawn(async move {
        while let Some(next) = events.next().await {
            let event = match next {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "job event feed lagged");
                    continue;
                }
            };

            if let Some(courier_id) = &courier_filter {
                if event.courier_id.as_deref() != Some(courier_id.as_str()) {
                    continue;
                }
            }

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize job event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("job event feed disconnected");
}
