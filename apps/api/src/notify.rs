//! Notification fan-out — pushes newly classified jobs to WebSocket
//! subscribers.
//!
//! One broadcast channel feeds every connection; each connection runs a
//! single select loop forwarding broadcasts and answering client frames
//! with a heartbeat. A failed send tears down only that connection.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::models::job::JobRow;
use crate::state::AppState;

/// Events older than this buffer are dropped for slow subscribers rather
/// than blocking the fetch cycle.
const CHANNEL_CAPACITY: usize = 256;

/// Fan-out handle shared by the scheduler (sender side) and the WebSocket
/// handler (receiver side). Cheap to clone.
#[derive(Clone)]
pub struct JobNotifier {
    tx: broadcast::Sender<String>,
}

impl JobNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Announces a newly persisted job to every live subscriber.
    /// A send error only means nobody is listening; that is not a failure.
    pub fn notify_new_job(&self, job: &JobRow) {
        let payload = json!({
            "type": "new_job",
            "data": job,
        })
        .to_string();

        match self.tx.send(payload) {
            Ok(receivers) => {
                info!("Broadcasted new job {} to {receivers} subscriber(s)", job.job_id)
            }
            Err(_) => debug!("No subscribers for new job {}", job.job_id),
        }
    }
}

impl Default for JobNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /api/ws
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    let mut rx = state.notifier.subscribe();
    info!(
        "New WebSocket connection. Total: {}",
        state.notifier.subscriber_count()
    );

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(payload) => {
                    if socket.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket subscriber lagged, skipped {skipped} event(s)");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            frame = socket.recv() => match frame {
                // Any text frame gets a heartbeat reply.
                Some(Ok(Message::Text(_))) => {
                    let pong = json!({ "type": "heartbeat", "message": "pong" }).to_string();
                    if socket.send(Message::Text(pong)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    // rx drops here, which removes this subscriber from the fan-out.
    info!(
        "WebSocket disconnected. Total: {}",
        state.notifier.subscriber_count().saturating_sub(1)
    );
}
