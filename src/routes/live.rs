//! Live transaction feed over WebSocket.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade (session cookie required) -> mount a `TransactionAdapter` for
//!    the signed-in owner
//! 2. Every change to the adapter's state is sent as one JSON text message
//!    holding the owner's full list, newest first
//! 3. Client close or send failure -> unmount, releasing the subscription
//!
//! Client messages other than close are ignored.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tracing::{info, warn};

use crate::routes::auth::AuthUser;
use crate::services::transactions::{FeedState, TransactionAdapter};
use crate::state::AppState;

/// `GET /api/transactions/live`
pub async fn handle_live(State(state): State<AppState>, auth: AuthUser, ws: WebSocketUpgrade) -> Response {
    let adapter = TransactionAdapter::new(state.store.clone(), auth.user.uid);
    ws.on_upgrade(move |socket| run_live(socket, adapter))
}

async fn send_state(socket: &mut WebSocket, state: &FeedState) -> Result<(), ()> {
    let text = serde_json::to_string(state).map_err(|e| warn!(error = %e, "live: serialize failed"))?;
    socket.send(Message::Text(text.into())).await.map_err(|_| ())
}

async fn run_live(mut socket: WebSocket, mut adapter: TransactionAdapter) {
    let mut rx = adapter.watch();
    if adapter.mount().await.is_err() {
        // The failure is recorded in local state; report it and stop.
        let _ = send_state(&mut socket, &adapter.snapshot()).await;
        return;
    }
    info!(owner = %adapter.owner_id(), "live: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    None | Some(Err(_) | Ok(Message::Close(_))) => break,
                    Some(Ok(_)) => {}
                }
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                if send_state(&mut socket, &state).await.is_err() {
                    break;
                }
            }
        }
    }

    adapter.unmount();
    info!(owner = %adapter.owner_id(), "live: client disconnected");
}

#[cfg(test)]
#[path = "live_test.rs"]
mod tests;
