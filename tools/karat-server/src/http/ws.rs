//! Websocket push of change events.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use axum::Extension;
use futures::{SinkExt, StreamExt};
use karat_cache::SessionId;
use karat_commerce::events::ChangeEvent;
use tokio::sync::broadcast::error::RecvError;

use super::AppState;

/// `GET /ws?session_id=`: stream catalog events plus this session's cart
/// events as `{"event", "data"}` text frames.
pub async fn subscribe(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, state, session))
}

async fn stream_events(socket: WebSocket, state: AppState, session: SessionId) {
    let mut events = state.events().subscribe();
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!(session = %session, "websocket connected");

    // Start the client off with its current cart.
    let lines = match state.carts.get(&session) {
        Ok(cart) => cart.map(|c| c.views()).unwrap_or_default(),
        Err(e) => {
            tracing::warn!(session = %session, error = %e, "failed to load cart for websocket");
            Vec::new()
        }
    };
    let snapshot = ChangeEvent::CartUpdated {
        session: session.to_string(),
        lines,
    };
    if send(&mut sender, &snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if !event.visible_to(Some(session.as_str())) {
                        continue;
                    }
                    if send(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %session, skipped, "websocket subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(session = %session, "websocket disconnected");
}

async fn send<S>(sender: &mut S, event: &ChangeEvent) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = match event.to_json() {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "failed to encode event");
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await.map_err(|_| ())
}
