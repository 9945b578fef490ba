use crate::broadcast::{BroadcastHub, BroadcastMessage};
use crate::http::AppState;
use axum::{
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

/// Handle WebSocket upgrade
pub async fn handle_websocket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let events = state.hub.subscribe();
        let (sender, receiver) = socket.split();
        serve_subscriber(sender, receiver, events, state.hub)
    })
}

/// Forward live events to one client until it disconnects or the server stops
async fn serve_subscriber<S, R, E>(
    mut sender: S,
    mut receiver: R,
    mut events: broadcast::Receiver<BroadcastMessage>,
    hub: BroadcastHub,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    info!("WebSocket subscriber connected ({} active)", hub.subscriber_count());

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(message) => {
                    if let Err(e) = sender.send(Message::Text(message.json.as_ref().into())).await {
                        debug!("Failed to send event, closing subscriber: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket subscriber lagged, {} events skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {
                    debug!("Ignoring message from subscriber");
                }
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
            },
            _ = hub.closed() => {
                let _ = sender.send(Message::Close(None)).await;
                break;
            }
        }
    }

    info!("WebSocket subscriber disconnected");
}
