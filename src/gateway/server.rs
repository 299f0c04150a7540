//! WebSocket transport
//! Accepts client connections, decodes their events and feeds the writer side of
//! each connection from the client registry.

use crate::commands;
use crate::gateway::{Broadcaster, ClientRegistry};
use crate::models::{ClientEvent, ClientId, ServerEvent};
use crate::services::Workspace;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub registry: Arc<ClientRegistry>,
    /// `None` accepts any origin
    pub allowed_origin: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(upgrade))
        .route("/ws", get(upgrade))
        .with_state(state)
}

/// Browsers always send `Origin`; tools that omit it are let through
pub fn origin_allowed(headers: &HeaderMap, allowed: Option<&str>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    match headers.get(header::ORIGIN) {
        Some(origin) => origin.to_str().map(|o| o == allowed).unwrap_or(false),
        None => true,
    }
}

async fn upgrade(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    if !origin_allowed(&headers, state.allowed_origin.as_deref()) {
        log::warn!(
            "Rejected connection from origin {:?}",
            headers.get(header::ORIGIN)
        );
        return StatusCode::FORBIDDEN.into_response();
    }
    ws.on_upgrade(move |socket| serve_client(socket, state))
}

/// Inbound work for the blocking pool
enum Inbound {
    Event(ClientEvent),
    RawInput(Vec<u8>),
}

async fn serve_client(socket: WebSocket, state: AppState) {
    let (client, mut outbound) = state.registry.connect();
    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("Failed to encode {}: {}", event.name(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        // Queue closed: the client disconnected or was dropped for falling behind
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let inbound = match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(text.as_str()) {
                Ok(event) => Inbound::Event(event),
                Err(e) => {
                    log::debug!("{client} sent a malformed event: {e}");
                    state
                        .registry
                        .send_to(client, ServerEvent::error(format!("Malformed event: {e}")));
                    continue;
                }
            },
            Ok(Message::Binary(bytes)) => Inbound::RawInput(bytes.to_vec()),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                log::debug!("{client} connection error: {e}");
                break;
            }
        };

        // Awaited before the next frame so one client's events stay in order
        let workspace = state.workspace.clone();
        let handled =
            tokio::task::spawn_blocking(move || handle(&workspace, client, inbound)).await;
        if let Err(e) = handled {
            log::error!("{client} handler panicked: {e}");
        }
    }

    state.registry.disconnect(client);
    writer.abort();
}

fn handle(workspace: &Workspace, client: ClientId, inbound: Inbound) {
    match inbound {
        Inbound::Event(event) => commands::dispatch(workspace, client, event),
        Inbound::RawInput(data) => commands::terminal::terminal_input(workspace, client, &data),
    }
}
