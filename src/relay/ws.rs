use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::Result;

use super::UpdateBus;

/// Shared state for the relay router
#[derive(Clone)]
pub struct RelayState {
    pub bus: Arc<UpdateBus>,
}

/// Synthetic acknowledgment sent to every observer on connect
#[derive(Debug, Serialize)]
struct ConnectedAck {
    order_id: Uuid,
    status: &'static str,
    timestamp: DateTime<Utc>,
    message: &'static str,
}

impl ConnectedAck {
    fn new(order_id: Uuid) -> Self {
        Self {
            order_id,
            status: "connected",
            timestamp: Utc::now(),
            message: "listening for order updates",
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn order_updates_handler(
    ws: WebSocketUpgrade,
    Path(order_id): Path<Uuid>,
    State(state): State<RelayState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, order_id))
}

async fn handle_socket(socket: WebSocket, state: RelayState, order_id: Uuid) {
    info!(%order_id, "observer connected");

    // The subscription guard releases the per-order channel exactly once,
    // whichever way this function returns.
    let mut subscription = state.bus.clone().subscribe(order_id);
    let (mut sender, mut receiver) = socket.split();

    let ack = match serde_json::to_string(&ConnectedAck::new(order_id)) {
        Ok(json) => json,
        Err(e) => {
            error!(%order_id, error = %e, "failed to serialize connected ack");
            return;
        }
    };
    if sender.send(Message::Text(ack)).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            update = subscription.recv() => {
                let Some(update) = update else { break };
                let json = match serde_json::to_string(&update) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(%order_id, error = %e, "failed to serialize order update");
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
                debug!(%order_id, status = %update.status, "sent observer update");
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        error!(%order_id, error = %e, "observer transport error");
                        break;
                    }
                    // Pings are answered by axum; other frames are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!(%order_id, "observer disconnected");
}

/// Build the relay router: per-order WebSocket subscriptions plus health.
pub fn relay_router(state: RelayState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/ws/orders/:order_id", get(order_updates_handler))
        .with_state(state)
        .layer(cors)
}

/// Serve the relay until the shutdown signal flips.
pub async fn serve(
    bind: &str,
    state: RelayState,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(addr = %listener.local_addr()?, "relay listening");

    axum::serve(listener, relay_router(state))
        .with_graceful_shutdown(async move {
            // Either a flipped flag or a dropped sender ends the relay.
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}
