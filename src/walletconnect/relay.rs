// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WebSocket bridge transport.
//!
//! # Frame Handling Invariants
//!
//! - One WebSocket text message = one [`Frame`]
//! - Each `publish()` / `subscribe()` = exactly one `ws.send(Text(..))`, no retry
//! - `next_frame()` yields frames in arrival order and is only ever driven by
//!   one consumer, so inbound messages are never handled concurrently
//! - A topic is subscribed at most once per connection

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{self, protocol::Message as WsMessage},
    MaybeTlsStream, WebSocketStream,
};
use url::Url;

use super::frame::Frame;

/// Pub/sub transport the session runs on.
#[async_trait]
pub trait Relay: Send {
    /// Subscribe to `topic`. Repeated calls for the same topic are no-ops.
    async fn subscribe(&mut self, topic: &str) -> Result<(), RelayError>;

    /// Publish `payload` on `topic`. One attempt; failures are returned.
    async fn publish(&mut self, topic: &str, payload: String) -> Result<(), RelayError>;

    /// Wait for the next inbound frame. `Ok(None)` means the connection closed.
    async fn next_frame(&mut self) -> Result<Option<Frame>, RelayError>;
}

/// Bridge connection over a single WebSocket.
///
/// Does not implement `Clone` to prevent socket duplication.
pub struct WsRelay {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: Url,
    subscriptions: HashSet<String>,
}

impl std::fmt::Debug for WsRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsRelay")
            .field("url", &self.url.as_str())
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl WsRelay {
    /// Open the bridge connection. Failure is fatal for the client.
    pub async fn connect(url: &Url) -> Result<Self, RelayError> {
        let (ws, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| RelayError::ConnectionFailed(format!("{url}: {e}")))?;

        tracing::info!(bridge = %url, "Connected to bridge");

        Ok(Self {
            ws,
            url: url.clone(),
            subscriptions: HashSet::new(),
        })
    }

    async fn send_frame(&mut self, frame: &Frame) -> Result<(), RelayError> {
        let text = serde_json::to_string(frame)?;
        self.ws
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| RelayError::WebSocket(e.to_string()))
    }

    /// Close the socket politely. Errors are ignored, the peer may be gone.
    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}

#[async_trait]
impl Relay for WsRelay {
    async fn subscribe(&mut self, topic: &str) -> Result<(), RelayError> {
        if self.subscriptions.contains(topic) {
            tracing::debug!(topic, "Already subscribed");
            return Ok(());
        }
        self.send_frame(&Frame::subscribe(topic)).await?;
        self.subscriptions.insert(topic.to_string());
        tracing::debug!(topic, "Subscribed");
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: String) -> Result<(), RelayError> {
        self.send_frame(&Frame::publish(topic, payload)).await
    }

    async fn next_frame(&mut self) -> Result<Option<Frame>, RelayError> {
        loop {
            let msg = match self.ws.next().await {
                None => return Ok(None),
                Some(Ok(msg)) => msg,
                Some(Err(tungstenite::Error::ConnectionClosed))
                | Some(Err(tungstenite::Error::AlreadyClosed)) => return Ok(None),
                Some(Err(e)) => return Err(RelayError::WebSocket(e.to_string())),
            };

            match msg {
                WsMessage::Text(text) => match serde_json::from_str::<Frame>(&text) {
                    Ok(frame) => return Ok(Some(frame)),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring malformed bridge frame");
                    }
                },
                WsMessage::Close(reason) => {
                    tracing::info!(?reason, "Bridge closed the connection");
                    return Ok(None);
                }
                WsMessage::Binary(_) => {
                    tracing::warn!("Ignoring binary bridge message");
                }
                // Pongs are queued by tungstenite itself.
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
            }
        }
    }
}

/// Errors that can occur on the bridge connection.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Couldn't connect to bridge {0}")]
    ConnectionFailed(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("Frame serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
