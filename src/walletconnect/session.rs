// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session state machine and read loop.
//!
//! ```text
//! Connecting ──open()──▶ Subscribed ──run()──▶ AwaitingHandshake
//!                                                  │ wc_sessionRequest approved
//!                                                  ▼
//!                              Closed ◀──────── Active
//!                          (relay closed or read error)
//! ```
//!
//! One task owns the session and handles frames strictly one after another:
//! a response is published before the next frame is read. Per-message
//! failures are logged and the message dropped; only transport failures end
//! the loop.

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::{DispatchError, Dispatcher};
use super::envelope::{Envelope, EnvelopeError, SharedKey};
use super::frame::{Frame, FrameType};
use super::relay::{Relay, RelayError};
use super::rpc::{
    JsonRpcRequest, JsonRpcResponse, ParamsError, PeerMeta, SessionRequestParams, WcRequest,
};
use super::uri::PairingUri;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Subscribed,
    AwaitingHandshake,
    Active,
    Closed,
}

/// A paired WalletConnect session over one relay connection.
pub struct Session<R: Relay> {
    relay: R,
    topic: String,
    self_id: String,
    /// Set once, when the handshake is approved.
    peer_id: Option<String>,
    peer_meta: Option<PeerMeta>,
    key: SharedKey,
    state: SessionState,
    dispatcher: Dispatcher,
}

impl<R: Relay> Session<R> {
    /// Create a session for `uri` on an already connected relay.
    pub fn new(relay: R, uri: &PairingUri, dispatcher: Dispatcher) -> Self {
        Self {
            relay,
            topic: uri.topic().to_string(),
            self_id: Uuid::new_v4().to_string(),
            peer_id: None,
            peer_meta: None,
            key: uri.key().clone(),
            state: SessionState::Connecting,
            dispatcher,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Our own client id; responses from the dApp arrive on this topic.
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    pub fn peer_id(&self) -> Option<&str> {
        self.peer_id.as_deref()
    }

    pub fn peer_meta(&self) -> Option<&PeerMeta> {
        self.peer_meta.as_ref()
    }

    pub fn relay(&self) -> &R {
        &self.relay
    }

    /// Give the relay back, e.g. to close it.
    pub fn into_relay(self) -> R {
        self.relay
    }

    /// Subscribe to the pairing topic and our own id. Failure is fatal.
    pub async fn open(&mut self) -> Result<(), RelayError> {
        self.relay.subscribe(&self.topic).await?;
        self.relay.subscribe(&self.self_id).await?;
        self.state = SessionState::Subscribed;
        info!(topic = %self.topic, self_id = %self.self_id, "Waiting for session request");
        Ok(())
    }

    /// Process frames until the relay closes or a read fails.
    ///
    /// Opens the session first if [`Session::open`] was not called.
    pub async fn run(&mut self) -> Result<(), RelayError> {
        if self.state == SessionState::Connecting {
            self.open().await?;
        }
        if self.state == SessionState::Subscribed {
            self.state = SessionState::AwaitingHandshake;
        }

        while self.state != SessionState::Closed {
            match self.relay.next_frame().await {
                Ok(Some(frame)) => self.handle_frame(frame).await,
                Ok(None) => {
                    info!("Relay connection closed");
                    self.state = SessionState::Closed;
                }
                Err(e) => {
                    warn!(error = %e, "Relay read failed");
                    self.state = SessionState::Closed;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Handle one inbound frame. Never fails: problems are logged and the
    /// frame dropped.
    pub async fn handle_frame(&mut self, frame: Frame) {
        if frame.frame_type != FrameType::Pub {
            debug!(topic = %frame.topic, "Ignoring non-publish frame");
            return;
        }

        let response = match self.process(&frame).await {
            Ok(Some(response)) => response,
            Ok(None) => return,
            Err(e) => {
                warn!(topic = %frame.topic, error = %e, "Dropping message");
                return;
            }
        };

        if let Err(e) = self.respond(&response).await {
            warn!(id = response.id, error = %e, "Couldn't send response");
        }
    }

    async fn process(&mut self, frame: &Frame) -> Result<Option<JsonRpcResponse>, SessionError> {
        let envelope = frame.envelope().map_err(SessionError::MalformedEnvelope)?;
        let plaintext = envelope.open(&self.key)?;
        let request: JsonRpcRequest =
            serde_json::from_slice(&plaintext).map_err(SessionError::MalformedRequest)?;
        debug!(
            id = request.id,
            method = %request.method,
            payload = %String::from_utf8_lossy(&plaintext),
            "Request received"
        );

        let id = request.id;
        let decoded = WcRequest::decode(&request)?;

        match self.state {
            SessionState::AwaitingHandshake => match decoded {
                WcRequest::SessionRequest(params) => self.handshake(id, params).await.map(Some),
                other => {
                    warn!(id, method = other.method(), "Ignoring request before session handshake");
                    Ok(None)
                }
            },
            SessionState::Active => Ok(self.dispatcher.dispatch(id, decoded).await?),
            state => {
                debug!(id, ?state, "Ignoring request outside of a running session");
                Ok(None)
            }
        }
    }

    async fn handshake(
        &mut self,
        id: i64,
        params: SessionRequestParams,
    ) -> Result<JsonRpcResponse, SessionError> {
        let meta = params.peer_meta.clone().unwrap_or_default();
        info!(
            peer_id = %params.peer_id,
            name = %meta.name,
            url = %meta.url,
            "Session request"
        );

        let response = self
            .dispatcher
            .approve_session(id, &self.self_id, &params)
            .await?;

        self.peer_id = Some(params.peer_id);
        self.peer_meta = params.peer_meta;
        self.state = SessionState::Active;
        info!(peer_id = ?self.peer_id, "Session approved");
        Ok(response)
    }

    /// Encrypt `response` and publish it to the peer.
    async fn respond(&mut self, response: &JsonRpcResponse) -> Result<(), SessionError> {
        let peer_id = self.peer_id.as_deref().ok_or(SessionError::NoPeer)?;

        let plaintext = serde_json::to_vec(response).map_err(SessionError::Encoding)?;
        let envelope = Envelope::seal(&plaintext, &self.key)?;
        let payload = serde_json::to_string(&envelope).map_err(SessionError::Encoding)?;

        self.relay.publish(peer_id, payload).await?;
        debug!(id = response.id, peer_id, "Response published");
        Ok(())
    }
}

impl<R: Relay> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("topic", &self.topic)
            .field("self_id", &self.self_id)
            .field("peer_id", &self.peer_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Reasons a single message is dropped.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("Plaintext is not a JSON-RPC request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Couldn't encode response: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("No peer to respond to")]
    NoPeer,

    #[error(transparent)]
    Relay(#[from] RelayError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walletconnect::test_support::{
        test_account, FakeChain, FakeRelay, ScriptedConfirmer,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;

    const TOPIC: &str = "8c5ea5ac-5dbb-4b8e-9e69-2f5c8f2a6f3b";
    const KEY_HEX: &str = "7ba379f7f9c8d6c6aa0e19f1ea5a3d2b4e1d0a2b8a7dc1f5d1f6e8c1a9b63b3b";
    const DAPP: &str = "dapp-peer-id";

    struct Harness {
        session: Session<FakeRelay>,
        key: SharedKey,
        chain: Arc<FakeChain>,
        confirmer: Arc<ScriptedConfirmer>,
    }

    fn harness(answers: &[bool]) -> Harness {
        let uri = PairingUri::parse(&format!(
            "wc:{TOPIC}@1?bridge=https%3A%2F%2Fbridge.example.org&key={KEY_HEX}"
        ))
        .unwrap();
        let chain = Arc::new(FakeChain::default());
        let confirmer = Arc::new(ScriptedConfirmer::new(answers));
        let dispatcher = Dispatcher::new(test_account(), chain.clone(), confirmer.clone());
        Harness {
            session: Session::new(FakeRelay::default(), &uri, dispatcher),
            key: uri.key().clone(),
            chain,
            confirmer,
        }
    }

    fn encrypted(key: &SharedKey, topic: &str, request: Value) -> Frame {
        let envelope = Envelope::seal(request.to_string().as_bytes(), key).unwrap();
        Frame::with_envelope(topic, &envelope).unwrap()
    }

    fn session_request(id: i64) -> Value {
        json!({
            "id": id,
            "jsonrpc": "2.0",
            "method": "wc_sessionRequest",
            "params": [{"peerId": DAPP, "peerMeta": {"name": "Test dApp", "url": "https://dapp.example"}, "chainId": 43113}]
        })
    }

    fn personal_sign(id: i64, hex_message: &str) -> Value {
        json!({"id": id, "jsonrpc": "2.0", "method": "personal_sign", "params": [hex_message, "0x00"]})
    }

    fn responses(h: &Harness) -> Vec<(String, JsonRpcResponse)> {
        h.session
            .relay()
            .published
            .iter()
            .map(|(topic, payload)| {
                let envelope: Envelope = serde_json::from_str(payload).unwrap();
                let plaintext = envelope.open(&h.key).unwrap();
                (topic.clone(), serde_json::from_slice(&plaintext).unwrap())
            })
            .collect()
    }

    #[tokio::test]
    async fn test_open_subscribes_topic_and_self_id() {
        let mut h = harness(&[]);
        h.session.open().await.unwrap();

        assert_eq!(h.session.state(), SessionState::Subscribed);
        assert_eq!(
            h.session.relay().subscribed,
            vec![TOPIC.to_string(), h.session.self_id().to_string()]
        );
        assert!(Uuid::parse_str(h.session.self_id()).is_ok());
    }

    #[tokio::test]
    async fn test_handshake_approves_and_responds_to_peer() {
        let mut h = harness(&[true]);
        let frame = encrypted(&h.key, TOPIC, session_request(1));
        h.session.relay.inbound.push_back(frame);

        h.session.run().await.unwrap();

        assert_eq!(h.session.peer_id(), Some(DAPP));
        assert_eq!(h.session.peer_meta().unwrap().name, "Test dApp");

        let published = responses(&h);
        assert_eq!(published.len(), 1);
        let (topic, response) = &published[0];
        assert_eq!(topic, DAPP);
        assert_eq!(response.id, 1);
        assert_eq!(response.result["peerId"], h.session.self_id());
        assert_eq!(response.result["approved"], true);
        assert_eq!(response.result["chainId"], 43113);

        // relay ran dry
        assert_eq!(h.session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_request_before_handshake_is_dropped() {
        let mut h = harness(&[true]);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;

        let frame = encrypted(&h.key, TOPIC, personal_sign(5, "0x68656c6c6f"));
        h.session.handle_frame(frame).await;

        assert_eq!(h.session.state(), SessionState::AwaitingHandshake);
        assert!(h.session.peer_id().is_none());
        assert!(h.session.relay().published.is_empty());
        assert!(h.confirmer.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_declined_handshake_keeps_waiting() {
        let mut h = harness(&[false, true]);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;

        h.session.handle_frame(encrypted(&h.key, TOPIC, session_request(1))).await;
        assert_eq!(h.session.state(), SessionState::AwaitingHandshake);
        assert!(h.session.peer_id().is_none());
        assert!(h.session.relay().published.is_empty());

        // a retried request can still be approved
        h.session.handle_frame(encrypted(&h.key, TOPIC, session_request(2))).await;
        assert_eq!(h.session.state(), SessionState::Active);
        assert_eq!(responses(&h)[0].1.id, 2);
    }

    #[tokio::test]
    async fn test_responses_follow_request_order() {
        let mut h = harness(&[true, true, true, true]);
        let self_id = h.session.self_id().to_string();
        let inbound = vec![
            encrypted(&h.key, TOPIC, session_request(1)),
            encrypted(&h.key, &self_id, personal_sign(2, "0x6f6e65")),
            encrypted(
                &h.key,
                &self_id,
                json!({"id": 3, "jsonrpc": "2.0", "method": "eth_sendTransaction",
                       "params": [{"to": "0x5425890298aed601595a70ab815c96711a31bc65", "value": "0x1"}]}),
            ),
            encrypted(&h.key, &self_id, personal_sign(4, "0x74776f")),
        ];
        h.session.relay.inbound.extend(inbound);

        h.session.run().await.unwrap();

        let ids: Vec<i64> = responses(&h).iter().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert!(responses(&h).iter().all(|(topic, _)| topic == DAPP));
        assert_eq!(h.chain.submitted().len(), 1);
    }

    #[tokio::test]
    async fn test_tampered_frame_is_dropped_without_state_change() {
        let mut h = harness(&[true]);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;

        let mut frame = encrypted(&h.key, TOPIC, session_request(1));
        let mut envelope = frame.envelope().unwrap();
        envelope.hmac = "00".repeat(32);
        frame.payload = serde_json::to_string(&envelope).unwrap();
        h.session.handle_frame(frame).await;

        let wrong_key = SharedKey::from_slice(&[9u8; 32]).unwrap();
        h.session.handle_frame(encrypted(&wrong_key, TOPIC, session_request(2))).await;

        h.session.handle_frame(Frame::publish(TOPIC, "not json")).await;

        assert_eq!(h.session.state(), SessionState::AwaitingHandshake);
        assert!(h.confirmer.prompts().is_empty());
        assert!(h.session.relay().published.is_empty());
    }

    #[tokio::test]
    async fn test_session_update_does_not_end_session() {
        let mut h = harness(&[true, true]);
        let self_id = h.session.self_id().to_string();
        let inbound = vec![
            encrypted(&h.key, TOPIC, session_request(1)),
            encrypted(
                &h.key,
                &self_id,
                json!({"id": 2, "jsonrpc": "2.0", "method": "wc_sessionUpdate",
                       "params": [{"approved": false, "chainId": null, "accounts": null}]}),
            ),
            encrypted(&h.key, &self_id, personal_sign(3, "0x6f6e65")),
        ];
        h.session.relay.inbound.extend(inbound);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;

        for _ in 0..2 {
            let frame = h.session.relay.inbound.pop_front().unwrap();
            h.session.handle_frame(frame).await;
        }
        assert_eq!(h.session.state(), SessionState::Active);

        // only the closed relay ends the loop, after every frame was read
        h.session.run().await.unwrap();
        assert!(h.session.relay().inbound.is_empty());
        let ids: Vec<i64> = responses(&h).iter().map(|(_, r)| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_second_session_request_is_not_answered() {
        let mut h = harness(&[true, true]);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;

        h.session.handle_frame(encrypted(&h.key, TOPIC, session_request(1))).await;
        h.session.handle_frame(encrypted(&h.key, TOPIC, session_request(2))).await;

        assert_eq!(h.session.state(), SessionState::Active);
        assert_eq!(responses(&h).len(), 1);
        assert_eq!(h.confirmer.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_operation_sends_nothing() {
        let mut h = harness(&[true, false]);
        h.session.open().await.unwrap();
        h.session.state = SessionState::AwaitingHandshake;
        h.session.handle_frame(encrypted(&h.key, TOPIC, session_request(1))).await;

        let self_id = h.session.self_id().to_string();
        h.session.handle_frame(encrypted(&h.key, &self_id, personal_sign(2, "0x6f6e65"))).await;

        assert_eq!(h.session.state(), SessionState::Active);
        assert_eq!(responses(&h).len(), 1);
    }
}
