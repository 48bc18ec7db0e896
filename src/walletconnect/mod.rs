// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! WalletConnect v1 remote-signing peer.
//!
//! This module provides:
//! - Pairing URI parsing
//! - The encrypted envelope codec (AES-256-CBC + HMAC-SHA256)
//! - The bridge transport (`sub`/`pub` frames over one WebSocket)
//! - The session state machine and the JSON-RPC dispatcher

pub mod dispatcher;
pub mod envelope;
pub mod frame;
pub mod relay;
pub mod rpc;
pub mod session;
pub mod uri;

pub use dispatcher::{DispatchError, Dispatcher};
pub use envelope::{Envelope, EnvelopeError, SharedKey};
pub use frame::{Frame, FrameType};
pub use relay::{Relay, RelayError, WsRelay};
pub use rpc::{JsonRpcRequest, JsonRpcResponse, WcRequest};
pub use session::{Session, SessionError, SessionState};
pub use uri::{PairingUri, UriError};
