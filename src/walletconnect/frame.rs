// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bridge wire frames: `{"topic": .., "type": "sub" | "pub", "payload": ..}`.

use serde::{Deserialize, Serialize};

use super::envelope::Envelope;

/// Frame kind understood by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    /// Subscribe to a topic; payload is empty.
    Sub,
    /// Publish a serialized envelope to a topic.
    Pub,
}

/// One message on the bridge socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub topic: String,
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    #[serde(default)]
    pub payload: String,
}

impl Frame {
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            frame_type: FrameType::Sub,
            payload: String::new(),
        }
    }

    pub fn publish(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            frame_type: FrameType::Pub,
            payload: payload.into(),
        }
    }

    /// Wrap an envelope into a `pub` frame for `topic`.
    pub fn with_envelope(topic: impl Into<String>, envelope: &Envelope) -> serde_json::Result<Self> {
        Ok(Self::publish(topic, serde_json::to_string(envelope)?))
    }

    /// Decode the payload as an envelope.
    pub fn envelope(&self) -> serde_json::Result<Envelope> {
        serde_json::from_str(&self.payload)
    }
}
