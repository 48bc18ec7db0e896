// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Encrypted payload envelope for the WalletConnect v1 bridge.
//!
//! Every JSON-RPC message travels as `{data, iv, hmac}`:
//!
//! - `data`: AES-256-CBC ciphertext of the padded JSON body
//! - `iv`: random 16-byte initialisation vector
//! - `hmac`: HMAC-SHA256 over `data ‖ iv`, keyed with the same shared key
//!
//! The MAC is always verified (in constant time) before the ciphertext is
//! touched. Nothing in the envelope binds a sequence number, so replays under
//! the same key are not detected here.

use std::fmt;

use aes::Aes256;
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

/// AES block size, also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Shared key length (AES-256).
pub const KEY_SIZE: usize = 32;

/// HMAC-SHA256 tag length.
pub const MAC_SIZE: usize = 32;

/// Symmetric key shared with the dApp through the pairing URI.
///
/// Wiped on drop. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    /// Build a key from raw bytes, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        let key: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| EnvelopeError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(key))
    }

    /// Build a key from its hex form (as carried in the pairing URI).
    pub fn from_hex(hex_key: &str) -> Result<Self, EnvelopeError> {
        let mut bytes = alloy::hex::decode(hex_key)
            .map_err(|e| EnvelopeError::InvalidHex { field: "key", reason: e.to_string() })?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedKey(<redacted>)")
    }
}

/// Wire form of one encrypted JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Hex-encoded ciphertext.
    pub data: String,
    /// Hex-encoded 16-byte IV.
    pub iv: String,
    /// Hex-encoded HMAC-SHA256 tag.
    pub hmac: String,
}

impl Envelope {
    /// Encrypt and authenticate `plaintext` under `key`.
    pub fn seal(plaintext: &[u8], key: &SharedKey) -> Result<Self, EnvelopeError> {
        let mut iv = [0u8; BLOCK_SIZE];
        OsRng.fill_bytes(&mut iv);
        Self::seal_with_iv(plaintext, key, iv)
    }

    fn seal_with_iv(
        plaintext: &[u8],
        key: &SharedKey,
        iv: [u8; BLOCK_SIZE],
    ) -> Result<Self, EnvelopeError> {
        let mut padded = pad(plaintext);
        let ciphertext = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
            .map_err(|_| EnvelopeError::InvalidKeyLength(KEY_SIZE))?
            .encrypt_padded_vec_mut::<NoPadding>(&padded);
        padded.zeroize();

        let tag = mac(key, &ciphertext, &iv)?.finalize().into_bytes();

        Ok(Self {
            data: alloy::hex::encode(&ciphertext),
            iv: alloy::hex::encode(iv),
            hmac: alloy::hex::encode(tag),
        })
    }

    /// Authenticate and decrypt the envelope.
    ///
    /// Fails with [`EnvelopeError::Authentication`] when the tag does not
    /// match; the ciphertext is never decrypted in that case.
    pub fn open(&self, key: &SharedKey) -> Result<Vec<u8>, EnvelopeError> {
        let iv = decode_field("iv", &self.iv)?;
        let ciphertext = decode_field("data", &self.data)?;
        let tag = decode_field("hmac", &self.hmac)?;

        if iv.len() != BLOCK_SIZE {
            return Err(EnvelopeError::InvalidLength { field: "iv", len: iv.len() });
        }
        if tag.len() != MAC_SIZE {
            return Err(EnvelopeError::InvalidLength { field: "hmac", len: tag.len() });
        }

        mac(key, &ciphertext, &iv)?
            .verify_slice(&tag)
            .map_err(|_| EnvelopeError::Authentication)?;

        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(EnvelopeError::InvalidLength { field: "data", len: ciphertext.len() });
        }

        let mut plaintext = Aes256CbcDec::new_from_slices(key.as_bytes(), &iv)
            .map_err(|_| EnvelopeError::InvalidKeyLength(KEY_SIZE))?
            .decrypt_padded_vec_mut::<NoPadding>(&ciphertext)
            .map_err(|_| EnvelopeError::Padding)?;

        unpad(&mut plaintext)?;
        Ok(plaintext)
    }
}

fn mac(key: &SharedKey, ciphertext: &[u8], iv: &[u8]) -> Result<HmacSha256, EnvelopeError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|_| EnvelopeError::InvalidKeyLength(KEY_SIZE))?;
    mac.update(ciphertext);
    mac.update(iv);
    Ok(mac)
}

fn decode_field(field: &'static str, value: &str) -> Result<Vec<u8>, EnvelopeError> {
    alloy::hex::decode(value).map_err(|e| EnvelopeError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

/// Pad to a whole number of blocks; every pad byte holds the pad length.
fn pad(plaintext: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(plaintext.len() + pad_len);
    padded.extend_from_slice(plaintext);
    padded.resize(plaintext.len() + pad_len, pad_len as u8);
    padded
}

/// Strip padding using only the final byte. The other pad bytes are not
/// checked, matching what WalletConnect v1 peers accept.
fn unpad(plaintext: &mut Vec<u8>) -> Result<(), EnvelopeError> {
    let pad_len = plaintext.last().copied().unwrap_or(0) as usize;
    if pad_len == 0 || pad_len > plaintext.len() {
        return Err(EnvelopeError::Padding);
    }
    plaintext.truncate(plaintext.len() - pad_len);
    Ok(())
}

/// Errors produced while sealing or opening an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Shared key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Invalid hex in `{field}`: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("Invalid length for `{field}`: {len} bytes")]
    InvalidLength { field: &'static str, len: usize },

    #[error("HMAC mismatch")]
    Authentication,

    #[error("Invalid padding")]
    Padding,
}
