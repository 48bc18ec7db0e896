// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Active account and message signing.
//!
//! The account is loaded once at startup from a hex or PEM private key and
//! is read-only afterwards. The key never leaves this module except as an
//! alloy signer handed to the transaction builder.

use std::fmt;
use std::path::Path;

use alloy::{
    network::EthereumWallet,
    primitives::{keccak256, Address},
    signers::local::PrivateKeySigner,
};
use k256::SecretKey;

use super::client::ChainError;

/// Prefix of the Ethereum "personal sign" digest (EIP-191 version 0x45).
pub const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// The account that signs everything the dApp asks for.
#[derive(Clone)]
pub struct Account {
    signer: PrivateKeySigner,
}

impl Account {
    /// Load from a hex private key (64 characters, optional `0x` prefix).
    pub fn from_hex(private_key_hex: &str) -> Result<Self, ChainError> {
        let trimmed = private_key_hex.trim();
        let key_bytes = alloy::hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

        let signer = PrivateKeySigner::from_slice(&key_bytes)
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Load from PEM-encoded key bytes (SEC1 or PKCS#8).
    pub fn from_pem(pem_bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = secret_key_from_pem(pem_bytes)?;
        let signer = PrivateKeySigner::from_slice(&secret_key.to_bytes())
            .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self { signer })
    }

    /// Load from a PEM file on disk.
    pub fn from_pem_file(path: &Path) -> Result<Self, ChainError> {
        let pem_bytes = std::fs::read(path).map_err(|e| {
            ChainError::InvalidPrivateKey(format!("Couldn't read {}: {}", path.display(), e))
        })?;
        Self::from_pem(&pem_bytes)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Wallet for alloy's signing filler.
    pub fn wallet(&self) -> EthereumWallet {
        EthereumWallet::from(self.signer.clone())
    }

    /// Ethereum personal-sign signature over `message`.
    ///
    /// Digest is `keccak256("\x19Ethereum Signed Message:\n" ‖ len ‖ message)`
    /// where `len` is the decimal byte length. The result is `r ‖ s ‖ v` with
    /// `v = recovery_id + 27`.
    pub fn personal_sign(&self, message: &[u8]) -> Result<[u8; 65], ChainError> {
        let digest = personal_message_hash(message);
        let (signature, recovery_id) = self
            .signer
            .credential()
            .sign_prehash_recoverable(digest.as_slice())
            .map_err(|e| ChainError::InvalidPrivateKey(format!("Signing failed: {}", e)))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(out)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// keccak256 of the prefixed message.
pub fn personal_message_hash(message: &[u8]) -> alloy::primitives::B256 {
    let mut prefixed = Vec::with_capacity(PERSONAL_MESSAGE_PREFIX.len() + 20 + message.len());
    prefixed.extend_from_slice(PERSONAL_MESSAGE_PREFIX.as_bytes());
    prefixed.extend_from_slice(message.len().to_string().as_bytes());
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}

fn secret_key_from_pem(pem_bytes: &[u8]) -> Result<SecretKey, ChainError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid UTF-8: {}", e)))?;

    // Parse the PEM to get the DER-encoded key
    let pem = pem::parse(pem_str)
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid PEM: {}", e)))?;

    SecretKey::from_sec1_der(pem.contents())
        .or_else(|_| {
            // Try parsing as PKCS#8 if SEC1 fails
            use k256::pkcs8::DecodePrivateKey;
            SecretKey::from_pkcs8_der(pem.contents())
        })
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid key format: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::pkcs8::{EncodePrivateKey, LineEnding};

    const SIGN_KEY: &str = "72e06ca1f2a055a4f531d48616a744ca9e0682c32035fadd9f56d814a9704309";
    // "Access zkSync account.\n\nOnly sign this message for a trusted client!"
    const SIGN_MESSAGE: &str = "416363657373207a6b53796e63206163636f756e742e0a0a4f6e6c79207369676e2074686973206d65737361676520666f722061207472757374656420636c69656e7421";
    const SIGN_EXPECTED: &str = "8be981f0d4356c8ad2e32bc9f68384da154cb6f5bdef16306fc8135fe08751604539a8045c838825def79a71c5508650176fd1cf258a003cf74ea5444c9f86ed1c";

    #[test]
    fn test_personal_sign_vector() {
        let account = Account::from_hex(SIGN_KEY).unwrap();
        let message = alloy::hex::decode(SIGN_MESSAGE).unwrap();

        let signature = account.personal_sign(&message).unwrap();
        assert_eq!(alloy::hex::encode(signature), SIGN_EXPECTED);
    }

    #[test]
    fn test_personal_sign_recovers_to_account() {
        let account = Account::from_hex(SIGN_KEY).unwrap();
        let message = b"hello relational";
        let raw = account.personal_sign(message).unwrap();
        assert!(raw[64] == 27 || raw[64] == 28);

        let signature = alloy::primitives::Signature::try_from(&raw[..]).unwrap();
        let recovered = signature
            .recover_address_from_prehash(&personal_message_hash(message))
            .unwrap();
        assert_eq!(recovered, account.address());
    }

    #[test]
    fn test_personal_message_hash_uses_decimal_length() {
        let expected = keccak256(b"\x19Ethereum Signed Message:\n12hello world!");
        assert_eq!(personal_message_hash(b"hello world!"), expected);
    }

    #[test]
    fn test_from_hex_accepts_prefix() {
        let plain = Account::from_hex(SIGN_KEY).unwrap();
        let prefixed = Account::from_hex(&format!("0x{SIGN_KEY}")).unwrap();
        assert_eq!(plain.address(), prefixed.address());
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(matches!(Account::from_hex("xyz"), Err(ChainError::InvalidPrivateKey(_))));
        assert!(matches!(Account::from_hex("abcd"), Err(ChainError::InvalidPrivateKey(_))));
    }

    #[test]
    fn test_from_pem_file_pkcs8() {
        let key_bytes = alloy::hex::decode(SIGN_KEY).unwrap();
        let secret = SecretKey::from_slice(&key_bytes).unwrap();
        let pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        std::fs::write(&path, pem.as_bytes()).unwrap();

        let from_pem = Account::from_pem_file(&path).unwrap();
        let from_hex = Account::from_hex(SIGN_KEY).unwrap();
        assert_eq!(from_pem.address(), from_hex.address());
    }

    #[test]
    fn test_from_pem_rejects_garbage() {
        assert!(matches!(Account::from_pem(b"not a pem"), Err(ChainError::InvalidPrivateKey(_))));
        assert!(matches!(
            Account::from_pem_file(Path::new("/nonexistent/key.pem")),
            Err(ChainError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let account = Account::from_hex(SIGN_KEY).unwrap();
        let rendered = format!("{account:?}");
        assert!(!rendered.contains(SIGN_KEY));
        assert!(rendered.contains("address"));
    }
}
