// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encryption Envelope
//!
//! Password-based encryption for record payloads. The envelope is the set of
//! metadata tags that make a ciphertext reversible later:
//!
//! | Tag | Value |
//! |-----|-------|
//! | `Encrypted` | `true` |
//! | `Encryption-Method` | `AES-256-CBC` |
//! | `Salt` | 16 random bytes, hex |
//! | `IV` | 16 random bytes, hex |
//! | `Auth-Tag` | HMAC-SHA256 over `iv \|\| ciphertext`, hex (optional) |
//!
//! ## Key Derivation
//!
//! The key is derived with scrypt using the fixed parameters in [`cipher`]
//! (`N = 2^14`, `r = 8`, `p = 1`). The parameters are not stored on the
//! record, so changing them makes every existing record undecryptable.
//!
//! ## Security
//!
//! - Salt and IV are drawn from the OS RNG on every call and never reused
//! - Derived key material is zeroized on drop
//! - A wrong password is always a hard [`EnvelopeError::Decryption`], never
//!   garbage plaintext
//! - This module performs no I/O

pub mod cipher;

use std::fmt;
use std::str::FromStr;

use crate::metadata::{keys, Metadata, TRUE};

pub use cipher::{decrypt, encrypt, SealedPayload, AUTH_TAG_LEN, IV_LEN, KEY_LEN, SALT_LEN};

/// Errors produced while sealing, opening or reading an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// Wrong password or corrupted ciphertext.
    #[error("Decryption failed: wrong password or corrupted ciphertext")]
    Decryption,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Unsupported encryption method: {0}")]
    UnsupportedMethod(String),

    #[error("Encrypted record is missing the {0} tag")]
    MissingField(&'static str),

    #[error("Envelope tag {field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Supported ciphers. Only one exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncryptionMethod {
    #[default]
    Aes256Cbc,
}

impl EncryptionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncryptionMethod::Aes256Cbc => "AES-256-CBC",
        }
    }
}

impl fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionMethod {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("AES-256-CBC") {
            Ok(EncryptionMethod::Aes256Cbc)
        } else {
            Err(EnvelopeError::UnsupportedMethod(s.to_string()))
        }
    }
}

/// Everything needed (besides the password) to decrypt a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionEnvelope {
    pub method: EncryptionMethod,
    pub salt: [u8; SALT_LEN],
    pub iv: [u8; IV_LEN],
    pub auth_tag: Option<[u8; AUTH_TAG_LEN]>,
}

impl EncryptionEnvelope {
    /// Render the envelope as wire tags.
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new()
            .with(keys::ENCRYPTED, TRUE)
            .with(keys::ENCRYPTION_METHOD, self.method.as_str())
            .with(keys::SALT, hex::encode(self.salt))
            .with(keys::IV, hex::encode(self.iv));
        if let Some(tag) = &self.auth_tag {
            metadata.insert(keys::AUTH_TAG, hex::encode(tag));
        }
        metadata
    }

    /// Read the envelope back from a record's tags.
    ///
    /// Returns `Ok(None)` for records that are not marked `Encrypted=true`.
    /// A record that claims to be encrypted but carries unusable envelope
    /// tags is an error, never treated as plaintext.
    pub fn from_metadata(metadata: &Metadata) -> Result<Option<Self>, EnvelopeError> {
        if !metadata.is_true(keys::ENCRYPTED) {
            return Ok(None);
        }

        // Absent method means the only cipher that has ever been written.
        let method = match metadata.get(keys::ENCRYPTION_METHOD) {
            Some(raw) => raw.parse()?,
            None => EncryptionMethod::default(),
        };

        let salt = decode_fixed::<SALT_LEN>(metadata, keys::SALT)?;
        let iv = decode_fixed::<IV_LEN>(metadata, keys::IV)?;
        let auth_tag = if metadata.contains(keys::AUTH_TAG) {
            Some(decode_fixed::<AUTH_TAG_LEN>(metadata, keys::AUTH_TAG)?)
        } else {
            None
        };

        Ok(Some(Self {
            method,
            salt,
            iv,
            auth_tag,
        }))
    }
}

fn decode_fixed<const N: usize>(
    metadata: &Metadata,
    field: &'static str,
) -> Result<[u8; N], EnvelopeError> {
    let raw = metadata
        .get(field)
        .ok_or(EnvelopeError::MissingField(field))?;
    let bytes = hex::decode(raw.trim()).map_err(|e| EnvelopeError::InvalidField {
        field,
        reason: e.to_string(),
    })?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| EnvelopeError::InvalidField {
            field,
            reason: format!("expected {N} bytes, got {}", bytes.len()),
        })
}
