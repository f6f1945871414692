// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-CBC sealing with scrypt-derived keys.
//!
//! scrypt is asked for 64 bytes: the first 32 are the AES key, the last 32
//! key the HMAC. PBKDF2's first output block does not depend on the
//! requested length, so the AES key is identical to a plain 32-byte
//! derivation and records written without an `Auth-Tag` still open.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

use super::{EncryptionEnvelope, EncryptionMethod, EnvelopeError};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha256 = Hmac<Sha256>;

pub const SALT_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const AUTH_TAG_LEN: usize = 32;

/// scrypt cost: N = 2^14.
pub const SCRYPT_LOG_N: u8 = 14;
pub const SCRYPT_R: u32 = 8;
pub const SCRYPT_P: u32 = 1;

/// Ciphertext plus the envelope needed to open it.
#[derive(Debug, Clone)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub envelope: EncryptionEnvelope,
}

struct DerivedKeys(Zeroizing<[u8; KEY_LEN * 2]>);

impl DerivedKeys {
    fn cipher_key(&self) -> &[u8] {
        &self.0[..KEY_LEN]
    }

    fn mac_key(&self) -> &[u8] {
        &self.0[KEY_LEN..]
    }
}

fn derive_keys(password: &str, salt: &[u8]) -> Result<DerivedKeys, EnvelopeError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN * 2)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    let mut output = Zeroizing::new([0u8; KEY_LEN * 2]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut output[..])
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    Ok(DerivedKeys(output))
}

fn tag_mac(mac_key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<HmacSha256, EnvelopeError> {
    let mut mac = HmacSha256::new_from_slice(mac_key)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?;
    mac.update(iv);
    mac.update(ciphertext);
    Ok(mac)
}

/// Encrypt `plaintext` under a key derived from `password`.
///
/// A fresh salt and IV are generated on every call. The caller must persist
/// `envelope.to_metadata()` alongside the ciphertext.
pub fn encrypt(plaintext: &[u8], password: &str) -> Result<SealedPayload, EnvelopeError> {
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut iv);

    let keys = derive_keys(password, &salt)?;
    let ciphertext = Aes256CbcEnc::new_from_slices(keys.cipher_key(), &iv)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let auth_tag: [u8; AUTH_TAG_LEN] = tag_mac(keys.mac_key(), &iv, &ciphertext)?
        .finalize()
        .into_bytes()
        .into();

    Ok(SealedPayload {
        ciphertext,
        envelope: EncryptionEnvelope {
            method: EncryptionMethod::Aes256Cbc,
            salt,
            iv,
            auth_tag: Some(auth_tag),
        },
    })
}

/// Decrypt a payload sealed by [`encrypt`] (or by any client writing the
/// same envelope).
///
/// # Errors
///
/// [`EnvelopeError::Decryption`] if the password is wrong or the ciphertext
/// was altered. With an `Auth-Tag` present this is checked before any
/// decryption; without one, invalid PKCS#7 padding is the signal.
pub fn decrypt(
    ciphertext: &[u8],
    password: &str,
    envelope: &EncryptionEnvelope,
) -> Result<Vec<u8>, EnvelopeError> {
    let keys = derive_keys(password, &envelope.salt)?;

    if let Some(expected) = &envelope.auth_tag {
        tag_mac(keys.mac_key(), &envelope.iv, ciphertext)?
            .verify_slice(expected)
            .map_err(|_| EnvelopeError::Decryption)?;
    }

    Aes256CbcDec::new_from_slices(keys.cipher_key(), &envelope.iv)
        .map_err(|e| EnvelopeError::KeyDerivation(e.to_string()))?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EnvelopeError::Decryption)
}
