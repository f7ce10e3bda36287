/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! RSA-OAEP (SHA-256) body envelopes.
//!
//! The whole JSON body is serialized and encrypted as one blob. Plaintexts
//! larger than a single OAEP block are split into blocks that are encrypted
//! independently; the ciphertext is the concatenation of `k`-byte blocks
//! (`k` = modulus size), base64 encoded with the standard alphabet.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use crate::keys::{PrivateKeyMaterial, PublicKeyMaterial};

const SHA256_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("missing {0} key")]
    MissingKey(&'static str),

    #[error("invalid {0} key: {1}")]
    InvalidKey(&'static str, String),

    #[error("rsa encrypt: {0}")]
    Encrypt(String),

    #[error("invalid base64 ciphertext: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("rsa decrypt: {0}")]
    Decrypt(String),

    #[error("encrypted body has no data field")]
    MissingCiphertext,

    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Encrypts `data` under a PEM public key. Parses the key on every call.
pub fn encrypt(data: &Value, public_key_pem: &str) -> Result<String, EnvelopeError> {
    PublicKeyMaterial::from_pem(public_key_pem)?.encrypt_json(data)
}

/// Decrypts base64 ciphertext under a PEM private key and parses the JSON plaintext.
pub fn decrypt(ciphertext_b64: &str, private_key_pem: &str) -> Result<Value, EnvelopeError> {
    PrivateKeyMaterial::from_pem(private_key_pem)?.decrypt_json(ciphertext_b64)
}

impl PublicKeyMaterial {
    pub fn encrypt_json(&self, data: &Value) -> Result<String, EnvelopeError> {
        let plaintext = serde_json::to_vec(data)?;
        let ciphertext = encrypt_blocks(&self.key, &plaintext)?;
        Ok(B64.encode(ciphertext))
    }
}

impl PrivateKeyMaterial {
    pub fn decrypt_json(&self, ciphertext_b64: &str) -> Result<Value, EnvelopeError> {
        let plaintext = self.decrypt_bytes(ciphertext_b64)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    pub fn decrypt_bytes(&self, ciphertext_b64: &str) -> Result<Vec<u8>, EnvelopeError> {
        let ciphertext = B64.decode(ciphertext_b64.trim().as_bytes())?;
        decrypt_blocks(&self.key, &ciphertext)
    }
}

fn max_block_len(modulus_len: usize) -> Result<usize, EnvelopeError> {
    modulus_len
        .checked_sub(2 * SHA256_LEN + 2)
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            EnvelopeError::InvalidKey("public", "modulus too small for oaep".to_string())
        })
}

pub(crate) fn encrypt_blocks(
    key: &RsaPublicKey,
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let k = key.size();
    let block = max_block_len(k)?;
    let mut out = Vec::with_capacity(plaintext.len().div_ceil(block).max(1) * k);
    let mut rng = OsRng;
    // An empty plaintext still yields one block so the envelope is never empty.
    let chunks: Vec<&[u8]> = if plaintext.is_empty() {
        vec![plaintext]
    } else {
        plaintext.chunks(block).collect()
    };
    for chunk in chunks {
        let ct = key
            .encrypt(&mut rng, Oaep::new::<Sha256>(), chunk)
            .map_err(|e| EnvelopeError::Encrypt(e.to_string()))?;
        out.extend_from_slice(&ct);
    }
    Ok(out)
}

fn decrypt_blocks(key: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let k = key.size();
    if ciphertext.is_empty() || ciphertext.len() % k != 0 {
        return Err(EnvelopeError::Decrypt(format!(
            "ciphertext length {} is not a multiple of {k}",
            ciphertext.len()
        )));
    }
    let mut out = Vec::with_capacity(ciphertext.len());
    for chunk in ciphertext.chunks(k) {
        let pt = key
            .decrypt(Oaep::new::<Sha256>(), chunk)
            .map_err(|e| EnvelopeError::Decrypt(e.to_string()))?;
        out.extend_from_slice(&pt);
    }
    Ok(out)
}
