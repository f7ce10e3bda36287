/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Relay gateway between the school dashboard and its backend API.
//!
//! Browser calls arrive as `{path, method, data, params}`; the gateway injects
//! the API key, forwards cookies, optionally seals the body in an RSA-OAEP
//! envelope, and relays the backend status, body and `Set-Cookie` headers.
//!
//! # Envelope wire format
//!
//! Backends that exchange sealed bodies with the gateway must follow this
//! format (see [`crypto_envelope`]):
//!
//! - RSA-OAEP with SHA-256 as both the label digest and the MGF1 digest, empty
//!   label. Keys are PEM, PKCS#8 or PKCS#1.
//! - The plaintext is the UTF-8 JSON serialization of the body.
//! - Plaintexts longer than `k - 66` bytes (`k` = modulus length in bytes, so
//!   190 bytes for a 2048-bit key) are cut into `k - 66`-byte chunks, each
//!   encrypted on its own. The ciphertext is the concatenation of the `k`-byte
//!   blocks in order. A single standard OAEP decrypt therefore only handles
//!   bodies that fit one block; larger ones must be decrypted block by block
//!   and the plaintexts concatenated before JSON parsing.
//! - The concatenated ciphertext is base64 encoded with the standard padded
//!   alphabet. Outbound it is sent as a bare JSON string body with
//!   `x-encrypted: 1`; inbound the gateway expects `{"data": "<base64>"}` with
//!   the same header.

pub mod config;
pub mod crypto_envelope;
pub mod keys;
pub mod relay;
pub mod server;

pub use config::{load_config, GatewayConfig};
pub use relay::{resolve_url, ErrorKind, Gateway, RelayError, RelayRequest, RelayResponse};
pub use server::router;
