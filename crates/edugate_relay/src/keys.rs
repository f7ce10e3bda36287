/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey},
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    RsaPrivateKey, RsaPublicKey,
};
use std::{fs, path::Path};

use crate::crypto_envelope::EnvelopeError;

/// Backend public key, parsed once at startup.
#[derive(Clone, Debug)]
pub struct PublicKeyMaterial {
    pub key: RsaPublicKey,
}

impl PublicKeyMaterial {
    /// Accepts PKCS#8 (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`).
    pub fn from_pem(pem: &str) -> Result<Self, EnvelopeError> {
        let pem = pem.trim();
        if pem.is_empty() {
            return Err(EnvelopeError::MissingKey("public"));
        }
        let key = match RsaPublicKey::from_public_key_pem(pem) {
            Ok(key) => key,
            Err(e) => RsaPublicKey::from_pkcs1_pem(pem)
                .map_err(|_| EnvelopeError::InvalidKey("public", e.to_string()))?,
        };
        Ok(Self { key })
    }
}

/// Gateway private key, parsed once at startup.
#[derive(Clone)]
pub struct PrivateKeyMaterial {
    pub key: RsaPrivateKey,
}

impl PrivateKeyMaterial {
    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) or PKCS#1 (`BEGIN RSA PRIVATE KEY`).
    pub fn from_pem(pem: &str) -> Result<Self, EnvelopeError> {
        let pem = pem.trim();
        if pem.is_empty() {
            return Err(EnvelopeError::MissingKey("private"));
        }
        let key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(e) => RsaPrivateKey::from_pkcs1_pem(pem)
                .map_err(|_| EnvelopeError::InvalidKey("private", e.to_string()))?,
        };
        Ok(Self { key })
    }

    pub fn public(&self) -> PublicKeyMaterial {
        PublicKeyMaterial {
            key: RsaPublicKey::from(&self.key),
        }
    }
}

impl std::fmt::Debug for PrivateKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKeyMaterial(..)")
    }
}

#[derive(Clone)]
pub struct KeyPairPem {
    pub private_key_pem: String,
    pub public_key_pem: String,
}

pub fn generate_keypair(bits: usize) -> Result<KeyPairPem> {
    let mut rng = OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, bits).context("generate rsa key")?;
    let private_key_pem = private_key.to_pkcs8_pem(LineEnding::LF)?.to_string();
    let public_key_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)?
        .to_string();
    Ok(KeyPairPem {
        private_key_pem,
        public_key_pem,
    })
}

/// Writes `<prefix>_private_key.pem` and `<prefix>_public_key.pem`, refusing to overwrite.
pub fn write_keypair(dir: impl AsRef<Path>, prefix: &str, pair: &KeyPairPem) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("create key dir: {}", dir.display()))?;
    let priv_path = dir.join(format!("{prefix}_private_key.pem"));
    let pub_path = dir.join(format!("{prefix}_public_key.pem"));
    for p in [&priv_path, &pub_path] {
        if p.exists() {
            anyhow::bail!("refusing to overwrite {}", p.display());
        }
    }
    fs::write(&priv_path, &pair.private_key_pem)
        .with_context(|| format!("write {}", priv_path.display()))?;
    fs::write(&pub_path, &pair.public_key_pem)
        .with_context(|| format!("write {}", pub_path.display()))?;
    Ok(())
}

/// Resolves a PEM from an inline value or a file path; inline wins.
pub fn load_pem(inline: Option<String>, file: Option<String>) -> Result<Option<String>> {
    if let Some(v) = inline.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        // Single-line env values often carry literal "\n" escapes.
        return Ok(Some(v.replace("\\n", "\n")));
    }
    let Some(path) = file.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let pem = fs::read_to_string(&path).with_context(|| format!("read {path}"))?;
    Ok(Some(pem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pem_is_missing_key() {
        assert!(matches!(
            PublicKeyMaterial::from_pem("  "),
            Err(EnvelopeError::MissingKey("public"))
        ));
        assert!(matches!(
            PrivateKeyMaterial::from_pem(""),
            Err(EnvelopeError::MissingKey("private"))
        ));
    }

    #[test]
    fn garbage_pem_is_invalid_key() {
        assert!(matches!(
            PublicKeyMaterial::from_pem(
                "-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----"
            ),
            Err(EnvelopeError::InvalidKey("public", _))
        ));
    }

    #[test]
    fn generated_pair_parses_in_both_formats() {
        use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

        let pair = generate_keypair(1024).unwrap();
        let private = PrivateKeyMaterial::from_pem(&pair.private_key_pem).unwrap();
        let public = PublicKeyMaterial::from_pem(&pair.public_key_pem).unwrap();
        assert_eq!(private.public().key, public.key);

        let pkcs1_priv = private.key.to_pkcs1_pem(LineEnding::LF).unwrap();
        let pkcs1_pub = public.key.to_pkcs1_pem(LineEnding::LF).unwrap();
        assert!(PrivateKeyMaterial::from_pem(&pkcs1_priv).is_ok());
        assert!(PublicKeyMaterial::from_pem(&pkcs1_pub).is_ok());
    }

    #[test]
    fn load_pem_prefers_inline_and_unescapes() {
        let pem = load_pem(Some("a\\nb".to_string()), Some("/does/not/exist".to_string())).unwrap();
        assert_eq!(pem.as_deref(), Some("a\nb"));
        assert_eq!(load_pem(None, None).unwrap(), None);
        assert!(load_pem(None, Some("/does/not/exist.pem".to_string())).is_err());
    }

    #[test]
    fn write_keypair_refuses_overwrite() {
        let dir = std::env::temp_dir().join(format!("edugate-keys-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        let pair = KeyPairPem {
            private_key_pem: "priv".to_string(),
            public_key_pem: "pub".to_string(),
        };
        write_keypair(&dir, "gateway", &pair).unwrap();
        assert!(write_keypair(&dir, "gateway", &pair).is_err());
        let _ = fs::remove_dir_all(&dir);
    }
}
