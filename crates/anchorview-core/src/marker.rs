//! Compiled marker artifacts
//!
//! The marker compiler is external; its output reaches us as a base64 string
//! (optionally wrapped in a `data:` URL). The bytes are never interpreted here,
//! hosts only turn them into something their tracking library can load.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("marker artifact is empty")]
    Empty,
    #[error("marker artifact is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Opaque compiled fingerprint of a marker photograph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerArtifact {
    bytes: Vec<u8>,
}

impl MarkerArtifact {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MarkerError> {
        if bytes.is_empty() {
            return Err(MarkerError::Empty);
        }
        Ok(Self { bytes })
    }

    /// Decode from base64, accepting a `data:...;base64,` prefix and embedded whitespace
    pub fn from_base64(encoded: &str) -> Result<Self, MarkerError> {
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => encoded,
        };
        let cleaned: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(MarkerError::Empty);
        }
        Self::from_bytes(STANDARD.decode(cleaned)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// SHA256 of the artifact, hex encoded
    pub fn sha256(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}
