// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 DevArena

//! Clerk PEM public key loading.
//!
//! Clerk exposes the instance's token signing key as a PEM-encoded RSA public
//! key (Dashboard → API Keys → "PEM public key"). It is parsed once at startup
//! and owned by the [`TokenVerifier`](super::TokenVerifier) for the lifetime
//! of the process.

use std::fmt;
use std::path::Path;

use jsonwebtoken::DecodingKey;

/// PEM labels accepted for the signing key (SPKI and PKCS#1).
const ACCEPTED_PEM_TAGS: [&str; 2] = ["PUBLIC KEY", "RSA PUBLIC KEY"];

/// Errors raised while loading the signing key.
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to parse PEM block containing the public key: {0}")]
    Pem(#[from] pem::PemError),

    #[error("unexpected PEM block `{0}`, expected a public key")]
    UnexpectedTag(String),

    #[error("not an RSA public key: {0}")]
    NotRsa(#[source] jsonwebtoken::errors::Error),

    #[error("failed to read public key file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// RSA public key used to verify Clerk session tokens.
#[derive(Clone)]
pub struct SigningKey {
    decoding: DecodingKey,
}

impl SigningKey {
    /// Parse a PEM-encoded RSA public key.
    pub fn from_pem(pem_text: &str) -> Result<Self, KeyError> {
        let block = pem::parse(pem_text.trim())?;

        if !ACCEPTED_PEM_TAGS.contains(&block.tag()) {
            return Err(KeyError::UnexpectedTag(block.tag().to_string()));
        }

        // Re-encode the single parsed block so trailing garbage never reaches
        // the key parser.
        let decoding =
            DecodingKey::from_rsa_pem(pem::encode(&block).as_bytes()).map_err(KeyError::NotRsa)?;

        Ok(Self { decoding })
    }

    /// Read and parse a PEM file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| KeyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_pem(&text)
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{EC_PUBLIC_PEM, SIGNING_PRIVATE_PEM, SIGNING_PUBLIC_PEM};

    #[test]
    fn parses_spki_rsa_public_key() {
        assert!(SigningKey::from_pem(SIGNING_PUBLIC_PEM).is_ok());
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let padded = format!("\n\n  {SIGNING_PUBLIC_PEM}\n  ");
        assert!(SigningKey::from_pem(&padded).is_ok());
    }

    #[test]
    fn rejects_text_without_pem_block() {
        let result = SigningKey::from_pem("definitely not a key");
        assert!(matches!(result, Err(KeyError::Pem(_))));
    }

    #[test]
    fn rejects_private_key_block() {
        let result = SigningKey::from_pem(SIGNING_PRIVATE_PEM);
        assert!(matches!(result, Err(KeyError::UnexpectedTag(tag)) if tag == "PRIVATE KEY"));
    }

    #[test]
    fn rejects_non_rsa_public_key() {
        let result = SigningKey::from_pem(EC_PUBLIC_PEM);
        assert!(matches!(result, Err(KeyError::NotRsa(_))));
    }

    #[test]
    fn reads_key_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clerk.pem");
        std::fs::write(&path, SIGNING_PUBLIC_PEM).unwrap();

        assert!(SigningKey::from_pem_file(&path).is_ok());
    }

    #[test]
    fn missing_file_reports_path() {
        let result = SigningKey::from_pem_file("/nonexistent/clerk.pem");
        match result {
            Err(KeyError::Io { path, .. }) => assert_eq!(path, "/nonexistent/clerk.pem"),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
