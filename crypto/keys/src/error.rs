// Copyright (c) 2024 Botho Foundation

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid base58 string: {0}")]
    InvalidBase58(String),

    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Bytes are not a valid ed25519 public key")]
    InvalidPublicKey,

    #[error("Signature verification failed")]
    BadSignature,
}
