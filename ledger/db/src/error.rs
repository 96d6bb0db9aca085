// Copyright (c) 2024 Botho Foundation

use nuoi_crypto_keys::Pubkey;
use thiserror::Error;

use crate::Version;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A read recorded in the batch is no longer current.
    #[error("Stale read at {address}: expected version {expected}, found {found}")]
    Conflict {
        address: Pubkey,
        expected: Version,
        found: Version,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt entry at {address}: {reason}")]
    Corrupt { address: Pubkey, reason: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<lmdb::Error> for StoreError {
    fn from(e: lmdb::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}
