// Copyright (c) 2024 Botho Foundation

//! Content-addressed storage for campaign metadata and withdrawal evidence.
//!
//! References are the hex SHA-256 of the blob: 64 characters, which is
//! exactly the longest content reference the protocol accepts.

use nuoi_protocol::ContentRef;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a content hash: {0}")]
    InvalidRef(String),

    #[error("Blob does not match its reference {0}")]
    Tampered(String),
}

pub trait EvidenceStore: Send + Sync {
    /// Store `blob` and return its content reference. Idempotent.
    fn put(&self, blob: &[u8]) -> Result<ContentRef, EvidenceError>;

    fn get(&self, content: &ContentRef) -> Result<Option<Vec<u8>>, EvidenceError>;
}

/// Reference for `blob`.
pub fn content_ref(blob: &[u8]) -> Result<ContentRef, EvidenceError> {
    let digest = hex::encode(Sha256::digest(blob));
    ContentRef::new("evidence_ref", digest).map_err(|e| EvidenceError::InvalidRef(e.to_string()))
}

fn check_ref(content: &ContentRef) -> Result<(), EvidenceError> {
    let s = content.as_str();
    if s.len() != 64 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EvidenceError::InvalidRef(s.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct MemoryEvidenceStore {
    blobs: RwLock<HashMap<ContentRef, Vec<u8>>>,
}

impl MemoryEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvidenceStore for MemoryEvidenceStore {
    fn put(&self, blob: &[u8]) -> Result<ContentRef, EvidenceError> {
        let content = content_ref(blob)?;
        self.blobs
            .write()
            .entry(content.clone())
            .or_insert_with(|| blob.to_vec());
        Ok(content)
    }

    fn get(&self, content: &ContentRef) -> Result<Option<Vec<u8>>, EvidenceError> {
        check_ref(content)?;
        Ok(self.blobs.read().get(content).cloned())
    }
}

/// One file per blob, named by its reference.
#[derive(Debug, Clone)]
pub struct DirEvidenceStore {
    dir: PathBuf,
}

impl DirEvidenceStore {
    pub fn open(dir: &Path) -> Result<Self, EvidenceError> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    fn path_for(&self, content: &ContentRef) -> PathBuf {
        self.dir.join(content.as_str())
    }
}

impl EvidenceStore for DirEvidenceStore {
    fn put(&self, blob: &[u8]) -> Result<ContentRef, EvidenceError> {
        let content = content_ref(blob)?;
        let path = self.path_for(&content);
        if !path.exists() {
            let tmp = path.with_extension("tmp");
            fs::write(&tmp, blob)?;
            fs::rename(&tmp, &path)?;
            debug!(content = %content, bytes = blob.len(), "Stored evidence");
        }
        Ok(content)
    }

    fn get(&self, content: &ContentRef) -> Result<Option<Vec<u8>>, EvidenceError> {
        check_ref(content)?;
        let path = self.path_for(content);
        if !path.exists() {
            return Ok(None);
        }
        let blob = fs::read(&path)?;
        if content_ref(&blob)? != *content {
            return Err(EvidenceError::Tampered(content.to_string()));
        }
        Ok(Some(blob))
    }
}
