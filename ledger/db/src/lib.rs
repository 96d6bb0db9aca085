// Copyright (c) 2024 Botho Foundation

//! Account state storage.
//!
//! Every entry is an opaque byte string at a 32-byte address, tagged with a
//! version that starts at 1 on first write and increments on every write.
//! An absent entry reads as version 0. Writers submit a [`WriteBatch`] that
//! records the version of every entry they read; the store applies the batch
//! only if none of those versions moved. This is the only concurrency
//! discipline: no locks are held between a read and its commit.

mod error;
mod lmdb_store;
mod memory;

pub use error::StoreError;
pub use lmdb_store::LmdbStore;
pub use memory::MemoryStore;

use nuoi_crypto_keys::Pubkey;
use std::sync::Arc;

/// Version of an absent entry.
pub const ABSENT_VERSION: Version = 0;

pub type Version = u64;

/// Bytes stored at an address along with their version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub version: Version,
    pub data: Vec<u8>,
}

/// A set of reads to validate and writes to apply atomically.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    expected: Vec<(Pubkey, Version)>,
    writes: Vec<(Pubkey, Vec<u8>)>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `address` to still be at `version` when the batch commits.
    pub fn expect(&mut self, address: Pubkey, version: Version) -> &mut Self {
        self.expected.push((address, version));
        self
    }

    /// Overwrite `address` with `data`.
    pub fn put(&mut self, address: Pubkey, data: Vec<u8>) -> &mut Self {
        self.writes.push((address, data));
        self
    }

    pub fn expected(&self) -> &[(Pubkey, Version)] {
        &self.expected
    }

    pub fn writes(&self) -> &[(Pubkey, Vec<u8>)] {
        &self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Reader/writer for account state.
pub trait StateStore: Send + Sync {
    /// Point read. `None` when nothing was ever written at `address`.
    fn get(&self, address: &Pubkey) -> Result<Option<Versioned>, StoreError>;

    /// Validate every expected version, then apply every write, atomically.
    ///
    /// Returns [`StoreError::Conflict`] naming the first stale entry and
    /// leaves the store untouched in that case.
    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;

    /// Every entry, ordered by address. Not a consistent snapshot with
    /// respect to later `get` calls.
    fn scan(&self) -> Result<Vec<(Pubkey, Versioned)>, StoreError>;

    /// Current version at `address`, [`ABSENT_VERSION`] if absent.
    fn version(&self, address: &Pubkey) -> Result<Version, StoreError> {
        Ok(self
            .get(address)?
            .map(|entry| entry.version)
            .unwrap_or(ABSENT_VERSION))
    }
}

impl<S: StateStore + ?Sized> StateStore for Arc<S> {
    fn get(&self, address: &Pubkey) -> Result<Option<Versioned>, StoreError> {
        (**self).get(address)
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn scan(&self) -> Result<Vec<(Pubkey, Versioned)>, StoreError> {
        (**self).scan()
    }
}

impl<S: StateStore + ?Sized> StateStore for Box<S> {
    fn get(&self, address: &Pubkey) -> Result<Option<Versioned>, StoreError> {
        (**self).get(address)
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        (**self).commit(batch)
    }

    fn scan(&self) -> Result<Vec<(Pubkey, Versioned)>, StoreError> {
        (**self).scan()
    }
}
