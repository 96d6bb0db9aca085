// Copyright (c) 2024 Botho Foundation

use nuoi_crypto_keys::Pubkey;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::trace;

use crate::{StateStore, StoreError, Versioned, WriteBatch, ABSENT_VERSION};

/// In-process store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Pubkey, Versioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, address: &Pubkey) -> Result<Option<Versioned>, StoreError> {
        Ok(self.entries.read().get(address).cloned())
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.entries.write();

        for (address, expected) in batch.expected() {
            let found = entries
                .get(address)
                .map(|entry| entry.version)
                .unwrap_or(ABSENT_VERSION);
            if found != *expected {
                return Err(StoreError::Conflict {
                    address: *address,
                    expected: *expected,
                    found,
                });
            }
        }

        for (address, data) in batch.writes() {
            let version = entries
                .get(address)
                .map(|entry| entry.version)
                .unwrap_or(ABSENT_VERSION)
                + 1;
            entries.insert(
                *address,
                Versioned {
                    version,
                    data: data.clone(),
                },
            );
        }

        trace!(writes = batch.writes().len(), "Committed batch");
        Ok(())
    }

    fn scan(&self) -> Result<Vec<(Pubkey, Versioned)>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .map(|(address, entry)| (*address, entry.clone()))
            .collect())
    }
}
