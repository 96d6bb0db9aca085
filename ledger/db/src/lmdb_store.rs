// Copyright (c) 2024 Botho Foundation

use lmdb::{Cursor, Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use nuoi_crypto_keys::Pubkey;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{StateStore, StoreError, Version, Versioned, WriteBatch, ABSENT_VERSION};

const DB_FILE: &str = "state.mdb";
const MAP_SIZE: usize = 1024 * 1024 * 1024; // 1GB
const VERSION_BYTES: usize = 8;

/// LMDB-backed account storage.
///
/// Values are laid out as `version (u64 LE) ‖ data`. LMDB admits one write
/// transaction at a time, so the version checks and the writes of a batch
/// run under the same exclusive transaction.
pub struct LmdbStore {
    env: Environment,
    /// accounts: address (32 bytes) -> version ‖ data
    accounts_db: Database,
    path: PathBuf,
}

impl LmdbStore {
    /// Open or create a store under `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(dir)?;

        let path = dir.join(DB_FILE);
        let env = Environment::new()
            .set_flags(EnvironmentFlags::NO_SUB_DIR)
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(&path)?;
        let accounts_db = env.create_db(Some("accounts"), DatabaseFlags::empty())?;

        info!(path = %path.display(), "Opened state store");
        Ok(Self {
            env,
            accounts_db,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn decode_entry(address: &Pubkey, bytes: &[u8]) -> Result<Versioned, StoreError> {
    if bytes.len() < VERSION_BYTES {
        return Err(StoreError::Corrupt {
            address: *address,
            reason: format!("entry is {} bytes, shorter than its version prefix", bytes.len()),
        });
    }
    let (version, data) = bytes.split_at(VERSION_BYTES);
    let mut raw = [0u8; VERSION_BYTES];
    raw.copy_from_slice(version);
    Ok(Versioned {
        version: u64::from_le_bytes(raw),
        data: data.to_vec(),
    })
}

fn encode_entry(version: Version, data: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(VERSION_BYTES + data.len());
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(data);
    bytes
}

impl StateStore for LmdbStore {
    fn get(&self, address: &Pubkey) -> Result<Option<Versioned>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        match txn.get(self.accounts_db, address) {
            Ok(bytes) => decode_entry(address, bytes).map(Some),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut txn = self.env.begin_rw_txn()?;

        for (address, expected) in batch.expected() {
            let found = match txn.get(self.accounts_db, address) {
                Ok(bytes) => decode_entry(address, bytes)?.version,
                Err(lmdb::Error::NotFound) => ABSENT_VERSION,
                Err(e) => return Err(e.into()),
            };
            if found != *expected {
                // Dropping the transaction aborts it.
                return Err(StoreError::Conflict {
                    address: *address,
                    expected: *expected,
                    found,
                });
            }
        }

        for (address, data) in batch.writes() {
            let current = match txn.get(self.accounts_db, address) {
                Ok(bytes) => decode_entry(address, bytes)?.version,
                Err(lmdb::Error::NotFound) => ABSENT_VERSION,
                Err(e) => return Err(e.into()),
            };
            let entry = encode_entry(current + 1, data);
            txn.put(self.accounts_db, address, &entry, WriteFlags::empty())?;
        }

        txn.commit()?;
        debug!(writes = batch.writes().len(), "Committed batch");
        Ok(())
    }

    fn scan(&self) -> Result<Vec<(Pubkey, Versioned)>, StoreError> {
        let txn = self.env.begin_ro_txn()?;
        let mut cursor = txn.open_ro_cursor(self.accounts_db)?;

        let mut entries = Vec::new();
        for result in cursor.iter() {
            let (key, value) = result?;
            let address = Pubkey::try_from(key)
                .map_err(|e| StoreError::Database(format!("malformed key: {e}")))?;
            entries.push((address, decode_entry(&address, value)?));
        }

        Ok(entries)
    }
}
