// Copyright (c) 2024 Botho Foundation

//! CLI subcommands. Each module prints to stdout and returns `anyhow::Result`.

pub mod address;
pub mod create;
pub mod donate;
pub mod evidence;
pub mod init;
pub mod keygen;
pub mod list;
pub mod refund;
pub mod show;
pub mod withdraw;

use anyhow::{anyhow, Context, Result};
use nuoi_common::SystemClock;
use nuoi_crypto_keys::{Keypair, Pubkey, Signer};
use nuoi_ledger_db::LmdbStore;
use nuoi_protocol::{ContentRef, Instruction, ProtocolError, SignedInstruction};
use nuoi_runtime::{DirEvidenceStore, EvidenceStore, Outcome, Runtime};
use rand_core::{OsRng, RngCore};
use std::{fs, path::Path};
use tracing::warn;

use crate::config::Config;

/// Attempts for a submission that keeps losing optimistic races.
const MAX_SUBMIT_ATTEMPTS: usize = 3;

pub type CliRuntime = Runtime<LmdbStore, SystemClock>;

/// Loaded config plus an open state database.
pub struct Session {
    pub config: Config,
    pub runtime: CliRuntime,
}

impl Session {
    pub fn open(config_path: &Path) -> Result<Self> {
        let config = Config::load(config_path).context("No config found. Run 'nuoi init' first.")?;
        let program_id = config.program_id()?;

        let state_path = config.state_db_path(config_path);
        let store = LmdbStore::open(&state_path)
            .with_context(|| format!("Failed to open state at {}", state_path.display()))?;

        let runtime = Runtime::new(store, SystemClock, program_id, config.protocol.clone());
        Ok(Self { config, runtime })
    }

    pub fn keypair(&self) -> Result<Keypair> {
        self.config.keypair()
    }

    /// Sign and apply `instruction`, re-signing with a new nonce after a
    /// lost race.
    pub fn submit(&self, keypair: &Keypair, instruction: Instruction) -> Result<Outcome> {
        let program_id = *self.runtime.program_id();
        let mut attempt = 1;
        loop {
            let signed = SignedInstruction::sign(
                keypair,
                &program_id,
                instruction.clone(),
                OsRng.next_u64(),
            )?;
            match self.runtime.submit(&signed) {
                Ok(outcome) => return Ok(outcome),
                Err(e @ ProtocolError::Conflict { .. }) if attempt < MAX_SUBMIT_ATTEMPTS => {
                    warn!(attempt, error = %e, "Retrying after conflicting write");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(anyhow!("{} rejected ({}): {}", instruction.name(), e.kind(), e))
                }
            }
        }
    }
}

pub fn open_evidence(config_path: &Path) -> Result<DirEvidenceStore> {
    let config = Config::load(config_path).context("No config found. Run 'nuoi init' first.")?;
    let dir = config.evidence_path(config_path);
    DirEvidenceStore::open(&dir)
        .with_context(|| format!("Failed to open evidence store at {}", dir.display()))
}

/// Resolve a content reference given either directly or as a file to store.
pub fn resolve_content(
    config_path: &Path,
    field: &'static str,
    reference: Option<&str>,
    file: Option<&Path>,
) -> Result<ContentRef> {
    match (reference, file) {
        (Some(reference), _) => Ok(ContentRef::new(field, reference)?),
        (None, Some(file)) => {
            let blob = fs::read(file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let content = open_evidence(config_path)?.put(&blob)?;
            println!("Stored {} as {}", file.display(), content);
            Ok(content)
        }
        (None, None) => Ok(ContentRef::default()),
    }
}

pub fn parse_pubkey(s: &str, what: &str) -> Result<Pubkey> {
    s.parse()
        .map_err(|e| anyhow!("Invalid {} address '{}': {}", what, s, e))
}

/// The explicit address if given, otherwise the wallet's.
pub fn pubkey_or_wallet(config: &Config, s: Option<&str>, what: &str) -> Result<Pubkey> {
    match s {
        Some(s) => parse_pubkey(s, what),
        None => Ok(config.keypair()?.pubkey()),
    }
}

pub fn print_outcome(outcome: &Outcome) {
    println!();
    println!("=== {} applied ===", outcome.instruction);
    println!("Signer:    {}", outcome.signer);
    println!("Receipt:   {}", outcome.receipt);
    println!("Time:      {}", outcome.committed_at);
    for transfer in &outcome.transfers {
        println!(
            "Transfer:  {:?} {} from {} to {}",
            transfer.kind, transfer.amount, transfer.from, transfer.to
        );
    }
    println!("Accounts written: {}", outcome.written.len());
}
