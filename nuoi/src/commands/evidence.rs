// Copyright (c) 2024 Botho Foundation

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use nuoi_protocol::ContentRef;
use nuoi_runtime::EvidenceStore;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use super::open_evidence;

#[derive(Subcommand)]
pub enum EvidenceAction {
    /// Store a file and print its content reference
    Put {
        file: PathBuf,
    },

    /// Fetch a blob by content reference
    Get {
        reference: String,

        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

pub fn run(config_path: &Path, action: EvidenceAction) -> Result<()> {
    let store = open_evidence(config_path)?;

    match action {
        EvidenceAction::Put { file } => {
            let blob =
                fs::read(&file).with_context(|| format!("Failed to read {}", file.display()))?;
            let content = store.put(&blob)?;
            println!("{}", content);
        }
        EvidenceAction::Get { reference, out } => {
            let content = ContentRef::new("evidence_ref", reference)?;
            let blob = store
                .get(&content)?
                .ok_or_else(|| anyhow!("No blob stored for {}", content))?;
            match out {
                Some(path) => fs::write(&path, &blob)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => io::stdout().write_all(&blob)?,
            }
        }
    }

    Ok(())
}
