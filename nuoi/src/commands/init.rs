// Copyright (c) 2024 Botho Foundation

use anyhow::{anyhow, Result};
use nuoi_crypto_keys::{Keypair, Signer};
use std::path::Path;

use crate::config::Config;

/// Write a new config file
pub fn run(config_path: &Path, observer: bool) -> Result<()> {
    if Config::exists(config_path) {
        return Err(anyhow!(
            "Config already exists at {}. Remove it first to start over.",
            config_path.display()
        ));
    }

    let config = if observer {
        Config::new_observer()
    } else {
        let keypair = Keypair::generate();
        println!("Generated signing key for {}", keypair.pubkey());
        Config::new(&keypair)
    };

    config.save(config_path)?;

    println!();
    println!("Config saved to: {}", config_path.display());
    println!("State database:  {}", config.state_db_path(config_path).display());
    println!("Program id:      {}", config.program_id);
    if !observer {
        println!();
        println!("The config holds your secret key. Back it up and keep it private.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        run(&path, false).unwrap();
        let first = Config::load(&path).unwrap();
        assert!(first.has_wallet());

        assert!(run(&path, true).is_err());
        let again = Config::load(&path).unwrap();
        assert_eq!(
            again.wallet.unwrap().secret_key,
            first.wallet.unwrap().secret_key
        );
    }

    #[test]
    fn test_init_observer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        run(&path, true).unwrap();
        assert!(!Config::load(&path).unwrap().has_wallet());
    }
}
