// Copyright (c) 2024 Botho Foundation

use anyhow::{Context, Result};
use nuoi_common::logger::LogConfig;
use nuoi_crypto_keys::{Keypair, Pubkey};
use nuoi_protocol::ProtocolParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Program id every address is derived under unless configured otherwise.
pub const DEFAULT_PROGRAM_ID: &str = "Ctfz2Ksrytewrtgc6UF2WB6FAfHhPHJRmJFcBGe8r7qS";

/// Main configuration for the nuoi client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base58 program id the escrow addresses are derived under
    #[serde(default = "default_program_id")]
    pub program_id: String,

    /// Where state and evidence live (default: next to the config file)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Signing identity (optional for read-only observers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<WalletConfig>,

    #[serde(default)]
    pub protocol: ProtocolParams,

    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Hex-encoded ed25519 secret seed
    pub secret_key: String,
}

fn default_program_id() -> String {
    DEFAULT_PROGRAM_ID.to_string()
}

impl Config {
    /// Config with a freshly generated signing key.
    pub fn new(keypair: &Keypair) -> Self {
        Self {
            wallet: Some(WalletConfig {
                secret_key: keypair.to_hex(),
            }),
            ..Self::new_observer()
        }
    }

    /// Config that can read state but not sign.
    pub fn new_observer() -> Self {
        Self {
            program_id: default_program_id(),
            data_dir: None,
            wallet: None,
            protocol: ProtocolParams::default(),
            logging: LogConfig::default(),
        }
    }

    pub fn program_id(&self) -> Result<Pubkey> {
        self.program_id
            .parse()
            .with_context(|| format!("Invalid program id '{}'", self.program_id))
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn keypair(&self) -> Result<Keypair> {
        let wallet = self
            .wallet
            .as_ref()
            .context("No wallet configured. Run 'nuoi init' to create one.")?;
        Keypair::from_hex(&wallet.secret_key).context("Invalid wallet secret key")
    }

    /// Load config from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save config to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;

        // Config holds the secret key.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms)
                .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
        }

        Ok(())
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn data_dir(&self, config_path: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) => dir.clone(),
            None => config_path.parent().unwrap_or(config_path).to_path_buf(),
        }
    }

    /// State database directory
    pub fn state_db_path(&self, config_path: &Path) -> PathBuf {
        self.data_dir(config_path).join("state")
    }

    /// Evidence blob directory
    pub fn evidence_path(&self, config_path: &Path) -> PathBuf {
        self.data_dir(config_path).join("evidence")
    }
}

/// Default config directory
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nuoi")
}

pub fn default_config_path() -> PathBuf {
    default_data_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuoi_crypto_keys::Signer;
    use tempfile::tempdir;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let keypair = Keypair::from_seed(&[4; 32]);
        let config = Config::new(&keypair);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.keypair().unwrap().pubkey(), keypair.pubkey());
        assert_eq!(loaded.program_id().unwrap().to_string(), DEFAULT_PROGRAM_ID);
        assert_eq!(loaded.protocol, ProtocolParams::default());
    }

    #[test]
    fn test_observer_has_no_wallet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::new_observer();
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert!(!loaded.has_wallet());
        assert!(loaded.keypair().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [protocol]
            default_vote_duration_secs = 60

            [logging]
            filter = "nuoi_runtime=debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.program_id, DEFAULT_PROGRAM_ID);
        assert_eq!(config.protocol.default_vote_duration_secs, 60);
        assert_eq!(
            config.protocol.max_vote_duration_secs,
            ProtocolParams::default().max_vote_duration_secs
        );
        assert_eq!(config.logging.filter, "nuoi_runtime=debug");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_refund_windows_are_not_configurable() {
        // Older configs carried the refund windows; they are ignored now.
        let config: Config = toml::from_str(
            r#"
            [protocol]
            inactivity_refund_secs = 0
            unexecuted_refund_secs = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.protocol, ProtocolParams::default());
    }

    #[test]
    fn test_paths_follow_config_location() {
        let path = Path::new("/tmp/nuoi-test/config.toml");
        let mut config = Config::new_observer();
        assert_eq!(
            config.state_db_path(path),
            PathBuf::from("/tmp/nuoi-test/state")
        );
        assert_eq!(
            config.evidence_path(path),
            PathBuf::from("/tmp/nuoi-test/evidence")
        );

        config.data_dir = Some(PathBuf::from("/srv/nuoi"));
        assert_eq!(config.state_db_path(path), PathBuf::from("/srv/nuoi/state"));
    }
}
