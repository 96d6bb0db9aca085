// Copyright (c) 2024 Botho Foundation

use anyhow::Result;
use clap::{Parser, Subcommand};
use nuoi_common::logger::{init_tracing, LogConfig};
use std::path::PathBuf;

use nuoi::{commands, config};

#[derive(Parser)]
#[command(name = "nuoi")]
#[command(about = "Milestone-governed crowdfunding escrow", long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.nuoi/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a config file with a new signing key
    Init {
        /// Create a read-only config without a wallet
        #[arg(long)]
        observer: bool,
    },

    /// Print a fresh keypair without touching the config
    Keygen,

    /// Show the wallet identity and derived campaign addresses
    Address {
        /// Derive the campaign and vault for this campaign id
        #[arg(long)]
        campaign_id: Option<u64>,

        /// Creator to derive for (default: the wallet)
        #[arg(long)]
        creator: Option<String>,
    },

    /// Open a new campaign owned by the wallet
    Create {
        /// Creator-chosen campaign id, unique per creator
        #[arg(long)]
        id: u64,

        /// Funding goal in base units
        #[arg(long)]
        goal: u64,

        /// Days from now until the funding deadline
        #[arg(long, conflicts_with = "deadline")]
        days: Option<u32>,

        /// Absolute deadline as a Unix timestamp
        #[arg(long)]
        deadline: Option<i64>,

        /// Content reference for the campaign description
        #[arg(long, conflicts_with = "metadata_file")]
        metadata: Option<String>,

        /// File to store as the campaign description
        #[arg(long)]
        metadata_file: Option<PathBuf>,
    },

    /// Donate to a campaign
    Donate {
        /// Campaign address
        campaign: String,

        /// Amount in base units
        amount: u64,
    },

    /// Ask donors to release funds from the vault
    RequestWithdraw {
        /// Campaign address
        campaign: String,

        /// Amount in base units
        amount: u64,

        /// Content reference for the spending evidence
        #[arg(long, conflicts_with = "evidence_file")]
        evidence: Option<String>,

        /// File to store as spending evidence
        #[arg(long)]
        evidence_file: Option<PathBuf>,

        /// Voting window in seconds (default from config)
        #[arg(long, default_value_t = 0)]
        vote_duration: i64,
    },

    /// Vote on a withdrawal request
    Vote {
        /// Campaign address
        campaign: String,

        /// Request index
        index: u32,

        /// approve or reject
        choice: String,
    },

    /// Settle a withdrawal request after its vote closes
    Finalize {
        /// Campaign address
        campaign: String,

        /// Request index
        index: u32,
    },

    /// Release an approved withdrawal to the creator
    Execute {
        /// Campaign address
        campaign: String,

        /// Request index
        index: u32,
    },

    /// Reclaim the wallet's donation
    Refund {
        /// Campaign address
        campaign: String,
    },

    /// Show a campaign, its requests and what the wallet can do
    Show {
        /// Campaign address
        campaign: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List campaigns
    List {
        /// Only campaigns by this creator
        #[arg(long)]
        creator: Option<String>,

        /// Only campaigns in this status
        #[arg(long)]
        status: Option<String>,
    },

    /// Explain whether a donor can be refunded
    RefundStatus {
        /// Campaign address
        campaign: String,

        /// Donor address (default: the wallet)
        #[arg(long)]
        donor: Option<String>,
    },

    /// Store or fetch content-addressed blobs
    Evidence {
        #[command(subcommand)]
        action: commands::evidence::EvidenceAction,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::default_config_path);

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if config::Config::exists(&config_path) {
        config::Config::load(&config_path)
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        LogConfig::default()
    };
    init_tracing(&log_config)?;

    match cli.command {
        Commands::Init { observer } => commands::init::run(&config_path, observer),
        Commands::Keygen => commands::keygen::run(),
        Commands::Address {
            campaign_id,
            creator,
        } => commands::address::run(&config_path, campaign_id, creator.as_deref()),
        Commands::Create {
            id,
            goal,
            days,
            deadline,
            metadata,
            metadata_file,
        } => commands::create::run(
            &config_path,
            id,
            goal,
            days,
            deadline,
            metadata.as_deref(),
            metadata_file.as_deref(),
        ),
        Commands::Donate { campaign, amount } => {
            commands::donate::run(&config_path, &campaign, amount)
        }
        Commands::RequestWithdraw {
            campaign,
            amount,
            evidence,
            evidence_file,
            vote_duration,
        } => commands::withdraw::request(
            &config_path,
            &campaign,
            amount,
            evidence.as_deref(),
            evidence_file.as_deref(),
            vote_duration,
        ),
        Commands::Vote {
            campaign,
            index,
            choice,
        } => commands::withdraw::vote(&config_path, &campaign, index, &choice),
        Commands::Finalize { campaign, index } => {
            commands::withdraw::finalize(&config_path, &campaign, index)
        }
        Commands::Execute { campaign, index } => {
            commands::withdraw::execute(&config_path, &campaign, index)
        }
        Commands::Refund { campaign } => commands::refund::run(&config_path, &campaign),
        Commands::Show { campaign, json } => commands::show::run(&config_path, &campaign, json),
        Commands::List { creator, status } => {
            commands::list::run(&config_path, creator.as_deref(), status.as_deref())
        }
        Commands::RefundStatus { campaign, donor } => {
            commands::refund::status(&config_path, &campaign, donor.as_deref())
        }
        Commands::Evidence { action } => commands::evidence::run(&config_path, action),
    }
}
