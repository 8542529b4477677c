//! Command-line definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "agora", version, about = "Agora governance ledger")]
pub struct Cli {
    /// Path to a TOML configuration file. File settings are the base; flags
    /// and environment variables override them.
    #[arg(long, env = "AGORA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the ledger database.
    #[arg(long, env = "AGORA_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    pub log_format: Option<String>,

    /// Delay between commit and confirmation, in milliseconds.
    #[arg(long, env = "AGORA_CONFIRMATION_DELAY_MS")]
    pub confirmation_delay_ms: Option<u64>,

    /// Account submitting write commands.
    #[arg(long = "as", env = "AGORA_ACCOUNT", global = true)]
    pub caller: Option<String>,

    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Create the ledger in the data directory.
    Init {
        /// Governance admin.
        #[arg(long)]
        admin: Option<String>,
        /// Initial balance, as ACCOUNT=AMOUNT. Repeatable.
        #[arg(long = "alloc")]
        allocations: Vec<String>,
        /// Use compressed timelines for local development.
        #[arg(long)]
        fast: bool,
    },

    /// Submit a proposal.
    Propose {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        /// Proposal kind code, 0..=6.
        #[arg(long)]
        kind: u8,
        /// Hex-encoded action payload (see `encode-action`).
        #[arg(long)]
        payload: String,
        /// Extra option labels for multi-outcome proposals. Repeatable.
        #[arg(long = "option")]
        options: Vec<String>,
    },

    /// Encode a JSON proposal action into its kind code and hex payload.
    EncodeAction {
        /// e.g. '{"PlatformFeeUpdate":{"fee_bps":30}}'
        json: String,
    },

    /// Vote on a proposal.
    Vote {
        proposal_id: u64,
        #[arg(long, value_enum, default_value_t = ModeArg::Standard)]
        mode: ModeArg,
        /// Standard mode: vote for (true) or against (false).
        #[arg(long)]
        support: Option<bool>,
        /// Quadratic mode: the option voted for.
        #[arg(long)]
        option: Option<u16>,
        /// Quadratic mode: vote weight; costs weight² of voting power.
        #[arg(long)]
        weight: Option<u128>,
        /// Weighted mode: OPTION=WEIGHT pairs, comma-separated.
        #[arg(long, value_delimiter = ',')]
        allocation: Vec<String>,
        /// Ranked mode: every option, most preferred first, comma-separated.
        #[arg(long, value_delimiter = ',')]
        ranking: Vec<u16>,
    },

    /// Queue a succeeded proposal behind the timelock.
    Queue { proposal_id: u64 },

    /// Execute a queued proposal whose timelock has expired.
    Execute { proposal_id: u64 },

    /// Cancel a proposal (proposer or admin).
    Cancel { proposal_id: u64 },

    /// Cancel a queued proposal (admin).
    CancelQueued { proposal_id: u64 },

    /// Delegate part of your balance's voting power.
    Delegate { delegate: String, amount: u128 },

    /// Clear your active delegation.
    Undelegate,

    /// Register or update your delegate profile.
    RegisterDelegate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
    },

    /// Lock collateral in escrow.
    Escrow { amount: u128 },

    /// Release an escrow position whose lock has expired.
    Release { index: usize },

    /// Slash an escrow position (admin).
    Slash {
        owner: String,
        index: usize,
        /// Share of the remaining amount to burn, in basis points.
        pct_bps: u32,
    },

    /// Claim pending escrow rewards.
    ClaimRewards,

    /// List proposals.
    Proposals,

    /// Show one proposal with its votes.
    Proposal { proposal_id: u64 },

    /// Show an account's balance and voting power.
    Power { account: String },

    /// List registered delegates.
    Delegates,

    /// Show an account's escrow positions.
    Positions { account: String },

    /// Show an account's reward account.
    Rewards { account: String },

    /// Read JSON envelopes ({"caller": ..., "command": ...}) from stdin, one
    /// per line, and print a JSON result per line until EOF or a signal.
    Serve,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Standard,
    Quadratic,
    Weighted,
    Ranked,
}
