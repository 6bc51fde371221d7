//! Clap derive structures for the `matterhub` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// matterhub -- expose Home Assistant entities as Matter bridges
#[derive(Debug, Parser)]
#[command(
    name = "matterhub",
    version,
    about = "Manage Home Assistant Matter bridges from the command line",
    long_about = "Manage the bridges that expose Home Assistant entities as Matter devices.\n\n\
        Edits the persisted bridge store, upgrades it to the current layout, and\n\
        previews which entities a bridge would expose against an entity dump.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, env = "MATTERHUB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory (overrides storage_location from the config file)
    #[arg(long, env = "MATTERHUB_STORAGE_LOCATION", global = true)]
    pub storage_location: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MATTERHUB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage persisted bridges
    #[command(alias = "b")]
    Bridges(BridgesArgs),

    /// Inspect and upgrade the bridge store
    Storage(StorageArgs),

    /// Dry-run a bridge against an entity dump
    Preview(PreviewArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Bridges ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BridgesArgs {
    #[command(subcommand)]
    pub command: BridgesCommand,
}

#[derive(Debug, Subcommand)]
pub enum BridgesCommand {
    /// List all bridges
    #[command(alias = "ls")]
    List,

    /// Show one bridge
    Show {
        /// Bridge ID
        id: String,
    },

    /// Create a bridge, or replace one with the same ID
    Add(BridgeAddArgs),

    /// Delete a bridge
    #[command(alias = "rm")]
    Remove {
        /// Bridge ID
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct BridgeAddArgs {
    /// Read the full bridge definition from a JSON file
    #[arg(long, short = 'F', conflicts_with_all = ["name", "port"])]
    pub from_file: Option<PathBuf>,

    /// Bridge ID (generated when omitted)
    #[arg(long)]
    pub id: Option<String>,

    /// Display name
    #[arg(long, required_unless_present = "from_file")]
    pub name: Option<String>,

    /// Matter port
    #[arg(long, required_unless_present = "from_file")]
    pub port: Option<u16>,

    /// ISO 3166-1 country code
    #[arg(long)]
    pub country_code: Option<String>,

    /// Include matcher as KIND=VALUE (e.g. domain=light, pattern=light.*)
    #[arg(long = "include", value_name = "KIND=VALUE")]
    pub include: Vec<String>,

    /// Exclude matcher as KIND=VALUE
    #[arg(long = "exclude", value_name = "KIND=VALUE")]
    pub exclude: Vec<String>,

    /// Enable a feature flag (repeatable)
    #[arg(long = "flag", value_enum)]
    pub flags: Vec<FeatureFlagArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FeatureFlagArg {
    /// Expose media players as speakers
    MatterSpeakers,
    /// Full fan speed control
    MatterFans,
    /// Keep the hub's cover percentage direction
    CoverDoNotInvertPercentage,
    /// Swap open and close commands of covers
    CoverSwapOpenClose,
    /// Expose entities hidden in the hub
    IncludeHiddenEntities,
    /// Map unclassified binary sensors to on/off sensors
    UseOnOffSensorAsDefaultForBinarySensors,
}

// ── Storage ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StorageArgs {
    #[command(subcommand)]
    pub command: StorageCommand,
}

#[derive(Debug, Subcommand)]
pub enum StorageCommand {
    /// Show the stored and latest layout versions
    Status,

    /// Upgrade the bridge store to the latest layout
    Migrate,
}

// ── Preview ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Bridge ID from the store
    #[arg(required_unless_present = "bridge_file")]
    pub bridge: Option<String>,

    /// Read the bridge definition from a JSON file instead of the store
    #[arg(long, conflicts_with = "bridge")]
    pub bridge_file: Option<PathBuf>,

    /// JSON file with the entity list to evaluate
    #[arg(long, short = 'e')]
    pub entities: PathBuf,

    /// Only list exposed entities
    #[arg(long)]
    pub exposed_only: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a new configuration file
    Init(ConfigInitArgs),

    /// Show the effective configuration (secrets masked)
    Show,

    /// Print the configuration file path
    Path,

    /// Store the Home Assistant access token in the system keyring
    SetToken,
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Home Assistant URL (prompted when omitted on a terminal)
    #[arg(long)]
    pub url: Option<String>,

    /// Environment variable holding the access token
    #[arg(long)]
    pub access_token_env: Option<String>,

    /// Storage directory
    #[arg(long)]
    pub storage: Option<String>,

    /// Log level of the bridge service
    #[arg(long)]
    pub log_level: Option<String>,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
