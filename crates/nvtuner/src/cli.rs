//! Clap derive structures for the `nvtuner` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. Kept
//! free of workspace crates so `build.rs` can include it for man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nvtuner -- inspect and tune router NVRAM over SSH
#[derive(Debug, Parser)]
#[command(
    name = "nvtuner",
    version,
    about = "Inspect, edit, and commit router NVRAM variables over SSH",
    long_about = "Connects to an Asuswrt-Merlin router over SSH, reads its NVRAM,\n\
        and pushes staged edits back as a generated shell script that ends\n\
        in `nvram commit`.",
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
    /// Router profile to use
    #[arg(long, short = 'r', env = "NVTUNER_ROUTER", global = true)]
    pub router: Option<String>,

    /// Router IPv4 address (overrides profile)
    #[arg(long, env = "NVTUNER_HOST", global = true)]
    pub host: Option<String>,

    /// SSH port (overrides profile)
    #[arg(long, env = "NVTUNER_PORT", global = true)]
    pub port: Option<u16>,

    /// SSH username (overrides profile)
    #[arg(long, short = 'u', env = "NVTUNER_USER", global = true)]
    pub user: Option<String>,

    /// Folder holding id_rsa; switches to key-pair auth
    #[arg(long, env = "NVTUNER_KEY_DIR", global = true)]
    pub key_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NVTUNER_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// SSH connect timeout in seconds (overrides config)
    #[arg(long, env = "NVTUNER_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// How `set` breaks long values apart when showing what changes.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SplitMode {
    /// Compare whole values
    #[default]
    NoSplit,
    /// One line per comma-separated item
    Comma,
    /// One line per `<record>`
    LessThan,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Test the connection with a throwaway session
    Probe,

    /// List NVRAM variables, or show one in detail
    #[command(alias = "ls")]
    Show(ShowArgs),

    /// Show NVRAM capacity and usage
    Usage,

    /// Stage edits, then commit them to the router
    Set(SetArgs),

    /// Manage router profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Variables ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Variable to show in detail
    pub name: Option<String>,

    /// Only list variables whose name contains this text
    #[arg(long, short = 'f', conflicts_with = "name")]
    pub filter: Option<String>,

    /// Only list variables with a tuple-encoded value
    #[arg(long, conflicts_with = "name")]
    pub special: bool,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Edits to stage, as NAME=VALUE
    #[arg(required = true, value_name = "NAME=VALUE")]
    pub assignments: Vec<String>,

    /// Print the script without running it
    #[arg(long)]
    pub dry_run: bool,

    /// How to split values when showing the diff
    #[arg(long, value_enum, default_value_t = SplitMode::NoSplit)]
    pub split: SplitMode,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a router profile with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a value on the active router profile
    Set {
        /// Profile key (address, port, auth_mode, username, key_dir, nickname)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured routers
    #[command(alias = "routers")]
    List,

    /// Set the default router
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store the active router's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
