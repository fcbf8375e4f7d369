//! Clap derive structures for the `rollcall` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rollcall -- offline-first records for the department HR office
#[derive(Debug, Parser)]
#[command(
    name = "rollcall",
    version,
    about = "Offline-first HR records from the command line",
    long_about = "Reads and writes department HR records (employees, cases, leave,\n\
        overtime, payroll, vehicles) through a local store that keeps working\n\
        when the backend is unreachable. Pending writes are replayed with\n\
        `rollcall sync`; records move between devices with export/import.",
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
    /// Profile to use
    #[arg(long, short = 'p', env = "ROLLCALL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "ROLLCALL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides profile)
    #[arg(long, short = 'b', env = "ROLLCALL_BACKEND", global = true)]
    pub backend: Option<String>,

    /// Backend API key
    #[arg(long, env = "ROLLCALL_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Local store directory (overrides profile)
    #[arg(long, env = "ROLLCALL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Device id prefix (overrides profile and host name)
    #[arg(long, env = "ROLLCALL_DEVICE_TAG", global = true)]
    pub device_tag: Option<String>,

    /// Never contact the backend
    #[arg(long, global = true)]
    pub offline: bool,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ROLLCALL_OUTPUT",
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

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ROLLCALL_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "ROLLCALL_TIMEOUT", global = true)]
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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Read and write records of a collection
    #[command(alias = "rec", alias = "r")]
    Records(RecordsArgs),

    /// Manage dropdown option lists
    #[command(alias = "opt")]
    Options(OptionsArgs),

    /// Export a collection for another device
    Export(ExportArgs),

    /// Import records exported on another device
    Import(ImportArgs),

    /// Push records saved while offline to the backend
    Sync,

    /// Backend reachability, device id, and local store summary
    Status,

    /// Show or reset this install's device id
    #[command(alias = "dev")]
    Device(DeviceArgs),

    /// Drop every cached query result
    ClearCache,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  RECORDS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RecordsArgs {
    #[command(subcommand)]
    pub command: RecordsCommand,
}

/// Where `records list` reads from.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ReadSource {
    /// Backend when reachable, else the local store
    #[default]
    Auto,
    /// Through the query cache
    Cached,
    /// Local store only
    Local,
}

/// A record body: inline JSON or a file.
#[derive(Debug, Args)]
pub struct DataArgs {
    /// Record fields as a JSON object
    #[arg(long, short = 'd', required_unless_present = "from_file")]
    pub data: Option<String>,

    /// Read the JSON object from a file (`-` for stdin)
    #[arg(long, short = 'F', conflicts_with = "data")]
    pub from_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// List every record of a collection
    #[command(alias = "ls")]
    List {
        /// Collection name (e.g. employees)
        collection: String,

        /// Read source
        #[arg(long, short = 's', default_value = "auto", value_enum)]
        source: ReadSource,
    },

    /// Show one locally stored record
    Get {
        collection: String,
        id: String,
    },

    /// Create a record
    Save {
        collection: String,

        #[command(flatten)]
        body: DataArgs,
    },

    /// Merge fields into an existing record
    Update {
        collection: String,
        id: String,

        #[command(flatten)]
        body: DataArgs,
    },

    /// Delete a record locally and on the backend
    #[command(alias = "rm")]
    Delete {
        collection: String,
        id: String,
    },

    /// Save a JSON array of records
    Batch {
        collection: String,

        /// File holding a JSON array (`-` for stdin)
        #[arg(long, short = 'F')]
        from_file: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OPTIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct OptionsArgs {
    #[command(subcommand)]
    pub command: OptionsCommand,
}

#[derive(Debug, Subcommand)]
pub enum OptionsCommand {
    /// List the visible options of a field
    #[command(alias = "ls")]
    List {
        /// Field name (e.g. ranks)
        field: String,

        /// List removed options instead
        #[arg(long)]
        deleted: bool,

        /// Skip the backend and list what is stored locally
        #[arg(long)]
        local: bool,
    },

    /// Add an option
    Add { field: String, value: String },

    /// Hide an option on this device
    #[command(alias = "rm")]
    Remove { field: String, value: String },

    /// Bring back a removed option
    Restore { field: String, value: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EXPORT / IMPORT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Collection to export
    pub collection: String,

    /// Write to a file instead of stdout
    #[arg(long, short = 'O')]
    pub out: Option<PathBuf>,

    /// Prefix the document with the share banner
    #[arg(long)]
    pub share: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Export file (`-` for stdin)
    pub file: PathBuf,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Show the device id and its derived forms
    Show,

    /// Forget the device id; a new one is generated on next use
    Reset,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value
    Set {
        /// Profile key (e.g. backend, cache.ttl, sync.collections)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Key to store (prompted for when omitted)
        key: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
