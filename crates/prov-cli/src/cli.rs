//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Provisioning Manager - Quota accounting and sync state for cloud resources
#[derive(Parser, Debug)]
#[command(name = "prov")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory (defaults to the nearest directory with .provisioning/)
    #[arg(long, global = true, env = "PROV_ROOT")]
    pub root: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Initialize a .provisioning/ directory
    ///
    /// Creates config.toml with default limits and an empty state file.
    ///
    /// Examples:
    ///   prov init            # Initialize in current directory
    ///   prov init --force    # Overwrite an existing config
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Manage quota owners
    Owner {
        #[command(subcommand)]
        action: OwnerAction,
    },

    /// Count user roles granted under a customer
    Role {
        #[command(subcommand)]
        action: RoleAction,
    },

    /// Inspect and override quotas
    Quota {
        #[command(subcommand)]
        action: QuotaAction,
    },

    /// Check quota deltas for an owner and reserve them
    ///
    /// Examples:
    ///   prov validate membership:1 storage=40 vcpu=2
    Validate {
        /// Owner reference, e.g. membership:1
        owner: String,

        /// Deltas as name=value pairs
        #[arg(required = true)]
        deltas: Vec<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Return previously reserved usage
    Release {
        /// Owner reference, e.g. membership:1
        owner: String,

        /// Deltas as name=value pairs
        #[arg(required = true)]
        deltas: Vec<String>,
    },

    /// Check and reserve an instance resize
    ///
    /// Give either --disk or --vcpu/--ram, not both.
    Resize(ResizeArgs),

    /// Drive and inspect sync states
    Sync {
        #[command(subcommand)]
        action: SyncAction,
    },
}

/// Owner subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum OwnerAction {
    /// Register an owner and create its quotas at the default limits
    Add {
        /// Owner reference, e.g. project:1
        owner: String,

        /// Containing owner, e.g. customer:1
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Remove an owner and everything it contains
    Remove {
        /// Owner reference
        owner: String,
    },

    /// Show an owner followed by its ancestors
    Chain {
        /// Owner reference
        owner: String,
    },

    /// List registered owners
    List {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// User role subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum RoleAction {
    /// A user was granted a role under the customer
    Grant {
        /// Customer reference, e.g. customer:1
        customer: String,
    },

    /// A user lost a role under the customer
    Revoke {
        /// Customer reference, e.g. customer:1
        customer: String,
    },
}

/// Quota subcommands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QuotaAction {
    /// Show every quota of an owner
    Show {
        /// Owner reference
        owner: String,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Override a quota limit (may go below current usage)
    SetLimit {
        owner: String,
        name: String,
        /// New limit; "inf" for unbounded
        #[arg(allow_hyphen_values = true)]
        value: f64,
    },

    /// Override a quota usage
    SetUsage {
        owner: String,
        name: String,
        value: f64,
    },

    /// Sum limits and usage over owners of one type
    ///
    /// Examples:
    ///   prov quota sum project               # every project, every quota
    ///   prov quota sum project --id 1 --id 2 --name storage
    Sum {
        /// Owner type, e.g. project or membership
        owner_type: String,

        /// Owner ids; all owners of the type when omitted
        #[arg(long = "id")]
        ids: Vec<u64>,

        /// Quota names; every registered name when omitted
        #[arg(long = "name")]
        names: Vec<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

/// Resize arguments
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ResizeArgs {
    /// Owner reference, e.g. membership:1
    pub owner: String,

    /// Data volume change as OLD:NEW
    #[arg(long)]
    pub disk: Option<String>,

    /// vCPU change as OLD:NEW
    #[arg(long)]
    pub vcpu: Option<String>,

    /// RAM change as OLD:NEW
    #[arg(long)]
    pub ram: Option<String>,
}

/// Sync subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    /// Show sync states
    Status {
        /// Entity reference, e.g. membership:1 or cloud:2; all when omitted
        entity: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Start tracking a cloud account
    Track {
        /// Cloud id
        cloud: u64,
    },

    /// Stop tracking a cloud account
    Untrack {
        /// Cloud id
        cloud: u64,
    },

    /// Scheduled -> syncing
    Begin { entity: String },

    /// Synced -> scheduled
    Schedule { entity: String },

    /// Syncing -> synced
    InSync { entity: String },

    /// Any state -> erred
    Erred { entity: String },

    /// Erred -> scheduled
    Reset { entity: String },
}
