use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use iiskit::ResourceType;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "iisprov")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Idempotent IIS provisioning: pools, sites, applications", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the appcmd executable
    #[arg(long, global = true, env = "IISPROV_APPCMD")]
    pub appcmd: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create missing pools, sites and applications
    Apply(ApplyArgs),

    /// List the current inventory of one resource type
    List(ListArgs),

    /// Show the targets resolved from the target file
    Targets(TargetsArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Apply
// ============================================================================

#[derive(Args)]
pub struct ApplyArgs {
    /// Targets from the target file (all targets when omitted)
    pub targets: Vec<String>,

    /// Target file (default: <config dir>/targets.toml)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Print the step reports as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Desired state given on the command line.
///
/// Used as the target when there is no target file, and as overrides on top
/// of file targets otherwise.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Site name
    #[arg(long)]
    pub site: Option<String>,

    /// Full binding, e.g. https://*:443
    #[arg(long, conflicts_with_all = ["protocol", "host", "port"])]
    pub binding: Option<String>,

    /// Binding protocol; unset parts come from the target's binding
    #[arg(long)]
    pub protocol: Option<String>,

    /// Binding host; unset parts come from the target's binding
    #[arg(long)]
    pub host: Option<String>,

    /// Binding port; unset parts come from the target's binding
    #[arg(long)]
    pub port: Option<u16>,

    /// Certificate thumbprint for a secure binding
    #[arg(long)]
    pub cert: Option<String>,

    /// Application path within the site
    #[arg(long)]
    pub path: Option<String>,

    /// Application pool name (derived from the path when omitted)
    #[arg(long)]
    pub pool: Option<String>,

    /// Managed runtime version of a new pool
    #[arg(long = "runtime")]
    pub managed_runtime_version: Option<String>,

    /// Physical path of the application (default: current directory)
    #[arg(long)]
    pub physical_path: Option<String>,
}

// ============================================================================
// List
// ============================================================================

#[derive(Args)]
pub struct ListArgs {
    /// Resource type to list
    #[arg(value_enum)]
    pub resource_type: ResourceKind,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    #[value(alias = "pool")]
    Apppool,
    Site,
    App,
    Vdir,
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Apppool => ResourceType::AppPool,
            ResourceKind::Site => ResourceType::Site,
            ResourceKind::App => ResourceType::App,
            ResourceKind::Vdir => ResourceType::Vdir,
        }
    }
}

// ============================================================================
// Targets
// ============================================================================

#[derive(Args)]
pub struct TargetsArgs {
    /// Target file (default: <config dir>/targets.toml)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}
