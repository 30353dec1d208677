//! CLI implementation using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Testinspect - per-test resource profiling and static test features.
#[derive(Parser)]
#[command(name = "testinspect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the project under test
    #[arg(short, long, default_value = ".")]
    pub path: PathBuf,

    /// Output format for inspection commands
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Profile a test session: snapshot static features, then run each
    /// test in an isolated worker measuring its resource usage
    Run(RunArgs),

    /// Print the per-line churn map for recent history
    Churn(ChurnArgs),

    /// Print static feature records for collected tests
    Statics(StaticsArgs),

    /// Internal single-test worker mode
    #[command(hide = true)]
    Worker(WorkerArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// JSON manifest of collected test items
    #[arg(short, long)]
    pub manifest: PathBuf,

    /// Base path deriving the report, snapshot and coverage file names;
    /// without it the harness stays inactive
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Command template for one test; `{id}` is replaced with the node id
    #[arg(long)]
    pub cmd: Option<String>,

    /// Run the collection phase only
    #[arg(long)]
    pub collect_only: bool,

    /// Tolerate collection errors instead of aborting the run phase
    #[arg(long)]
    pub continue_on_collection_errors: bool,
}

#[derive(Args)]
pub struct ChurnArgs {
    /// Number of commits in the history window
    #[arg(long)]
    pub window: Option<u32>,
}

#[derive(Args)]
pub struct StaticsArgs {
    /// JSON manifest of collected test items
    #[arg(short, long)]
    pub manifest: PathBuf,
}

#[derive(Args)]
pub struct WorkerArgs {
    /// Base path for the session's output files
    #[arg(long)]
    pub output: PathBuf,

    /// Command template for one test
    #[arg(long)]
    pub cmd: String,

    /// Node id of the test to run
    #[arg(long)]
    pub node_id: String,

    /// Callable identity of the test
    #[arg(long)]
    pub callable: String,

    /// Source file of the test
    #[arg(long)]
    pub file: PathBuf,

    /// 1-based definition line of the test
    #[arg(long)]
    pub line: u32,
}

/// Output format selection.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}
