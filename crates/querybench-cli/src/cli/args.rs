use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "querybench",
    version,
    about = "Concurrent SQL benchmarking with before/after comparison"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,

    /// debug-level logs and per-iteration progress
    #[arg(long, global = true)]
    pub verbose: bool,

    /// structured JSON logs on stderr
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Benchmark a query set and write reports
    Run(RunArgs),
    /// Diff two saved runs
    Compare(CompareArgs),
    /// Connectivity test plus environment snapshot
    Check(CheckArgs),
    /// Write a default config file
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, default_value = "querybench.json")]
    pub config: PathBuf,

    /// overrides `queriesFile`
    #[arg(long)]
    pub queries: Option<PathBuf>,

    #[arg(long, env = "QUERYBENCH_DSN")]
    pub dsn: Option<String>,

    /// overrides `outputDir`
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// run label, e.g. before|after
    #[arg(long)]
    pub label: Option<String>,

    #[arg(long)]
    pub iterations: Option<usize>,

    #[arg(long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub warmup: Option<usize>,

    /// per-execution timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// all | top | <name prefix>
    #[arg(long, default_value = "all")]
    pub select: String,

    /// keep at most N selected queries (0 = all)
    #[arg(long, default_value_t = 0)]
    pub limit: usize,

    /// write the selected query set to this file before running
    #[arg(long)]
    pub save_queries: Option<PathBuf>,

    /// also write the CSV variant with SQL text
    #[arg(long)]
    pub detailed_csv: bool,

    /// reject unknown config keys; exit 1 when any execution failed
    #[arg(long)]
    pub strict: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompareArgs {
    /// saved run JSON (performance-<label>-<ts>.json)
    #[arg(long)]
    pub before: PathBuf,

    #[arg(long)]
    pub after: PathBuf,

    /// where to write the comparison JSON; omitted means print only
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// How `compare` prints its result on stdout.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table
    Text,
    /// Per-query comparisons as JSON
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CheckArgs {
    #[arg(long, default_value = "querybench.json")]
    pub config: PathBuf,

    #[arg(long, env = "QUERYBENCH_DSN")]
    pub dsn: Option<String>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    #[arg(long, default_value = "querybench.json")]
    pub config: PathBuf,

    /// overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
