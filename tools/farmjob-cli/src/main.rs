//! farmjob CLI — Command-line interface for compiling render-farm jobs.
//!
//! Usage:
//!   farmjob compile <JOB>       Compile a job file into a task graph
//!   farmjob validate <JOB>      Compile a copy and report on the graph
//!   farmjob chunk <FRAMES>      Show how a frame range is split into tasks
//!   farmjob job-types [NAME]    List job types or show one type's settings
//!   farmjob config [--init]     Show or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use farmjob_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "farmjob",
    about = "Compile render jobs into task graphs for a render farm",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a job file and write the job with its tasks
    Compile {
        /// Path to the job JSON file
        job: PathBuf,

        /// Compile with this job type instead of the one in the file
        #[arg(long)]
        job_type: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a job without writing it and report on the task graph
    Validate {
        /// Path to the job JSON file
        job: PathBuf,

        /// Compile with this job type instead of the one in the file
        #[arg(long)]
        job_type: Option<String>,
    },

    /// Split a frame range into render chunks
    Chunk {
        /// Frame range, e.g. "1-250" or "3, 5-10, 47-327"
        frames: String,

        /// Frames per chunk
        #[arg(short, long, default_value = "1")]
        size: i64,
    },

    /// List the built-in job types, or show one in detail
    JobTypes {
        /// Job type to show
        name: Option<String>,
    },

    /// Print the effective configuration
    Config {
        /// Write it to the --config file, or the user config directory
        #[arg(long)]
        init: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let writing_config = matches!(cli.command, Commands::Config { init: true });
    let config = match &cli.config {
        Some(path) if writing_config && !path.exists() => AppConfig::default(),
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };
    farmjob_common::logging::init_cli_logging(cli.verbose, &config.logging);
    tracing::debug!(
        config_file = ?cli.config,
        default_chunk_size = config.compiler.default_chunk_size,
        timestamp_zone = ?config.compiler.timestamp_zone,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Compile {
            job,
            job_type,
            output,
        } => commands::compile::run(job, job_type, output, &config),
        Commands::Validate { job, job_type } => commands::validate::run(job, job_type, &config),
        Commands::Chunk { frames, size } => commands::chunk::run(&frames, size),
        Commands::JobTypes { name } => commands::job_types::run(name.as_deref(), &config),
        Commands::Config { init } => commands::config::run(init, cli.config, &config),
    }
}
