//! BBR Artifact - Main entry point
//!
//! Inspects backup directories produced by the backup orchestrator.

use anyhow::Result;
use bbr_artifact::{cli, config::Config, utils, ArtifactIdentifier, BackupDirectoryManager, InstanceRef};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding backup directories (overrides config)
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompute every recorded checksum and compare
    Validate {
        /// Backup directory name
        name: String,
    },

    /// Print the backup metadata
    Show {
        name: String,

        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },

    /// Recompute one artifact's checksum and compare it with the metadata
    Checksum {
        name: String,

        #[command(flatten)]
        artifact: ArtifactArgs,
    },

    /// Check that recorded instances exist in a deployment
    Matches {
        name: String,

        /// Deployment name
        #[arg(short, long)]
        deployment: String,

        /// Live instance as NAME/INDEX (repeatable)
        #[arg(short, long = "instance", value_parser = cli::parse_instance)]
        instances: Vec<InstanceRef>,
    },
}

#[derive(Args, Debug)]
struct ArtifactArgs {
    /// Custom artifact name
    #[arg(long, conflicts_with_all = ["instance", "index", "artifact"])]
    custom: Option<String>,

    /// Instance name
    #[arg(long, requires_all = ["index", "artifact"])]
    instance: Option<String>,

    /// Instance index
    #[arg(long)]
    index: Option<String>,

    /// Artifact name within the instance
    #[arg(long)]
    artifact: Option<String>,
}

impl ArtifactArgs {
    fn identifier(self) -> Result<ArtifactIdentifier> {
        match self {
            ArtifactArgs { custom: Some(name), .. } => Ok(ArtifactIdentifier::custom(name)),
            ArtifactArgs {
                instance: Some(instance),
                index: Some(index),
                artifact: Some(artifact),
                ..
            } => Ok(ArtifactIdentifier::instance(instance, index, artifact)),
            _ => anyhow::bail!("either --custom or --instance, --index and --artifact are required"),
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    // Load configuration
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    // Initialize logging
    let log_level = args.log_level.as_deref().unwrap_or(&config.log.level);
    utils::logger::init(log_level)?;

    let root = args.root.unwrap_or(config.store.root);
    tracing::debug!("Using backup root {}", root.display());
    let manager = BackupDirectoryManager::with_root(root);

    let mut stdout = std::io::stdout().lock();
    let ok = match args.command {
        Command::Validate { name } => cli::validate(&manager, &name, &mut stdout)?,
        Command::Show { name, json } => {
            cli::show(&manager, &name, json, &mut stdout)?;
            true
        }
        Command::Checksum { name, artifact } => {
            cli::checksum(&manager, &name, &artifact.identifier()?, &mut stdout)?
        }
        Command::Matches {
            name,
            deployment,
            instances,
        } => cli::matches(&manager, &name, &deployment, &instances, &mut stdout)?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
