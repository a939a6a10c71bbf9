//! cloud-init-fixture - validate cloud-init user-data fixtures
//!
//! Loads fixtures the way a provisioning agent would receive them and
//! reports structural problems before a test guest is ever booted.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cloud_init_fixture::{ConfigDocument, Seed, fixtures, load_userdata};

#[derive(Parser)]
#[command(name = "cloud-init-fixture")]
#[command(author, version, about = "Validate cloud-init user-data fixtures", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one or more user-data files
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the normalized document
    Show {
        file: PathBuf,
        #[arg(long, value_enum, env = "CLOUD_INIT_FIXTURE_FORMAT", default_value_t = Format::Yaml)]
        format: Format,
    },
    /// Read a NoCloud seed directory and validate its user-data
    Seed { dir: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

fn init_logging(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")
}

async fn load_file(path: &Path) -> Result<ConfigDocument> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    load_userdata(&data).with_context(|| format!("Invalid user-data in {}", path.display()))
}

fn summarize(source: &str, doc: &ConfigDocument) {
    info!(
        "{}: {} users, {} files, {} other sections",
        source,
        doc.users().len(),
        doc.write_files().len(),
        doc.sections().len()
    );
    for file in doc.write_files() {
        debug!("  {} ({}, {} bytes)", file.path, file.permissions, file.content.len());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Some(Commands::Validate { files }) => {
            for path in &files {
                let doc = load_file(path).await?;
                summarize(&path.display().to_string(), &doc);
            }
            info!("{} fixtures valid", files.len());
        }
        Some(Commands::Show { file, format }) => {
            let doc = load_file(&file).await?;
            let rendered = match format {
                Format::Yaml => doc.to_yaml()?,
                Format::Json => doc.to_json()?,
            };
            println!("{}", rendered.trim_end());
        }
        Some(Commands::Seed { dir }) => {
            let seed = Seed::read(&dir)
                .await
                .with_context(|| format!("Failed to read seed {}", dir.display()))?;
            let doc = seed.document()?;
            let metadata = seed.metadata();
            println!("seed: {}", seed.dir().display());
            println!(
                "instance-id: {}",
                metadata.instance_id.as_deref().unwrap_or("-")
            );
            println!(
                "local-hostname: {}",
                metadata.local_hostname.as_deref().unwrap_or("-")
            );
            println!("network-config: {}", seed.network_config().is_some());
            println!("users: {}", doc.users().len());
            println!("write_files: {}", doc.write_files().len());
        }
        None => {
            info!("No command specified, validating bundled fixtures");
            let doc = fixtures::ubuntu()?;
            summarize("ubuntu/user-data", &doc);
        }
    }

    Ok(())
}
