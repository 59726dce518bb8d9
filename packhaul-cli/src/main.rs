//! Packhaul CLI - command-line interface
//!
//! This binary provides a command-line interface to the packhaul
//! library: installing, updating, listing, and removing versioned
//! content packages described by a remote manifest.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use packhaul::InstallerConfig;

#[derive(Parser)]
#[command(
    name = "packhaul",
    version,
    about = "Fetch, verify and install versioned content packages"
)]
struct Cli {
    /// Root directory packages install into
    #[arg(long, global = true, default_value = "packs")]
    install_root: PathBuf,

    /// Directory downloads are staged in (default: <install-root>/.staging)
    #[arg(long, global = true)]
    staging_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a package at the version the manifest advertises
    Install {
        package_id: String,
        /// URL of the JSON package manifest
        #[arg(long)]
        manifest_url: String,
        /// Cap on simultaneous downloads
        #[arg(long)]
        max_concurrent: Option<usize>,
    },
    /// Update an installed package to the manifest version
    Update {
        package_id: String,
        #[arg(long)]
        manifest_url: String,
    },
    /// Remove an installed package
    Remove { package_id: String },
    /// List installed packages
    List,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let staging_dir = cli
        .staging_dir
        .clone()
        .unwrap_or_else(|| cli.install_root.join(".staging"));
    let mut config = InstallerConfig::new(cli.install_root, staging_dir);

    let result = match cli.command {
        Commands::Install {
            package_id,
            manifest_url,
            max_concurrent,
        } => {
            if let Some(max) = max_concurrent {
                config = config.with_max_concurrent_downloads(max);
            }
            commands::install::run(config, &manifest_url, &package_id)
        }
        Commands::Update {
            package_id,
            manifest_url,
        } => commands::update::run(config, &manifest_url, &package_id),
        Commands::Remove { package_id } => commands::remove::run(config, &package_id),
        Commands::List => commands::list::run(config),
    };

    if let Err(err) = result {
        eprintln!("{} {}", style("error:").red().bold(), err);
        process::exit(1);
    }
}
