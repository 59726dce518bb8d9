//! `packhaul list` - list installed packages.

use std::fs;

use console::style;
use tracing::warn;

use packhaul::package::InstallMetadata;
use packhaul::InstallerConfig;

use crate::error::CliError;

pub fn run(config: InstallerConfig) -> Result<(), CliError> {
    let entries = match fs::read_dir(&config.install_root) {
        Ok(entries) => entries,
        Err(_) => {
            println!("no packages installed");
            return Ok(());
        }
    };

    let mut rows: Vec<(String, InstallMetadata)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        // Staging and backup directories live alongside installs
        if name.starts_with('.') {
            continue;
        }
        match InstallMetadata::read_from(&path) {
            Ok(Some(metadata)) => rows.push((name, metadata)),
            Ok(None) => {}
            Err(err) => warn!("skipping {}: {}", path.display(), err),
        }
    }

    if rows.is_empty() {
        println!("no packages installed");
        return Ok(());
    }

    rows.sort_by(|a, b| a.0.cmp(&b.0));
    for (id, metadata) in rows {
        println!(
            "{}  {}  installed {}",
            style(id).bold(),
            metadata.version,
            metadata.updated_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}
