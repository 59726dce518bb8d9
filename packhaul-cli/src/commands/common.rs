//! Shared helpers for CLI commands: manifest fetching, progress
//! rendering, and byte formatting.

use std::collections::HashMap;

use indicatif::{ProgressBar, ProgressStyle};

use packhaul::installer::{InstallProgressCallback, InstallStage};
use packhaul::package::{Package, PackageManifest};

use crate::error::CliError;

/// Fetch and parse a remote package manifest.
///
/// The manifest is a JSON object mapping package ids to their latest
/// release entries.
pub fn fetch_manifests(url: &str) -> Result<HashMap<String, PackageManifest>, CliError> {
    let response = reqwest::blocking::get(url).map_err(|e| CliError::Http(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Http(format!("{url} returned status {status}")));
    }

    let text = response.text().map_err(|e| CliError::Http(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| CliError::Parse(e.to_string()))
}

/// Resolve one package from the fetched manifests.
pub fn lookup_package(
    manifests: &HashMap<String, PackageManifest>,
    package_id: &str,
) -> Result<Package, CliError> {
    let manifest = manifests.get(package_id).ok_or_else(|| {
        CliError::Config(format!("package {package_id} not found in manifest"))
    })?;
    Ok(Package::from_manifest(package_id, package_id, manifest))
}

pub fn new_progress_bar() -> ProgressBar {
    ProgressBar::new(100).with_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            .expect("valid progress template"),
    )
}

/// Bridge installer progress snapshots onto a progress bar.
pub fn progress_callback(bar: ProgressBar) -> InstallProgressCallback {
    Box::new(move |p| {
        bar.set_position((p.progress * 100.0) as u64);
        match p.stage {
            InstallStage::Downloading => {
                if p.download_speed > 0 {
                    bar.set_message(format!(
                        "downloading ({}/s)",
                        format_bytes(p.download_speed)
                    ));
                } else {
                    bar.set_message("downloading");
                }
            }
            InstallStage::Extracting => match &p.current_file {
                Some(file) => bar.set_message(format!(
                    "extracting {file} ({}/{})",
                    p.completed_files, p.total_files
                )),
                None => bar.set_message("extracting"),
            },
            InstallStage::Finalizing => bar.set_message("finalizing"),
        }
    })
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let bytes = bytes as f64;
    if bytes >= GB {
        format!("{:.1} GB", bytes / GB)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes / MB)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}
