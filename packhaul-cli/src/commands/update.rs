//! `packhaul update` - update an installed package to the manifest
//! version, with rollback on failure.

use console::style;

use packhaul::{InstallerConfig, PackageInstaller};

use crate::commands::common;
use crate::error::CliError;

pub fn run(config: InstallerConfig, manifest_url: &str, package_id: &str) -> Result<(), CliError> {
    let manifests = common::fetch_manifests(manifest_url)?;
    let mut package = common::lookup_package(&manifests, package_id)?;

    let installer = PackageInstaller::new(config);
    package.load_installed(&installer.config().install_dir(package_id))?;

    if !package.is_installed() {
        return Err(CliError::Config(format!(
            "package {package_id} is not installed; use `packhaul install`"
        )));
    }
    if !package.update_available() {
        println!(
            "{package_id} is up to date ({})",
            package.latest_version
        );
        return Ok(());
    }

    let current = package.current_version.as_deref().unwrap_or("?");
    println!(
        "updating {package_id} {current} -> {} ({})",
        package.latest_version,
        common::format_bytes(package.total_size)
    );

    let bar = common::new_progress_bar();
    let callback = common::progress_callback(bar.clone());
    let result = installer.update(&mut package, Some(&callback));
    bar.finish_and_clear();

    let metadata = result?;
    println!(
        "{} updated {package_id} to {}",
        style("✓").green(),
        metadata.version
    );
    Ok(())
}
