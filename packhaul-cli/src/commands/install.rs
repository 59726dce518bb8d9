//! `packhaul install` - install a package from a manifest.

use console::style;

use packhaul::{InstallerConfig, PackageInstaller};

use crate::commands::common;
use crate::error::CliError;

pub fn run(config: InstallerConfig, manifest_url: &str, package_id: &str) -> Result<(), CliError> {
    let manifests = common::fetch_manifests(manifest_url)?;
    let mut package = common::lookup_package(&manifests, package_id)?;

    let installer = PackageInstaller::new(config);
    package.load_installed(&installer.config().install_dir(package_id))?;

    if package.is_installed() && !package.update_available() {
        println!(
            "{package_id} {} is already installed",
            package.latest_version
        );
        return Ok(());
    }

    println!(
        "installing {package_id} {} ({})",
        package.latest_version,
        common::format_bytes(package.total_size)
    );

    let bar = common::new_progress_bar();
    let callback = common::progress_callback(bar.clone());
    let metadata = installer.install(&mut package, Some(&callback))?;
    bar.finish_and_clear();

    println!(
        "{} installed {package_id} {} into {}",
        style("✓").green(),
        metadata.version,
        metadata.install_path.display()
    );
    Ok(())
}
