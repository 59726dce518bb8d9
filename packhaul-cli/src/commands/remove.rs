//! `packhaul remove` - uninstall a package.

use console::style;

use packhaul::{InstallerConfig, PackageInstaller};

use crate::error::CliError;

pub fn run(config: InstallerConfig, package_id: &str) -> Result<(), CliError> {
    let installer = PackageInstaller::new(config);

    let was_installed = installer.installed_metadata(package_id)?.is_some();
    installer.remove_package_dir(package_id)?;

    if was_installed {
        println!("{} removed {package_id}", style("✓").green());
    } else {
        println!("{package_id} is not installed");
    }
    Ok(())
}
