//! The remote manifest describing a package's latest release.

use serde::{Deserialize, Serialize};

/// One package's entry in a remote release manifest.
///
/// `size` and `sha256` are optional in the wire format; a zero size
/// means unknown (the Content-Length header fills it in during the
/// download) and an empty digest disables checksum verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageManifest {
    pub version: String,
    pub download_url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub sha256: String,
}

impl PackageManifest {
    /// The expected digest, or `None` when the manifest omits it.
    pub fn checksum(&self) -> Option<&str> {
        if self.sha256.is_empty() {
            None
        } else {
            Some(&self.sha256)
        }
    }
}
