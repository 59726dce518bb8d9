//! CLI error type.

use thiserror::Error;

use packhaul::package::MetadataError;
use packhaul::InstallError;

/// Errors surfaced to the terminal with a non-zero exit code.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),

    #[error("request failed: {0}")]
    Http(String),

    #[error("invalid manifest: {0}")]
    Parse(String),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
