use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GenomicOpsError {
    #[error("Invalid region format: {0}. Use e.g. 'chr1:1000-2000'.")]
    InvalidRegion(String),

    #[error("invalid assembly identifier: {0:?}")]
    InvalidAssembly(String),

    #[error("Unsupported OS for liftOver: {0}")]
    UnsupportedPlatform(String),

    #[error("failed to provision {url}: {message}")]
    Provisioning { url: String, message: String },

    #[error("UCSC request failed: {0}")]
    UcscHttp(String),

    #[error("UCSC returned status {status}: {message}")]
    UcscStatus { status: u16, message: String },

    #[error("unexpected UCSC response: {0}")]
    InvalidResponse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}
