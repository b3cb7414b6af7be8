use std::ffi::OsString;
use std::fmt::Display;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;

use camino::Utf8PathBuf;
use flate2::read::GzDecoder;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Platform, Region};
use crate::error::GenomicOpsError;
use crate::store::{BINARY_NAME, Store};
use crate::ucsc::Downloader;

#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions {
    pub ensure_binary: bool,
    pub ensure_chain: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            ensure_binary: true,
            ensure_chain: true,
        }
    }
}

/// Expected ways a conversion can come back without coordinates. These are
/// reported to the caller, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiftoverFailure {
    #[error("Missing liftOver binary: {0}")]
    MissingBinary(String),

    #[error("liftOver binary not found")]
    BinaryNotFound,

    #[error("Missing chain file: {0}")]
    MissingChain(String),

    #[error("Chain file not found: {0}")]
    ChainNotFound(String),

    #[error("liftOver failed: {0}")]
    ToolFailed(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("No mapping found for {region} ({from}->{to})")]
    NoMapping {
        region: String,
        from: String,
        to: String,
    },

    #[error("Malformed liftOver output: {0}")]
    MalformedOutput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiftoverOutcome {
    Mapped(String),
    Failed(LiftoverFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiftoverResult {
    pub input: String,
    pub from: String,
    pub to: String,
    pub outcome: LiftoverOutcome,
}

impl LiftoverResult {
    pub fn output(&self) -> Option<&str> {
        match &self.outcome {
            LiftoverOutcome::Mapped(region) => Some(region),
            LiftoverOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            LiftoverOutcome::Mapped(_) => None,
            LiftoverOutcome::Failed(failure) => Some(failure.to_string()),
        }
    }
}

#[derive(Serialize)]
struct LiftoverRecord<'a> {
    input: &'a str,
    from: &'a str,
    to: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Serialize for LiftoverResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LiftoverRecord {
            input: &self.input,
            from: &self.from,
            to: &self.to,
            output: self.output(),
            error: self.error(),
        }
        .serialize(serializer)
    }
}

/// UCSC chain file name for a pair of assemblies, e.g. `hg19ToHg38.over.chain.gz`.
pub fn chain_file_name(from: &str, to: &str) -> Result<String, GenomicOpsError> {
    let from = validate_assembly(from)?;
    let to = validate_assembly(to)?;

    let mut chars = to.chars();
    let target = match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str().to_lowercase()),
        None => return Err(GenomicOpsError::InvalidAssembly(to.to_string())),
    };
    Ok(format!("{}To{target}.over.chain.gz", from.to_lowercase()))
}

fn validate_assembly(value: &str) -> Result<&str, GenomicOpsError> {
    let trimmed = value.trim();
    let is_valid = !trimmed.is_empty()
        && !trimmed.starts_with('.')
        && trimmed
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '.');
    if !is_valid {
        return Err(GenomicOpsError::InvalidAssembly(value.to_string()));
    }
    Ok(trimmed)
}

/// Provisions the UCSC `liftOver` executable and chain files under a `Store`
/// and runs single-region conversions.
pub struct Liftover<D: Downloader> {
    downloader: D,
    store: Store,
    download_base: String,
    search_path: Option<OsString>,
}

impl<D: Downloader> Liftover<D> {
    pub fn new(downloader: D, store: Store, download_base: impl Into<String>) -> Self {
        Self {
            downloader,
            store,
            download_base: download_base.into(),
            search_path: None,
        }
    }

    /// Directories searched for a system `liftOver` when provisioning is
    /// skipped, in `PATH` syntax. Defaults to the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn binary_url(&self, platform: Platform) -> String {
        format!(
            "{}/admin/exe/{}/{BINARY_NAME}",
            self.download_base,
            platform.folder()
        )
    }

    pub fn chain_url(&self, from: &str, chain_name: &str) -> String {
        format!(
            "{}/goldenPath/{}/liftOver/{chain_name}",
            self.download_base,
            from.trim()
        )
    }

    pub fn ensure_binary(&self, force: bool) -> Result<Utf8PathBuf, GenomicOpsError> {
        let bin_path = self.store.binary_path();
        if !force && is_executable(bin_path.as_std_path()) {
            return Ok(bin_path);
        }

        let platform = Platform::current()?;
        let url = self.binary_url(platform);
        info!(%url, path = %bin_path, "downloading liftOver binary");

        let temp = Store::temp_file_for(&bin_path).map_err(|err| provisioning(&url, err))?;
        self.downloader
            .download(&url, temp.path())
            .map_err(|err| provisioning(&url, err))?;
        set_executable(temp.path()).map_err(|err| provisioning(&url, err))?;
        Store::install(temp, &bin_path).map_err(|err| provisioning(&url, err))?;

        if !is_executable(bin_path.as_std_path()) {
            return Err(provisioning(
                &url,
                format!("liftOver binary is not executable at {bin_path}"),
            ));
        }
        Ok(bin_path)
    }

    pub fn ensure_chain(
        &self,
        from: &str,
        to: &str,
        force: bool,
    ) -> Result<Utf8PathBuf, GenomicOpsError> {
        let chain_name = chain_file_name(from, to)?;
        let chain_path = self.store.chain_path(&chain_name);
        if !force && chain_path.as_std_path().exists() {
            return Ok(chain_path);
        }

        let url = self.chain_url(from, &chain_name);
        info!(%url, path = %chain_path, "downloading chain file");

        let temp = Store::temp_file_for(&chain_path).map_err(|err| provisioning(&url, err))?;
        self.downloader
            .download(&url, temp.path())
            .map_err(|err| provisioning(&url, err))?;
        validate_chain_file(temp.path()).map_err(|err| provisioning(&url, err))?;
        Store::install(temp, &chain_path).map_err(|err| provisioning(&url, err))?;
        Ok(chain_path)
    }

    /// Lifts `region` from one assembly to another. Only a malformed region is
    /// an error; every other problem is reported in the result.
    pub fn convert(
        &self,
        region: &str,
        from: &str,
        to: &str,
        options: ConvertOptions,
    ) -> Result<LiftoverResult, GenomicOpsError> {
        let parsed: Region = region.parse()?;

        let outcome = match self.resolve_artifacts(from, to, options) {
            Ok((binary, chain)) => {
                match self.run(&binary, &chain, &parsed, region, from, to) {
                    Ok(mapped) => LiftoverOutcome::Mapped(mapped),
                    Err(failure) => LiftoverOutcome::Failed(failure),
                }
            }
            Err(failure) => LiftoverOutcome::Failed(failure),
        };
        if let LiftoverOutcome::Failed(failure) = &outcome {
            debug!(region, from, to, %failure, "liftover did not map");
        }

        Ok(LiftoverResult {
            input: region.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            outcome,
        })
    }

    fn resolve_artifacts(
        &self,
        from: &str,
        to: &str,
        options: ConvertOptions,
    ) -> Result<(PathBuf, PathBuf), LiftoverFailure> {
        let binary = if options.ensure_binary {
            self.ensure_binary(false)
                .map(Utf8PathBuf::into_std_path_buf)
                .map_err(|err| LiftoverFailure::MissingBinary(err.to_string()))?
        } else {
            let local = self.store.binary_path().into_std_path_buf();
            if local.exists() {
                local
            } else {
                find_in_path(BINARY_NAME, self.search_path.clone())
                    .ok_or(LiftoverFailure::BinaryNotFound)?
            }
        };

        let chain = if options.ensure_chain {
            self.ensure_chain(from, to, false)
                .map_err(|err| LiftoverFailure::MissingChain(err.to_string()))?
        } else {
            let chain_name = chain_file_name(from, to)
                .map_err(|err| LiftoverFailure::MissingChain(err.to_string()))?;
            let chain_path = self.store.chain_path(&chain_name);
            if !chain_path.as_std_path().exists() {
                return Err(LiftoverFailure::ChainNotFound(chain_path.to_string()));
            }
            chain_path
        };

        Ok((binary, chain.into_std_path_buf()))
    }

    fn run(
        &self,
        binary: &Path,
        chain: &Path,
        region: &Region,
        input: &str,
        from: &str,
        to: &str,
    ) -> Result<String, LiftoverFailure> {
        let workdir = tempfile::Builder::new()
            .prefix("genomicops-liftover")
            .tempdir()
            .map_err(|err| LiftoverFailure::Execution(err.to_string()))?;
        let in_bed = workdir.path().join("input.bed");
        let out_bed = workdir.path().join("output.bed");
        let unmapped = workdir.path().join("unmapped.bed");

        fs::write(&in_bed, region.to_bed_line())
            .map_err(|err| LiftoverFailure::Execution(err.to_string()))?;

        debug!(binary = %binary.display(), chain = %chain.display(), "running liftOver");
        let output = Command::new(binary)
            .arg(&in_bed)
            .arg(chain)
            .arg(&out_bed)
            .arg(&unmapped)
            .output()
            .map_err(|err| LiftoverFailure::Execution(err.to_string()))?;

        // Some builds exit non-zero when only part of the input maps.
        if !output.status.success() && !out_bed.exists() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(LiftoverFailure::ToolFailed(stderr));
        }

        let no_mapping = || LiftoverFailure::NoMapping {
            region: input.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        };
        let content = match fs::read_to_string(&out_bed) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(no_mapping()),
            Err(err) => return Err(LiftoverFailure::Execution(err.to_string())),
        };
        let line = content
            .lines()
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or_else(no_mapping)?;

        parse_bed_line(line).ok_or_else(|| LiftoverFailure::MalformedOutput(line.to_string()))
    }
}

/// `chrom\tstart\tend` (0-based, half-open) back to `chrom:start-end`
/// (1-based, inclusive).
fn parse_bed_line(line: &str) -> Option<String> {
    let mut fields = line.split('\t');
    let chrom = fields.next().filter(|chrom| !chrom.is_empty())?;
    let start = fields.next()?.trim().parse::<i64>().ok()?;
    let end = fields.next()?.trim().parse::<i64>().ok()?;
    Some(format!("{chrom}:{}-{end}", start.checked_add(1)?))
}

fn validate_chain_file(path: &Path) -> io::Result<()> {
    let reader = BufReader::new(GzDecoder::new(File::open(path)?));
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with("chain") {
            return Ok(());
        }
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a UCSC chain file",
        ));
    }
    Err(io::Error::new(
        io::ErrorKind::InvalidData,
        "chain file has no alignments",
    ))
}

fn provisioning(url: &str, err: impl Display) -> GenomicOpsError {
    GenomicOpsError::Provisioning {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn set_executable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> io::Result<()> {
    Ok(())
}

fn find_in_path(name: &str, search_path: Option<OsString>) -> Option<PathBuf> {
    let path_var = search_path.or_else(|| std::env::var_os("PATH"))?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}
