use std::fs;
use std::io::Write;
use std::time::{Duration, SystemTime};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::GenomicOpsError;

pub const CACHE_FILE_NAME: &str = "ucsc_genomes_cache.json";
pub const BINARY_NAME: &str = "liftOver";

/// Local layout for the catalog cache and provisioned liftover artifacts.
#[derive(Debug, Clone)]
pub struct Store {
    cache_file: Utf8PathBuf,
    liftover_dir: Utf8PathBuf,
    chain_dir: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, GenomicOpsError> {
        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("genomicops")).ok()
            })
            .ok_or_else(|| {
                GenomicOpsError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self::new_with_root(root))
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        let liftover_dir = root.join("liftover");
        Self {
            cache_file: root.join(CACHE_FILE_NAME),
            chain_dir: liftover_dir.join("chains"),
            liftover_dir,
        }
    }

    pub fn new_with_paths(
        cache_file: Utf8PathBuf,
        liftover_dir: Utf8PathBuf,
        chain_dir: Utf8PathBuf,
    ) -> Self {
        Self {
            cache_file,
            liftover_dir,
            chain_dir,
        }
    }

    pub fn cache_file(&self) -> &Utf8Path {
        &self.cache_file
    }

    pub fn liftover_dir(&self) -> &Utf8Path {
        &self.liftover_dir
    }

    pub fn chain_dir(&self) -> &Utf8Path {
        &self.chain_dir
    }

    pub fn binary_path(&self) -> Utf8PathBuf {
        self.liftover_dir.join(BINARY_NAME)
    }

    pub fn chain_path(&self, chain_name: &str) -> Utf8PathBuf {
        self.chain_dir.join(chain_name)
    }

    /// Cached catalog, if present, younger than `ttl` and non-empty. Anything
    /// unreadable is treated as a miss.
    pub fn read_fresh_catalog(&self, ttl: Duration) -> Option<Catalog> {
        let path = self.cache_file.as_std_path();
        let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
        if !is_fresh(modified, SystemTime::now(), ttl) {
            debug!(path = %self.cache_file, "catalog cache is stale");
            return None;
        }

        let content = match fs::read(path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %self.cache_file, %err, "ignoring unreadable catalog cache");
                return None;
            }
        };
        match serde_json::from_slice::<Catalog>(&content) {
            Ok(catalog) if !catalog.is_empty() => Some(catalog),
            Ok(_) => None,
            Err(err) => {
                warn!(path = %self.cache_file, %err, "ignoring corrupted catalog cache");
                None
            }
        }
    }

    pub fn write_catalog(&self, catalog: &Catalog) -> Result<(), GenomicOpsError> {
        let content = serde_json::to_vec_pretty(catalog)
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        Self::write_bytes_atomic(&self.cache_file, &content)
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), GenomicOpsError> {
        let mut temp = Self::temp_file_for(path)?;
        temp.write_all(content)
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        Self::install(temp, path)
    }

    /// Temporary file next to `path`, so a later `install` is a same-filesystem
    /// rename. The file is removed if it is dropped without being installed.
    pub fn temp_file_for(path: &Utf8Path) -> Result<NamedTempFile, GenomicOpsError> {
        let parent = path
            .parent()
            .ok_or_else(|| GenomicOpsError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        Builder::new()
            .prefix(".genomicops-")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))
    }

    pub fn install(temp: NamedTempFile, dest: &Utf8Path) -> Result<(), GenomicOpsError> {
        temp.persist(dest.as_std_path())
            .map_err(|err| GenomicOpsError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

/// A file modified at `modified` is fresh while its age is below `ttl`.
/// Timestamps in the future count as age zero.
pub fn is_fresh(modified: SystemTime, now: SystemTime, ttl: Duration) -> bool {
    let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
    age < ttl
}
