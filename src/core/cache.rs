//! Content-addressed build cache
//!
//! A package is fingerprinted by hashing its file tree; a build is skipped
//! when the fingerprint matches the one recorded after its last successful
//! build. The cache can be persisted between invocations as a small JSON file.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::config::defaults;
use crate::error::CacheError;

/// Which files contribute to a digest, and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestPolicy {
    /// Directory names pruned from the walk
    pub ignored_dirs: Vec<String>,
    /// File names skipped
    pub ignored_files: Vec<String>,
    /// Extensions whose content is hashed
    pub source_extensions: Vec<String>,
    /// Files at or above this size contribute only their size
    pub max_content_bytes: u64,
}

impl Default for DigestPolicy {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| (*s).to_string()).collect();
        Self {
            ignored_dirs: owned(defaults::IGNORED_DIRS),
            ignored_files: owned(defaults::IGNORED_FILES),
            source_extensions: owned(defaults::SOURCE_EXTENSIONS),
            max_content_bytes: defaults::MAX_CONTENT_HASH_BYTES,
        }
    }
}

impl DigestPolicy {
    /// Check if a directory name is pruned
    pub fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|d| d == name)
    }

    /// Check if a file name is skipped
    pub fn is_ignored_file(&self, name: &str) -> bool {
        self.ignored_files.iter().any(|f| f == name)
    }

    /// Check if a file's content (rather than its size) is hashed
    pub fn hashes_content(&self, path: &Path, size: u64) -> bool {
        size < self.max_content_bytes
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| self.source_extensions.iter().any(|s| s == ext))
    }

    /// Check if any component of `relative` is an ignored directory or file
    pub fn is_ignored_path(&self, relative: &Path) -> bool {
        let mut components = relative.components().peekable();
        while let Some(component) = components.next() {
            let name = component.as_os_str().to_string_lossy();
            let is_last = components.peek().is_none();
            if self.is_ignored_dir(&name) || (is_last && self.is_ignored_file(&name)) {
                return true;
            }
        }
        false
    }
}

/// Hash a package directory into a lowercase hex SHA-256 digest
///
/// Every regular file contributes its relative path, its modification time
/// and its size, plus its content for source files under the size limit.
/// Entries that cannot be read are logged and left out.
pub fn digest_directory(dir: &Path, policy: &DigestPolicy) -> String {
    let mut hasher = Sha256::new();

    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !policy.is_ignored_dir(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let denied = e
                    .io_error()
                    .is_some_and(|io| io.kind() == ErrorKind::PermissionDenied);
                if denied {
                    tracing::debug!("Skipping unreadable entry: {e}");
                } else {
                    tracing::warn!("Skipping entry while hashing {}: {e}", dir.display());
                }
                continue;
            }
        };

        if !entry.file_type().is_file()
            || policy.is_ignored_file(&entry.file_name().to_string_lossy())
        {
            continue;
        }

        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Failed to stat {}: {e}", path.display());
                continue;
            }
        };

        let relative = path.strip_prefix(dir).unwrap_or(path);
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);

        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |d| d.as_nanos());
        hasher.update(mtime.to_le_bytes());

        // Size first so content never runs into the next entry's path
        let size = metadata.len();
        hasher.update(size.to_le_bytes());
        if policy.hashes_content(path, size) {
            if let Err(e) = hash_file(path, &mut hasher) {
                tracing::warn!("Failed to read {}: {e}", path.display());
            }
        }
    }

    hex::encode(hasher.finalize())
}

fn hash_file(path: &Path, hasher: &mut Sha256) -> std::io::Result<()> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 8192];
    loop {
        let n = file.read(&mut buffer)?;
        if n == 0 {
            return Ok(());
        }
        hasher.update(&buffer[..n]);
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Packages with a recorded digest
    pub entries_cached: usize,
    /// Distinct packages the cache has seen
    pub total_known: usize,
}

/// On-disk representation
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// Last successful build digest per package
#[derive(Debug, Default)]
pub struct ContentCache {
    entries: DashMap<String, String>,
    known: DashSet<String>,
    policy: Arc<DigestPolicy>,
}

impl ContentCache {
    /// Create an empty cache with the default digest policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache with a custom digest policy
    pub fn with_policy(policy: DigestPolicy) -> Self {
        Self {
            policy: Arc::new(policy),
            ..Self::default()
        }
    }

    /// Digest policy shared with the watcher
    pub fn policy(&self) -> Arc<DigestPolicy> {
        Arc::clone(&self.policy)
    }

    /// Digest a package directory with this cache's policy
    pub fn digest(&self, dir: &Path) -> String {
        digest_directory(dir, &self.policy)
    }

    /// Check if `digest` equals the recorded digest for `package`
    pub fn is_unchanged(&self, package: &str, digest: &str) -> bool {
        self.entries
            .get(package)
            .is_some_and(|recorded| recorded.value() == digest)
    }

    /// Record the digest of a successful build
    pub fn record(&self, package: &str, digest: &str) {
        self.known.insert(package.to_string());
        self.entries.insert(package.to_string(), digest.to_string());
    }

    /// Forget a package's digest, returning whether one was recorded
    pub fn invalidate(&self, package: &str) -> bool {
        self.known.insert(package.to_string());
        self.entries.remove(package).is_some()
    }

    /// Forget every digest
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Recorded digest for a package
    pub fn get(&self, package: &str) -> Option<String> {
        self.entries.get(package).map(|d| d.value().clone())
    }

    /// All recorded digests, ordered by package name
    pub fn entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        entries.sort();
        entries
    }

    /// Current statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries_cached: self.entries.len(),
            total_known: self.known.len(),
        }
    }

    /// Load a persisted cache
    ///
    /// A missing file yields an empty cache, as does a file written by an
    /// unknown format version.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Read` or `CacheError::Parse` for an unreadable or
    /// malformed file.
    pub fn load(path: &Path, policy: DigestPolicy) -> Result<Self, CacheError> {
        let cache = Self::with_policy(policy);
        if !path.exists() {
            return Ok(cache);
        }

        let content = std::fs::read_to_string(path).map_err(|e| CacheError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let file: CacheFile = serde_json::from_str(&content).map_err(|e| CacheError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        if file.version != defaults::CACHE_FORMAT_VERSION {
            tracing::warn!(
                "Ignoring cache file {} with unsupported version {}",
                path.display(),
                file.version
            );
            return Ok(cache);
        }

        for (package, digest) in file.entries {
            cache.record(&package, &digest);
        }
        tracing::debug!(
            "Loaded {} cache entries from {}",
            cache.entries.len(),
            path.display()
        );
        Ok(cache)
    }

    /// Persist the cache, creating parent directories as needed
    ///
    /// # Errors
    ///
    /// Returns `CacheError::Write` if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let write_error = |e: &dyn std::fmt::Display| CacheError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_error(&e))?;
        }

        let file = CacheFile {
            version: defaults::CACHE_FORMAT_VERSION,
            entries: self.entries().into_iter().collect(),
        };
        let content = serde_json::to_string_pretty(&file).map_err(|e| write_error(&e))?;
        std::fs::write(path, content).map_err(|e| write_error(&e))?;
        Ok(())
    }
}
