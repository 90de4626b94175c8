//! File-based caching of rendered clips.
//!
//! Generation is the expensive phase, so rendered WAVs are cached
//! under a SHA-256 fingerprint of the generation request. Re-running
//! a script with unchanged events skips the external services
//! entirely.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Default cache root.
///
/// Uses `SOUNDLOOM_CACHE_DIR` if set, otherwise `~/.cache/soundloom`.
pub fn cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SOUNDLOOM_CACHE_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".cache").join("soundloom")
}

/// SHA-256 fingerprint of a generation request.
///
/// Parts are length-prefixed before hashing so adjacent fields cannot
/// run together.
pub fn request_fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.len().to_le_bytes());
        hasher.update(part.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Rendered-clip cache rooted at a directory.
#[derive(Debug, Clone)]
pub struct RenderCache {
    root: PathBuf,
}

impl RenderCache {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Cache at the default location.
    pub fn at_default_location() -> Self {
        Self::new(cache_dir().join("renders"))
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.wav", key))
    }

    /// Path of a cached rendering, or None on miss.
    pub fn lookup(&self, key: &str) -> Option<PathBuf> {
        let path = self.entry_path(key);
        if path.exists() && path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            log::info!("cache hit: render ({}...)", &key[..12.min(key.len())]);
            Some(path)
        } else {
            None
        }
    }

    /// Store rendered bytes under a key, atomically.
    pub fn store(&self, key: &str, bytes: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create cache dir: {}", self.root.display()))?;
        let dest = self.entry_path(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)
            .context("failed to create cache temp file")?;
        std::io::Write::write_all(&mut tmp, bytes).context("failed to write cache entry")?;
        tmp.persist(&dest)
            .map_err(|e| anyhow::anyhow!("failed to persist cache entry: {}", e))?;
        Ok(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> (tempfile::TempDir, RenderCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = RenderCache::new(dir.path().join("renders"));
        (dir, cache)
    }

    #[test]
    fn test_fingerprint_stable() {
        let a = request_fingerprint(&["ambient", "rain", "30"]);
        let b = request_fingerprint(&["ambient", "rain", "30"]);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_sensitive_to_parts() {
        let a = request_fingerprint(&["ambient", "rain", "30"]);
        let b = request_fingerprint(&["ambient", "rain", "31"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_field_boundaries() {
        // "ab" + "c" must not hash like "a" + "bc"
        let a = request_fingerprint(&["ab", "c"]);
        let b = request_fingerprint(&["a", "bc"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_lookup_miss_then_hit() {
        let (_dir, cache) = temp_cache();
        let key = request_fingerprint(&["test", "entry"]);
        assert!(cache.lookup(&key).is_none());

        let stored = cache.store(&key, b"RIFF fake wav bytes").unwrap();
        let found = cache.lookup(&key).unwrap();
        assert_eq!(stored, found);
        assert_eq!(std::fs::read(&found).unwrap(), b"RIFF fake wav bytes");
    }

    #[test]
    fn test_empty_entry_is_a_miss() {
        let (_dir, cache) = temp_cache();
        let key = request_fingerprint(&["empty"]);
        cache.store(&key, b"").unwrap();
        assert!(cache.lookup(&key).is_none());
    }

    #[test]
    fn test_cache_dir_env_override() {
        // Can't mutate the environment safely in parallel tests; just
        // check the default shape.
        let dir = cache_dir();
        assert!(dir.to_string_lossy().contains("soundloom") || dir.to_string_lossy().contains("cache"));
    }
}
