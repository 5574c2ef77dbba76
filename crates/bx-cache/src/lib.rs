//! Per-workspace, per-branch client cache store for branchdex.

use std::path::{Path, PathBuf};

use bx_git::GitProbe;
use bx_index::ClientCache;
use bx_utils::{atomic_write, sha256_hex_str};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum CacheIoError {
    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache JSON decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cache file missing required fields")]
    Malformed,
}

/// Loads and saves one JSON document per `(workspace, branch)` pair.
pub struct CacheStore {
    storage_dir: PathBuf,
    git: GitProbe,
}

impl CacheStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            git: GitProbe::new(),
        }
    }

    /// `managed-index-cache-{sha256(workspace_path)}-{sha256(branch)}.json`.
    pub fn cache_path(&self, workspace: &Path, branch: &str) -> PathBuf {
        let ws_hash = sha256_hex_str(&workspace.to_string_lossy());
        let branch_hash = sha256_hex_str(branch);
        self.storage_dir
            .join(format!("managed-index-cache-{ws_hash}-{branch_hash}.json"))
    }

    /// Determine the current branch via the git probe, then load its cache.
    /// Any failure (missing file, malformed JSON, missing fields) yields an
    /// empty cache for that branch rather than propagating.
    pub fn load(&self, workspace: &Path) -> ClientCache {
        let branch = match self.git.current_branch(workspace) {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "cache load: could not determine current branch");
                return ClientCache::empty("unknown");
            }
        };

        match self.load_for_branch(workspace, &branch) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, branch = %branch, "cache load failed, starting from empty cache");
                ClientCache::empty(&branch)
            }
        }
    }

    fn load_for_branch(&self, workspace: &Path, branch: &str) -> Result<ClientCache, CacheIoError> {
        let path = self.cache_path(workspace, branch);
        let bytes = std::fs::read(&path)?;
        let cache: ClientCache = serde_json::from_slice(&bytes)?;
        if cache.git_branch.is_empty() {
            return Err(CacheIoError::Malformed);
        }
        Ok(cache)
    }

    /// Atomic write (temp file + fsync + rename). Failure is logged and
    /// swallowed: cache I/O is never allowed to fail a scan.
    pub fn save(&self, workspace: &Path, cache: &ClientCache) {
        let path = self.cache_path(workspace, &cache.git_branch);
        let result = serde_json::to_vec_pretty(cache)
            .map_err(CacheIoError::from)
            .and_then(|bytes| atomic_write(&path, &bytes).map_err(CacheIoError::from));

        if let Err(e) = result {
            warn!(error = %e, path = %path.display(), "cache save failed, continuing without persisting");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bx_index::CacheEntry;
    use std::process::Command;
    use tempfile::tempdir;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let run = |args: &[&str]| {
            assert!(Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(args)
                .status()
                .unwrap()
                .success());
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "t@example.com"]);
        run(&["config", "user.name", "Test"]);
        std::fs::write(dir.path().join("a.txt"), "hi\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
        dir
    }

    #[test]
    fn load_returns_empty_cache_when_no_file_exists() {
        let ws = init_repo();
        let storage = tempdir().unwrap();
        let store = CacheStore::new(storage.path());
        let cache = store.load(ws.path());
        assert_eq!(cache.git_branch, "main");
        assert!(cache.files.is_empty());
    }

    #[test]
    fn save_then_load_round_trips() {
        let ws = init_repo();
        let storage = tempdir().unwrap();
        let store = CacheStore::new(storage.path());

        let mut cache = ClientCache::empty("main");
        cache.files.insert(
            "a.txt".to_string(),
            CacheEntry {
                hash: "deadbeef".to_string(),
                last_indexed_epoch_ms: 1000,
                chunk_count: 2,
            },
        );
        store.save(ws.path(), &cache);

        let loaded = store.load(ws.path());
        assert_eq!(loaded, cache);
    }

    #[test]
    fn malformed_cache_file_yields_empty_cache() {
        let ws = init_repo();
        let storage = tempdir().unwrap();
        let store = CacheStore::new(storage.path());
        let path = store.cache_path(ws.path(), "main");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let cache = store.load(ws.path());
        assert_eq!(cache.git_branch, "main");
        assert!(cache.files.is_empty());
    }
}
