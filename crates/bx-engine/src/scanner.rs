use std::collections::HashSet;
use std::sync::Arc;

use bx_cache::CacheStore;
use bx_git::GitProbe;
use bx_index::{file_hash, ClientCache, ServerManifest};
use bx_remote::RemoteClient;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::pipeline::{index_file, now_ms};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files_processed: usize,
    pub chunks_indexed: usize,
    pub errors: Vec<String>,
}

impl ScanResult {
    /// A scan succeeds iff it collected zero per-file errors.
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Flush the cache at least this often during a long scan, independent of
/// the final flush at the end of `scan`.
const CACHE_FLUSH_INTERVAL: usize = 100;

pub struct Scanner;

impl Scanner {
    /// Run one full reconciliation pass against `cache`, calling `progress`
    /// after each file completes with `(files_processed, total, chunks_indexed)`.
    pub async fn scan(
        config: &EngineConfig,
        git: &GitProbe,
        remote: &RemoteClient,
        cache_store: &CacheStore,
        cache: &mut ClientCache,
        manifest: Option<&ServerManifest>,
        mut progress: impl FnMut(usize, usize, usize) + Send,
    ) -> ScanResult {
        let mut errors = Vec::new();

        let current_branch = match git.current_branch(&config.workspace_root) {
            Ok(b) => b,
            Err(e) => {
                errors.push(format!("current_branch: {e}"));
                return ScanResult {
                    errors,
                    ..Default::default()
                };
            }
        };
        let base_branch = git.base_branch(&config.workspace_root);
        let is_base = git.is_base_branch(&current_branch, Some(&config.workspace_root));

        // Step 2: enumerate candidates.
        let mut live_files_for_deletion_check: Option<Vec<String>> = None;
        let candidates: Vec<String> = if is_base {
            match git.tracked_files(&config.workspace_root) {
                Ok(files) => {
                    let filtered: Vec<String> = files
                        .into_iter()
                        .filter(|f| config.is_supported_extension(f))
                        .collect();
                    live_files_for_deletion_check = Some(filtered.clone());
                    filtered
                }
                Err(e) => {
                    errors.push(format!("tracked_files: {e}"));
                    Vec::new()
                }
            }
        } else {
            match git.diff(&current_branch, &base_branch, &config.workspace_root) {
                Ok(diff) => {
                    for deleted in &diff.deleted {
                        cache.add_deleted(deleted);
                    }
                    diff.added
                        .into_iter()
                        .chain(diff.modified)
                        .filter(|f| config.is_supported_extension(f))
                        .collect()
                }
                Err(e) => {
                    errors.push(format!("diff: {e}"));
                    Vec::new()
                }
            }
        };

        // Step 3: three-way reconcile.
        let mut to_enqueue = Vec::new();
        for file in candidates {
            let abs = config.workspace_root.join(&file);
            match tokio::fs::read(&abs).await {
                Ok(bytes) => {
                    let hash = file_hash(&bytes);
                    if !cache.should_index(&file, &hash) {
                        continue;
                    }
                    if let Some(entry) = manifest.and_then(|m| m.entry(&file)) {
                        if entry.file_hash == hash {
                            cache.update_entry(&file, hash, now_ms(), entry.chunk_count);
                            continue;
                        }
                    }
                    to_enqueue.push(file);
                }
                Err(e) => errors.push(format!("{file}: {e}")),
            }
        }

        // Step 4: base-branch deletion detection.
        if is_base {
            if let (Some(m), Some(live)) = (manifest, live_files_for_deletion_check.as_ref()) {
                let live_set: HashSet<&str> = live.iter().map(String::as_str).collect();
                let deleted_paths: Vec<String> = m
                    .files
                    .iter()
                    .filter(|e| !live_set.contains(e.file_path.as_str()))
                    .map(|e| e.file_path.clone())
                    .collect();

                if !deleted_paths.is_empty() {
                    match remote
                        .delete_files(
                            &config.organization_id,
                            &config.project_id,
                            &current_branch,
                            deleted_paths.clone(),
                        )
                        .await
                    {
                        Ok(()) => {
                            for path in &deleted_paths {
                                cache.remove_entry(path);
                            }
                        }
                        Err(e) => errors.push(format!("delete_files: {e}")),
                    }
                }
            }
        }

        // Step 5/6: chunk and upload enqueued files, bounded to
        // `max_concurrent_files` in-flight pipelines.
        let total = to_enqueue.len();
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_files.max(1)));
        let mut handles = Vec::with_capacity(total);

        for file in to_enqueue {
            let remote = remote.clone();
            let config = config.clone();
            let branch = current_branch.clone();
            let semaphore = semaphore.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore closed");
                let result = index_file(&remote, &config, &file, &branch, is_base).await;
                (file, result)
            }));
        }

        let mut files_processed = 0;
        let mut chunks_indexed = 0;
        for handle in handles {
            match handle.await {
                Ok((file, Ok((hash, count)))) => {
                    cache.update_entry(&file, hash, now_ms(), count);
                    files_processed += 1;
                    chunks_indexed += count;
                    progress(files_processed, total, chunks_indexed);
                    if files_processed % CACHE_FLUSH_INTERVAL == 0 {
                        cache_store.save(&config.workspace_root, cache);
                    }
                }
                Ok((file, Err(e))) => {
                    debug!(file = %file, error = %e, "scan: per-file pipeline failed");
                    errors.push(format!("{file}: {e}"));
                }
                Err(join_err) => errors.push(format!("task join error: {join_err}")),
            }
        }

        cache_store.save(&config.workspace_root, cache);

        if !errors.is_empty() {
            warn!(count = errors.len(), "scan completed with per-file errors");
        }

        ScanResult {
            files_processed,
            chunks_indexed,
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bx_index::ChunkerConfig;
    use std::process::Command;
    use tempfile::tempdir;

    fn init_repo(root: &std::path::Path) {
        let run = |args: &[&str]| {
            assert!(Command::new("git")
                .arg("-C")
                .arg(root)
                .args(args)
                .status()
                .unwrap()
                .success());
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "t@example.com"]);
        run(&["config", "user.name", "Test"]);
    }

    fn commit_all(root: &std::path::Path, msg: &str) {
        let run = |args: &[&str]| {
            assert!(Command::new("git")
                .arg("-C")
                .arg(root)
                .args(args)
                .status()
                .unwrap()
                .success());
        };
        run(&["add", "."]);
        run(&["commit", "-q", "-m", msg]);
    }

    #[tokio::test]
    async fn scan_on_base_branch_with_no_manifest_indexes_all_supported_files() {
        let ws = tempdir().unwrap();
        init_repo(ws.path());
        std::fs::write(ws.path().join("a.rs"), "fn a() {}\n".repeat(40)).unwrap();
        std::fs::write(ws.path().join("b.rs"), "fn b() {}\n".repeat(40)).unwrap();
        std::fs::write(ws.path().join("readme.bin"), vec![0u8; 16]).unwrap();
        commit_all(ws.path(), "init");

        let storage = tempdir().unwrap();
        let mut config = EngineConfig::new("org", "proj", "token", ws.path(), storage.path());
        config.chunker = ChunkerConfig {
            max_chars: 1000,
            min_chars: 1,
            overlap_lines: 2,
        };

        let git = GitProbe::new();
        let cache_store = CacheStore::new(storage.path());
        let mut cache = ClientCache::empty("main");
        let resolver = bx_remote::FixedUrlResolver(url::Url::parse("http://127.0.0.1:1").unwrap());
        let remote = RemoteClient::with_resolver("token", &resolver).unwrap();

        // No live server in this unit test: upsert calls will fail transport,
        // so we only assert on reconcile-stage behavior (candidates found,
        // not-yet-cached files enqueued) rather than a successful upload.
        let result = Scanner::scan(&config, &git, &remote, &cache_store, &mut cache, None, |_, _, _| {}).await;
        assert!(!result.success());
        assert!(result
            .errors
            .iter()
            .all(|e| e.contains("a.rs") || e.contains("b.rs")));
    }

    #[test]
    fn scan_result_success_iff_no_errors() {
        let ok = ScanResult::default();
        assert!(ok.success());
        let bad = ScanResult {
            errors: vec!["x".into()],
            ..Default::default()
        };
        assert!(!bad.success());
    }
}
