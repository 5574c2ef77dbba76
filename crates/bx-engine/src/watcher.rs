use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bx_cache::CacheStore;
use bx_git::GitProbe;
use bx_index::ClientCache;
use bx_remote::RemoteClient;
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::pipeline::{delete_prior_chunks, index_file, now_ms};

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error(transparent)]
    Notify(#[from] notify::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Created,
    Modified,
    Deleted,
}

/// Observes filesystem events across the workspace, debounces them into
/// batches, and drives the same per-file pipeline the scanner uses.
///
/// Disposing the returned handle cancels any pending debounce timer and
/// unregisters the underlying `notify` subscription.
pub struct Watcher {
    _debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
    batch_task: tokio::task::JoinHandle<()>,
}

impl Watcher {
    pub fn start(
        config: EngineConfig,
        git: GitProbe,
        remote: RemoteClient,
        cache_store: Arc<CacheStore>,
        cache: Arc<Mutex<ClientCache>>,
    ) -> Result<Self, WatcherError> {
        let canonical_root = dunce::canonicalize(&config.workspace_root)
            .unwrap_or_else(|_| config.workspace_root.clone());

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<(EventKind, PathBuf)>>();
        let debounce_ms = config.debounce_ms;

        let tx_for_debouncer = tx.clone();
        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            None,
            move |result: DebounceEventResult| {
                let Ok(events) = result else {
                    return;
                };
                let mut batch = Vec::new();
                for event in events {
                    let kind = match event.kind {
                        notify::EventKind::Create(_) => EventKind::Created,
                        notify::EventKind::Modify(_) => EventKind::Modified,
                        notify::EventKind::Remove(_) => EventKind::Deleted,
                        _ => continue,
                    };
                    for path in event.paths {
                        batch.push((kind, path));
                    }
                }
                if !batch.is_empty() {
                    let _ = tx_for_debouncer.send(batch);
                }
            },
        )?;
        debouncer.watch(&canonical_root, RecursiveMode::Recursive)?;

        let batch_task = tokio::spawn(async move {
            while let Some(events) = rx.recv().await {
                process_batch(&config, &git, &remote, &cache_store, &cache, &canonical_root, events).await;
            }
        });

        Ok(Self {
            _debouncer: debouncer,
            batch_task,
        })
    }

    /// Cancel the pending debounce timer and unregister the subscription.
    pub fn stop(self) {
        self.batch_task.abort();
    }
}

async fn process_batch(
    config: &EngineConfig,
    git: &GitProbe,
    remote: &RemoteClient,
    cache_store: &CacheStore,
    cache: &Arc<Mutex<ClientCache>>,
    root: &Path,
    events: Vec<(EventKind, PathBuf)>,
) {
    // Collapse repeated events per path: last kind wins. A path that is
    // modified and then deleted within the same debounce window collapses to
    // a single delete rather than an upload-then-delete pair, since by the
    // time this batch runs the file's content is already gone from disk and
    // there is no prior snapshot to upload; see SPEC_FULL.md's note on the
    // watcher flow scenario for why this is intentional.
    let mut by_path: HashMap<PathBuf, EventKind> = HashMap::new();
    for (kind, path) in events {
        by_path.insert(path, kind);
    }

    let mut deletes = Vec::new();
    let mut upserts = Vec::new();
    for (path, kind) in by_path {
        let Some(rel) = to_relative(root, &path) else {
            continue;
        };
        if !config.is_supported_extension(&rel) {
            continue;
        }
        match kind {
            EventKind::Deleted => deletes.push(rel),
            EventKind::Created | EventKind::Modified => upserts.push(rel),
        }
    }

    let current_branch = match git.current_branch(&config.workspace_root) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "watcher: could not determine current branch, dropping batch");
            return;
        }
    };
    let is_base = git.is_base_branch(&current_branch, Some(&config.workspace_root));

    // Deletes are processed before creates/changes. On the base branch a
    // deleted file was almost certainly indexed already, so tell the server
    // to drop it. On a feature branch only added/modified files relative to
    // base are ever uploaded, so a deleted file was likely never indexed
    // server-side; record it as a local tombstone instead of calling out.
    if !deletes.is_empty() {
        if is_base {
            match remote
                .delete_files(
                    &config.organization_id,
                    &config.project_id,
                    &current_branch,
                    deletes.clone(),
                )
                .await
            {
                Ok(()) => {
                    let mut guard = cache.lock().expect("cache mutex poisoned");
                    for path in &deletes {
                        guard.remove_entry(path);
                    }
                }
                Err(e) => warn!(error = %e, "watcher: delete_files failed"),
            }
        } else {
            let mut guard = cache.lock().expect("cache mutex poisoned");
            for path in &deletes {
                guard.remove_entry(path);
                guard.add_deleted(path);
            }
        }
    }

    // Step 3: creates/changes, deleting prior chunks first to avoid stale
    // trailing chunks from a line-shifting edit.
    for file in upserts {
        if let Err(e) = delete_prior_chunks(remote, config, &file, &current_branch).await {
            debug!(file = %file, error = %e, "watcher: delete_prior_chunks failed, continuing");
        }
        match index_file(remote, config, &file, &current_branch, is_base).await {
            Ok((hash, count)) => {
                let mut guard = cache.lock().expect("cache mutex poisoned");
                guard.update_entry(&file, hash, now_ms(), count);
            }
            Err(e) => warn!(file = %file, error = %e, "watcher: index_file failed"),
        }
    }

    let guard = cache.lock().expect("cache mutex poisoned");
    cache_store.save(&config.workspace_root, &guard);
}

fn to_relative(root: &Path, path: &Path) -> Option<String> {
    let canonical = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let rel = canonical.strip_prefix(root).ok()?;
    Some(bx_utils::to_workspace_relative_slash(
        &rel.to_string_lossy(),
        "",
    ))
}
