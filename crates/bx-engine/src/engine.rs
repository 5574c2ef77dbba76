use std::sync::{Arc, Mutex};

use bx_cache::CacheStore;
use bx_git::GitProbe;
use bx_index::{IndexerState, Status};
use bx_remote::{RemoteClient, SearchResult};
use tracing::{error, info};

use crate::config::EngineConfig;
use crate::scanner::Scanner;
use crate::watcher::Watcher;

/// Live, running instance returned by [`Engine::start`]. Disposal stops the
/// watcher and transitions the engine back to `idle` exactly once.
pub struct Handle {
    watcher: Option<Watcher>,
    state: Arc<Mutex<IndexerState>>,
}

impl Handle {
    pub fn state(&self) -> IndexerState {
        self.state.lock().expect("state mutex poisoned").clone()
    }

    /// Idempotent: calling `dispose` more than once is a no-op after the
    /// first call.
    pub fn dispose(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
        let mut guard = self.state.lock().expect("state mutex poisoned");
        if guard.status != Some(Status::Idle) {
            *guard = IndexerState::idle("disposed");
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Public engine API: `start`, `search`, `state`, `clear`, `delete_branch`,
/// `delete_project`.
pub struct Engine {
    config: EngineConfig,
    git: GitProbe,
    remote: RemoteClient,
    cache_store: Arc<CacheStore>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, bx_remote::RemoteError> {
        let remote = RemoteClient::new(&config.bearer_token)?;
        Self::with_remote(config, remote)
    }

    /// Construct with an explicit base-url resolver, bypassing the default
    /// token-derived region lookup. Primarily for tests and hosts that
    /// already know their endpoint.
    pub fn with_resolver(
        config: EngineConfig,
        resolver: &dyn bx_remote::BaseUrlResolver,
    ) -> Result<Self, bx_remote::RemoteError> {
        let remote = RemoteClient::with_resolver(&config.bearer_token, resolver)?;
        Self::with_remote(config, remote)
    }

    fn with_remote(config: EngineConfig, remote: RemoteClient) -> Result<Self, bx_remote::RemoteError> {
        let cache_store = Arc::new(CacheStore::new(config.storage_dir.clone()));
        Ok(Self {
            config,
            git: GitProbe::new(),
            remote,
            cache_store,
        })
    }

    /// Validate the repo, fetch the manifest, run one scan, and install the
    /// watcher on success.
    pub async fn start(
        &self,
        on_state: impl Fn(IndexerState) + Send + Sync + 'static,
    ) -> Handle {
        let state = Arc::new(Mutex::new(IndexerState::idle("starting")));
        let on_state: Arc<dyn Fn(IndexerState) + Send + Sync> = Arc::new(on_state);
        let emit = {
            let state = state.clone();
            let on_state = on_state.clone();
            move |s: IndexerState| {
                *state.lock().expect("state mutex poisoned") = s.clone();
                on_state(s);
            }
        };

        if !self.git.is_repo(&self.config.workspace_root) {
            emit(IndexerState::error("workspace is not a git repository"));
            return Handle {
                watcher: None,
                state,
            };
        }

        let branch = match self.git.current_branch(&self.config.workspace_root) {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "start: could not determine current branch");
                emit(IndexerState::error(format!("git error: {e}")));
                return Handle {
                    watcher: None,
                    state,
                };
            }
        };

        let manifest = match self
            .remote
            .manifest(&self.config.organization_id, &self.config.project_id, &branch)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                info!(error = %e, "start: manifest fetch failed, proceeding without it");
                None
            }
        };

        emit(IndexerState {
            status: Some(Status::Scanning),
            message: "Scanning: 0/0 files (0 chunks)".to_string(),
            git_branch: Some(branch.clone()),
            ..Default::default()
        });

        let mut cache = self.cache_store.load(&self.config.workspace_root);
        let config = self.config.clone();
        let progress_branch = branch.clone();
        let progress_emit = on_state.clone();
        let progress_state = state.clone();
        let result = Scanner::scan(
            &self.config,
            &self.git,
            &self.remote,
            &self.cache_store,
            &mut cache,
            manifest.as_ref(),
            move |processed, total, chunks| {
                let s = IndexerState {
                    status: Some(Status::Scanning),
                    message: format!("Scanning: {processed}/{total} files ({chunks} chunks)"),
                    git_branch: Some(progress_branch.clone()),
                    total_files: Some(total),
                    total_chunks: Some(chunks),
                    ..Default::default()
                };
                *progress_state.lock().expect("state mutex poisoned") = s.clone();
                progress_emit(s);
            },
        )
        .await;

        if !result.success() {
            let summary = summarize_errors(&result.errors);
            emit(IndexerState::error(summary));
            return Handle {
                watcher: None,
                state,
            };
        }

        if result.files_processed == 0 && result.chunks_indexed == 0 {
            emit(IndexerState {
                status: Some(Status::Idle),
                message: "no files indexed".to_string(),
                git_branch: Some(branch),
                total_files: Some(0),
                total_chunks: Some(0),
                ..Default::default()
            });
            return Handle {
                watcher: None,
                state,
            };
        }

        let watcher = if config.watcher_enabled {
            let cache_arc = Arc::new(Mutex::new(cache));
            match Watcher::start(
                config.clone(),
                self.git.clone(),
                self.remote.clone(),
                self.cache_store.clone(),
                cache_arc,
            ) {
                Ok(w) => Some(w),
                Err(e) => {
                    error!(error = %e, "start: watcher installation failed");
                    None
                }
            }
        } else {
            None
        };

        emit(IndexerState {
            status: Some(Status::Watching),
            message: "watching for changes".to_string(),
            git_branch: Some(branch),
            total_files: Some(result.files_processed),
            total_chunks: Some(result.chunks_indexed),
            last_sync_epoch_ms: Some(crate::pipeline::now_ms()),
            ..Default::default()
        });

        Handle { watcher, state }
    }

    /// Excludes locally-deleted files on feature branches.
    pub async fn search(
        &self,
        query: &str,
        path: Option<String>,
    ) -> Result<Vec<SearchResult>, bx_remote::RemoteError> {
        let branch = self
            .git
            .current_branch(&self.config.workspace_root)
            .unwrap_or_else(|_| "HEAD".to_string());
        let base_branch = self.git.base_branch(&self.config.workspace_root);
        let is_base = self
            .git
            .is_base_branch(&branch, Some(&self.config.workspace_root));

        let exclude_files = if is_base {
            Vec::new()
        } else {
            self.git
                .diff(&branch, &base_branch, &self.config.workspace_root)
                .map(|d| d.deleted)
                .unwrap_or_default()
        };

        self.remote
            .search(
                query,
                &self.config.organization_id,
                &self.config.project_id,
                &branch,
                &base_branch,
                exclude_files,
                path,
            )
            .await
    }

    /// Derives status from the on-disk cache and current branch, without
    /// requiring an active `Handle`.
    pub fn state(&self) -> IndexerState {
        let branch = match self.git.current_branch(&self.config.workspace_root) {
            Ok(b) => b,
            Err(e) => return IndexerState::error(format!("git error: {e}")),
        };
        let cache = self.cache_store.load(&self.config.workspace_root);
        if cache.git_branch != branch {
            return IndexerState {
                status: Some(Status::Idle),
                message: "re-scan needed".to_string(),
                git_branch: Some(branch),
                ..Default::default()
            };
        }
        IndexerState {
            status: Some(Status::Idle),
            message: "loaded from cache".to_string(),
            git_branch: Some(branch),
            total_files: Some(cache.files.len()),
            total_chunks: Some(cache.files.values().map(|e| e.chunk_count).sum()),
            ..Default::default()
        }
    }

    pub async fn clear(&self) -> Result<(), bx_remote::RemoteError> {
        let branch = self
            .git
            .current_branch(&self.config.workspace_root)
            .unwrap_or_else(|_| "HEAD".to_string());
        self.remote
            .delete_branch(&self.config.organization_id, &self.config.project_id, &branch)
            .await?;
        self.cache_store
            .save(&self.config.workspace_root, &bx_index::ClientCache::empty(&branch));
        Ok(())
    }

    pub async fn delete_branch(&self) -> Result<(), bx_remote::RemoteError> {
        self.clear().await
    }

    pub async fn delete_project(&self) -> Result<(), bx_remote::RemoteError> {
        self.remote
            .delete_project(&self.config.organization_id, &self.config.project_id)
            .await
    }
}

fn summarize_errors(errors: &[String]) -> String {
    const MAX_SHOWN: usize = 5;
    if errors.len() <= MAX_SHOWN {
        errors.join("; ")
    } else {
        format!(
            "{}; (and {} more)",
            errors[..MAX_SHOWN].join("; "),
            errors.len() - MAX_SHOWN
        )
    }
}
