use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A contiguous line range from one file plus identifying metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: Uuid,
    pub organization_id: String,
    pub project_id: String,
    pub file_path: String,
    pub code_chunk: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_hash: String,
    pub git_branch: String,
    pub is_base_branch: bool,
}

/// Cached fact about one file within a `(workspace, branch)` cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub last_indexed_epoch_ms: u64,
    pub chunk_count: usize,
}

/// One live instance per `(workspace, branch)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCache {
    pub git_branch: String,
    pub deleted_files: Vec<String>,
    pub files: BTreeMap<String, CacheEntry>,
}

impl ClientCache {
    pub fn empty(branch: &str) -> Self {
        Self {
            git_branch: branch.to_string(),
            deleted_files: Vec::new(),
            files: BTreeMap::new(),
        }
    }

    /// True iff `file_path` is absent from the cache or its stored hash
    /// differs from `current_hash`.
    pub fn should_index(&self, file_path: &str, current_hash: &str) -> bool {
        match self.files.get(file_path) {
            Some(entry) => entry.hash != current_hash,
            None => true,
        }
    }

    pub fn update_entry(&mut self, file_path: &str, hash: String, now_ms: u64, chunk_count: usize) {
        self.files.insert(
            file_path.to_string(),
            CacheEntry {
                hash,
                last_indexed_epoch_ms: now_ms,
                chunk_count,
            },
        );
    }

    pub fn remove_entry(&mut self, file_path: &str) {
        self.files.remove(file_path);
    }

    pub fn add_deleted(&mut self, file_path: &str) {
        if !self.deleted_files.iter().any(|p| p == file_path) {
            self.deleted_files.push(file_path.to_string());
        }
    }

    pub fn remove_deleted(&mut self, file_path: &str) {
        self.deleted_files.retain(|p| p != file_path);
    }

    /// Snapshot of files currently believed absent from the live workspace,
    /// as an unordered set for membership checks.
    pub fn deleted_set(&self) -> BTreeSet<&str> {
        self.deleted_files.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerManifestEntry {
    pub file_path: String,
    pub file_hash: String,
    pub chunk_count: usize,
    pub last_indexed: Option<String>,
}

/// Read-only, advisory view of server-side indexing state for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerManifest {
    pub total_files: usize,
    pub total_chunks: usize,
    pub files: Vec<ServerManifestEntry>,
}

impl ServerManifest {
    pub fn entry(&self, file_path: &str) -> Option<&ServerManifestEntry> {
        self.files.iter().find(|e| e.file_path == file_path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Idle,
    Scanning,
    Watching,
    Error,
}

/// Discrete engine status with attached context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct IndexerState {
    pub status: Option<Status>,
    pub message: String,
    pub git_branch: Option<String>,
    pub total_files: Option<usize>,
    pub total_chunks: Option<usize>,
    pub last_sync_epoch_ms: Option<u64>,
    pub error: Option<String>,
}

impl IndexerState {
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Idle),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Some(Status::Error),
            message: message.into(),
            ..Default::default()
        }
    }
}

