use std::time::{SystemTime, UNIX_EPOCH};

use bx_index::{chunk, file_hash};
use bx_remote::{RemoteClient, RemoteError, UPSERT_BATCH_SIZE};

use crate::config::EngineConfig;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub fn map_remote_err(e: RemoteError) -> String {
    e.to_string()
}

/// Read, hash, chunk, and upload one file's chunks in batches of at most
/// [`UPSERT_BATCH_SIZE`]. Returns `(file_hash, chunk_count)` on success.
///
/// Does not touch the client cache; callers are responsible for applying
/// the result, since the cache is mutated only from the orchestrator's
/// scan/watch tasks, never from within a concurrent pipeline.
pub async fn index_file(
    remote: &RemoteClient,
    config: &EngineConfig,
    file_path: &str,
    branch: &str,
    is_base: bool,
) -> Result<(String, usize), String> {
    let abs_path = config.workspace_root.join(file_path);
    let bytes = tokio::fs::read(&abs_path)
        .await
        .map_err(|e| format!("read {file_path}: {e}"))?;
    let hash = file_hash(&bytes);
    let content = String::from_utf8_lossy(&bytes).into_owned();
    let chunks = chunk(
        file_path,
        &content,
        &config.organization_id,
        &config.project_id,
        branch,
        is_base,
        config.chunker,
    );

    for batch in chunks.chunks(UPSERT_BATCH_SIZE) {
        remote
            .upsert(batch.to_vec())
            .await
            .map_err(map_remote_err)?;
    }

    Ok((hash, chunks.len()))
}

/// Delete a file's existing chunks on the server before re-uploading, so a
/// line-shifting edit does not leave stale trailing chunks behind.
pub async fn delete_prior_chunks(
    remote: &RemoteClient,
    config: &EngineConfig,
    file_path: &str,
    branch: &str,
) -> Result<(), String> {
    remote
        .delete_files(
            &config.organization_id,
            &config.project_id,
            branch,
            vec![file_path.to_string()],
        )
        .await
        .map_err(map_remote_err)
}
