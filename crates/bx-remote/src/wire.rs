use bx_index::Chunk;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct UpsertRequest {
    pub chunks: Vec<Chunk>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub organization_id: String,
    pub project_id: String,
    pub prefer_branch: String,
    pub fallback_branch: String,
    pub exclude_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub score: f64,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub from_preferred_branch: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFilesRequest {
    pub organization_id: String,
    pub project_id: String,
    pub git_branch: String,
    pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBranchRequest {
    pub organization_id: String,
    pub project_id: String,
    pub git_branch: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectRequest {
    pub organization_id: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFileEntry {
    pub file_path: String,
    pub file_hash: String,
    pub chunk_count: usize,
    pub last_indexed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    pub files: Vec<ManifestFileEntry>,
    pub total_files: usize,
    pub total_chunks: usize,
    pub last_updated: Option<String>,
}

impl From<ManifestResponse> for bx_index::ServerManifest {
    fn from(value: ManifestResponse) -> Self {
        bx_index::ServerManifest {
            total_files: value.total_files,
            total_chunks: value.total_chunks,
            files: value
                .files
                .into_iter()
                .map(|f| bx_index::ServerManifestEntry {
                    file_path: f.file_path,
                    file_hash: f.file_hash,
                    chunk_count: f.chunk_count,
                    last_indexed: f.last_indexed,
                })
                .collect(),
        }
    }
}
