//! Typed HTTP client for the remote codebase index service.

mod base_url;
mod client;
mod error;
mod wire;

pub use base_url::{BaseUrlResolver, FixedUrlResolver, TokenRegionResolver};
pub use client::{RemoteClient, UPSERT_BATCH_SIZE};
pub use error::RemoteError;
pub use wire::{
    DeleteBranchRequest, DeleteFilesRequest, DeleteProjectRequest, ManifestFileEntry,
    ManifestResponse, SearchRequest, SearchResult, UpsertRequest,
};
