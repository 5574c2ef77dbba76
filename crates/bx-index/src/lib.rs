//! Chunking, hashing/identity, and the shared data model for branchdex.

mod chunker;
mod hasher;
mod model;

pub use chunker::{chunk, ChunkerConfig};
pub use hasher::{chunk_hash, chunk_id, file_hash};
pub use model::{
    CacheEntry, Chunk, ClientCache, IndexerState, ServerManifest, ServerManifestEntry, Status,
};

pub use bx_git::GitDiff;
