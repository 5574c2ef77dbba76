use bx_utils::sha256_hex_str;
use uuid::Uuid;

/// SHA-256 of file bytes, hex-encoded.
pub fn file_hash(content_bytes: &[u8]) -> String {
    bx_utils::sha256_hex(content_bytes)
}

/// Chunk location hash. Content is deliberately not hashed: relocating a
/// chunk's line range implies a new identity.
pub fn chunk_hash(file_path: &str, start_line: usize, end_line: usize) -> String {
    sha256_hex_str(&format!("{file_path}-{start_line}-{end_line}"))
}

/// Branch-scoped chunk id. The branch re-hash is intrinsic: the same
/// file/range on two branches must produce distinct ids.
pub fn chunk_id(hash: &str, organization_id: &str, branch: &str) -> Uuid {
    let namespace = Uuid::new_v5(&Uuid::NAMESPACE_OID, organization_id.as_bytes());
    let name = sha256_hex_str(&format!("{hash}-{branch}"));
    Uuid::new_v5(&namespace, name.as_bytes())
}
