use std::path::PathBuf;

use bx_index::ChunkerConfig;

/// Host-supplied configuration bundle, analogous to a per-extension
/// settings object: identifies the organization/project/workspace and
/// tunes the chunker, batching, and concurrency knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub organization_id: String,
    pub project_id: String,
    pub bearer_token: String,
    pub workspace_root: PathBuf,
    /// Global-storage directory for this host's cache files.
    pub storage_dir: PathBuf,
    /// Allow-listed extensions (no leading dot), e.g. `["rs", "ts", "py"]`.
    pub supported_extensions: Vec<String>,
    pub chunker: ChunkerConfig,
    /// The watcher is installed by default after a successful scan. Hosts
    /// that want source-parity with a watcher-disabled deployment can flip
    /// this off.
    pub watcher_enabled: bool,
    pub debounce_ms: u64,
    pub max_concurrent_files: usize,
}

impl EngineConfig {
    pub fn new(
        organization_id: impl Into<String>,
        project_id: impl Into<String>,
        bearer_token: impl Into<String>,
        workspace_root: impl Into<PathBuf>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            project_id: project_id.into(),
            bearer_token: bearer_token.into(),
            workspace_root: workspace_root.into(),
            storage_dir: storage_dir.into(),
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            chunker: ChunkerConfig::default(),
            watcher_enabled: true,
            debounce_ms: 500,
            max_concurrent_files: 10,
        }
    }

    pub fn is_supported_extension(&self, file_path: &str) -> bool {
        match file_path.rsplit_once('.') {
            Some((_, ext)) => self
                .supported_extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext)),
            None => false,
        }
    }
}

/// A representative allow-list of common source extensions; hosts are
/// expected to override this with their own editor-syntax-targeting list.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "py", "go", "java", "kt", "c", "h", "cpp", "hpp", "cc", "cs",
    "rb", "php", "swift", "scala", "md", "json", "yaml", "yml", "toml",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::new("org", "proj", "token", "/tmp/ws", "/tmp/storage")
    }

    #[test]
    fn supported_extension_matches_case_insensitively() {
        let c = cfg();
        assert!(c.is_supported_extension("src/main.RS"));
        assert!(c.is_supported_extension("src/main.rs"));
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let c = cfg();
        assert!(!c.is_supported_extension("binary.exe"));
        assert!(!c.is_supported_extension("no_extension"));
    }
}
