use std::path::{Path, PathBuf};

/// Resolve an executable on PATH, accepting an already-absolute path as-is.
///
/// Synchronous by design: callers (the git probe) invoke this from
/// `spawn_blocking` contexts, not from the async hot path.
pub fn resolve_executable(executable: &str) -> Option<PathBuf> {
    if executable.trim().is_empty() {
        return None;
    }
    let path = Path::new(executable);
    if path.is_absolute() && path.is_file() {
        return Some(path.to_path_buf());
    }
    which::which(executable).ok()
}
