use std::path::Path;

/// Convert an absolute or relative path into a workspace-relative, forward-slash path.
///
/// Always normalizes separators, since chunk/file identity depends on a
/// stable string form across platforms.
pub fn to_workspace_relative_slash(path: &str, workspace_root: &str) -> String {
    let path_obj = Path::new(path);
    let root_obj = Path::new(workspace_root);

    let relative = if path_obj.is_relative() {
        path_obj.to_path_buf()
    } else {
        match path_obj.strip_prefix(root_obj) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => match (path_obj.canonicalize(), root_obj.canonicalize()) {
                (Ok(p), Ok(r)) => p.strip_prefix(&r).unwrap_or(&p).to_path_buf(),
                _ => path_obj.to_path_buf(),
            },
        }
    };

    relative.to_string_lossy().replace('\\', "/")
}
