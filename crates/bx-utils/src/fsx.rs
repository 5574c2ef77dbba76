use std::{
    fs::{self, File},
    io::{self, Write},
    path::Path,
};

/// Write `bytes` to `path` atomically: write a sibling temp file, fsync it,
/// then rename into place. Rename is atomic on the same filesystem, so
/// readers never observe a partially-written file.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    fs::create_dir_all(dir)?;

    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("atomic-write")
    ));

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    fs::rename(&tmp_path, path)
}
