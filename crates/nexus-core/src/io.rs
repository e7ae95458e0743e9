use crate::error::Result;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Upper bound on how much of a source file is read for metadata extraction.
pub const MAX_READ_BYTES: u64 = 1 << 20;

/// Atomically write `data` to `path` using a tempfile in the same directory.
/// A crash mid-write leaves the previous file in place instead of a truncated one.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Serialize `value` as 2-space indented JSON and write it atomically.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    atomic_write(path, json.as_bytes())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Read up to [`MAX_READ_BYTES`] of a file, replacing invalid UTF-8.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut data = Vec::new();
    file.take(MAX_READ_BYTES).read_to_end(&mut data)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}
