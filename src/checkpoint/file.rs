use crate::checkpoint::CheckpointResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Serializes `value` as JSON and atomically replaces `path` with it
///
/// The data is written and synced to a temporary file in the same directory,
/// then renamed over the target.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> CheckpointResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Reads JSON from `path`; `Ok(None)` if the file does not exist
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> CheckpointResult<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// Removes `path`, treating an already-missing file as success
pub(crate) fn remove_if_exists(path: &Path) -> CheckpointResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
