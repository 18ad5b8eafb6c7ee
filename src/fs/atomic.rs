//! Atomic file writes.
//!
//! Content goes to `.{filename}.tmp` in the target's directory, is synced,
//! then renamed over the target. Rename replaces an existing target on every
//! supported platform; source and target must share a filesystem, which the
//! sibling temp file guarantees.

use crate::error::{FleetError, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to `path`, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            FleetError::UserError(format!(
                "failed to create directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        FleetError::UserError(format!(
            "failed to atomically replace '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Write `content` unless the file already holds exactly that.
///
/// Returns whether the file changed.
pub fn write_if_changed<P: AsRef<Path>>(path: P, content: &str) -> Result<bool> {
    let path = path.as_ref();
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    atomic_write(path, content.as_bytes())?;
    Ok(true)
}

/// Atomically write `value` as pretty-printed JSON with a trailing newline.
pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    let mut json = serde_json::to_string_pretty(value).map_err(|e| {
        FleetError::UserError(format!(
            "failed to serialize '{}' to JSON: {}",
            path.display(),
            e
        ))
    })?;
    json.push('\n');
    atomic_write(path, json.as_bytes())
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            FleetError::UserError(format!("invalid file path '{}'", target.display()))
        })?;
    let parent = target.parent().unwrap_or(Path::new("."));
    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        FleetError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            FleetError::UserError(format!(
                "failed to write temporary file '{}': {}",
                path.display(),
                e
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn writes_new_file_and_parents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("fleet.lock.yml");

        atomic_write(&path, b"name: Agent Fleet\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "name: Agent Fleet\n");
        assert!(!temp_dir.path().join("nested").join(".fleet.lock.yml.tmp").exists());
    }

    #[test]
    fn replaces_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("record.json");
        fs::write(&path, "old").unwrap();

        atomic_write(&path, b"new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn write_if_changed_reports_drift() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.yml");

        assert!(write_if_changed(&path, "a: 1\n").unwrap());
        assert!(!write_if_changed(&path, "a: 1\n").unwrap());
        assert!(write_if_changed(&path, "a: 2\n").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a: 2\n");
    }

    #[test]
    fn write_json_is_pretty_with_newline() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("manifest.json");

        write_json(&path, &json!({"agent": "triage"})).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "{\n  \"agent\": \"triage\"\n}\n"
        );
    }

    #[test]
    fn temp_path_is_hidden_sibling() {
        let temp = temp_path_for(Path::new("/repo/.github/workflows/fleet.lock.yml")).unwrap();
        assert_eq!(
            temp,
            Path::new("/repo/.github/workflows/.fleet.lock.yml.tmp")
        );
    }
}
