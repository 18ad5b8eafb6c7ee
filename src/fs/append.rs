//! Appending to files the substrate reads after a step finishes.
//!
//! Step output and summary files are shared by every step of a node, so
//! they are appended to, never replaced.

use crate::error::{FleetError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Append `content` to `path`, creating the file if needed.
pub fn append_text<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            FleetError::UserError(format!("failed to open '{}': {}", path.display(), e))
        })?;
    file.write_all(content.as_bytes()).map_err(|e| {
        FleetError::UserError(format!("failed to append to '{}': {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_after_existing_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("output");
        std::fs::write(&path, "a=1\n").unwrap();

        append_text(&path, "b=2\n").unwrap();
        append_text(&path, "c=3\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a=1\nb=2\nc=3\n");
    }

    #[test]
    fn missing_parent_is_user_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = append_text(temp_dir.path().join("no").join("file"), "x").unwrap_err();
        assert!(matches!(err, FleetError::UserError(_)));
    }
}
