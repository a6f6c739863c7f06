use crate::domain::error::{AppError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

fn io_err(msg: impl Into<String>) -> AppError {
    AppError::StorageError(msg.into())
}

/// On-disk layout of the analytics data directory.
///
/// ```text
/// <data_dir>/
///   datasets/<owner>/<uuid>_<filename>.csv
///   history.db
/// ```
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
    datasets: PathBuf,
    history_db: PathBuf,
}

impl DataLayout {
    pub fn new(data_dir: &Path) -> Self {
        let root = data_dir.to_path_buf();
        let datasets = root.join("datasets");
        let history_db = root.join("history.db");
        Self {
            root,
            datasets,
            history_db,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        ensure_dir(&self.datasets)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn history_db_path(&self) -> &Path {
        &self.history_db
    }

    pub fn owner_dir(&self, owner_segment: &str) -> PathBuf {
        self.datasets.join(owner_segment)
    }
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .map_err(|e| io_err(format!("Failed to create dir {}: {e}", path.display())))?;
    Ok(())
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
///
/// Readers never observe a partially written file.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let tmp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    {
        let mut file = fs::File::create(&tmp_path).map_err(|e| {
            io_err(format!(
                "Failed to create temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.write_all(bytes).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(format!(
                "Failed to write temp file {}: {e}",
                tmp_path.display()
            ))
        })?;
        file.sync_all().ok();
    }

    // On Windows, rename cannot replace; move the old file away first.
    let backup = if path.exists() {
        let backup = path.with_extension(format!("bak-{}", Uuid::new_v4()));
        fs::rename(path, &backup).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            io_err(format!(
                "Failed to move existing file {} to {}: {e}",
                path.display(),
                backup.display()
            ))
        })?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = fs::rename(&tmp_path, path) {
        if let Some(backup) = &backup {
            let _ = fs::rename(backup, path);
        }
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(format!(
            "Failed to rename temp file {} to {}: {e}",
            tmp_path.display(),
            path.display()
        )));
    }

    if let Some(backup) = backup {
        let _ = fs::remove_file(backup);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let dir = TempDir::new().unwrap();
        let layout = DataLayout::new(dir.path());
        layout.ensure().unwrap();

        assert!(dir.path().join("datasets").is_dir());
        assert_eq!(layout.history_db_path(), dir.path().join("history.db"));
        assert_eq!(
            layout.owner_dir("alice"),
            dir.path().join("datasets").join("alice")
        );
    }

    #[test]
    fn test_atomic_write_replaces_content_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("plant.csv");

        atomic_write_bytes(&path, b"first").unwrap();
        atomic_write_bytes(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(entries, 1);
    }
}
