use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use uuid::Uuid;

use crate::domain::error::{AppError, Result};
use crate::domain::upload::{BlobRef, OwnerId};
use crate::infrastructure::artifact_store::{atomic_write_bytes, DataLayout};

/// Durable storage for raw uploaded files.
///
/// Implementations must be safe to share between concurrent uploads.
pub trait BlobStore: Send + Sync {
    /// Persist `bytes` and return a reference unique to this call.
    fn put(&self, owner: &OwnerId, filename: &str, bytes: &[u8]) -> Result<BlobRef>;

    /// Read a stored blob back. Fails with `NotFound` once deleted.
    fn read(&self, reference: &BlobRef) -> Result<Vec<u8>>;

    /// Delete a stored blob. Deleting an already missing blob is not an error.
    fn delete(&self, reference: &BlobRef) -> Result<()>;

    fn exists(&self, reference: &BlobRef) -> bool;
}

/// Replace anything outside `[A-Za-z0-9._-]` so a user-supplied name is a
/// single safe path segment.
pub fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        _ => cleaned,
    }
}

fn stored_name(filename: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_segment(filename))
}

// ============================================================
// FILESYSTEM STORE
// ============================================================

/// Blob store keeping each upload as a file under `<data_dir>/datasets`.
pub struct FsBlobStore {
    layout: DataLayout,
}

impl FsBlobStore {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let layout = DataLayout::new(data_dir);
        layout.ensure()?;
        Ok(Self { layout })
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    fn resolve(&self, reference: &BlobRef) -> Result<PathBuf> {
        let relative = Path::new(reference.as_str());
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(AppError::ValidationError(format!(
                "Invalid blob reference: {}",
                reference
            )));
        }
        Ok(self.layout.root().join(relative))
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, owner: &OwnerId, filename: &str, bytes: &[u8]) -> Result<BlobRef> {
        let owner_segment = sanitize_segment(owner.as_str());
        let name = stored_name(filename);
        let reference = BlobRef::new(format!("datasets/{}/{}", owner_segment, name));

        let path = self.layout.owner_dir(&owner_segment).join(&name);
        atomic_write_bytes(&path, bytes)?;

        debug!(reference = %reference, size = bytes.len(), "Stored dataset blob");
        Ok(reference)
    }

    fn read(&self, reference: &BlobRef) -> Result<Vec<u8>> {
        let path = self.resolve(reference)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("Dataset file not found: {}", reference))
            }
            _ => AppError::StorageError(format!("Failed to read {}: {e}", path.display())),
        })
    }

    fn delete(&self, reference: &BlobRef) -> Result<()> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(reference = %reference, "Deleted dataset blob");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to delete {}: {e}",
                path.display()
            ))),
        }
    }

    fn exists(&self, reference: &BlobRef) -> bool {
        self.resolve(reference)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}

// ============================================================
// IN-MEMORY STORE
// ============================================================

/// Blob store backed by a map, for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<BlobRef, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<BlobRef, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| AppError::StorageError("Blob store lock poisoned".to_string()))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, owner: &OwnerId, filename: &str, bytes: &[u8]) -> Result<BlobRef> {
        let reference = BlobRef::new(format!(
            "memory://{}/{}",
            sanitize_segment(owner.as_str()),
            stored_name(filename)
        ));
        self.lock()?.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    fn read(&self, reference: &BlobRef) -> Result<Vec<u8>> {
        self.lock()?
            .get(reference)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Dataset file not found: {}", reference)))
    }

    fn delete(&self, reference: &BlobRef) -> Result<()> {
        self.lock()?.remove(reference);
        Ok(())
    }

    fn exists(&self, reference: &BlobRef) -> bool {
        self.blobs
            .lock()
            .map(|blobs| blobs.contains_key(reference))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_segment() {
        assert_eq!(sanitize_segment("data set (1).csv"), "data_set__1_.csv");
        assert_eq!(sanitize_segment("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn test_fs_store_put_read_delete() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        let owner = OwnerId::from("alice");

        let reference = store.put(&owner, "plant.csv", b"a,b\n1,2\n").unwrap();
        assert!(reference.as_str().starts_with("datasets/alice/"));
        assert!(reference.as_str().ends_with("_plant.csv"));
        assert!(store.exists(&reference));
        assert_eq!(store.read(&reference).unwrap(), b"a,b\n1,2\n");

        store.delete(&reference).unwrap();
        assert!(!store.exists(&reference));
        assert_eq!(store.read(&reference).unwrap_err().kind(), ErrorKind::NotFound);
        store.delete(&reference).unwrap();
    }

    #[test]
    fn test_fs_store_same_filename_gets_distinct_refs() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        let owner = OwnerId::from("alice");

        let first = store.put(&owner, "plant.csv", b"1").unwrap();
        let second = store.put(&owner, "plant.csv", b"2").unwrap();
        assert_ne!(first, second);
        assert_eq!(store.read(&first).unwrap(), b"1");
        assert_eq!(store.read(&second).unwrap(), b"2");
    }

    #[test]
    fn test_fs_store_rejects_escaping_refs() {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let escaping = BlobRef::new("../outside.csv");
        assert_eq!(store.read(&escaping).unwrap_err().kind(), ErrorKind::Validation);
        assert!(!store.exists(&BlobRef::new("/etc/passwd")));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryBlobStore::new();
        let reference = store.put(&OwnerId::from("bob"), "x.csv", b"data").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.read(&reference).unwrap(), b"data");
        store.delete(&reference).unwrap();
        assert!(store.is_empty());
        assert!(store.read(&reference).unwrap_err().is_not_found());
    }
}
