//! Content store for raw attachment bytes.
//!
//! Files live flat under a root directory, keyed `{id}_{name}`. The store
//! only holds bytes; all other attachment state is database metadata.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Filesystem-backed store for uploaded file content.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open a content store rooted at the given directory, creating it if
    /// missing.
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Path of the backing file for an attachment.
    pub fn path_for(&self, id: Uuid, name: &str) -> PathBuf {
        self.root.join(format!("{id}_{name}"))
    }

    /// Write the bytes for an attachment.
    pub fn write(&self, id: Uuid, name: &str, bytes: &[u8]) -> Result<()> {
        std::fs::write(self.path_for(id, name), bytes)?;
        Ok(())
    }

    /// Read the bytes for an attachment. A missing backing file is reported
    /// as `ContentMissing`, distinct from other IO failures: the metadata
    /// record may legitimately outlive its bytes.
    pub fn read(&self, id: Uuid, name: &str) -> Result<Vec<u8>> {
        let path = self.path_for(id, name);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::ContentMissing(format!("{id}_{name}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Last-modified time of the backing file, falling back to now when the
    /// filesystem does not report one.
    pub fn modified(&self, id: Uuid, name: &str) -> DateTime<Utc> {
        std::fs::metadata(self.path_for(id, name))
            .and_then(|m| m.modified())
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now())
    }

    /// Remove the bytes for an attachment. Idempotent: already-absent bytes
    /// are not an error.
    pub fn remove(&self, id: Uuid, name: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(id, name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::open(dir.path()).expect("open");
        let id = Uuid::new_v4();

        store.write(id, "report.csv", b"a,b\n1,2\n").expect("write");
        let bytes = store.read(id, "report.csv").expect("read");
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[test]
    fn missing_bytes_reported_distinctly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::open(dir.path()).expect("open");

        let err = store.read(Uuid::new_v4(), "ghost.pdf").unwrap_err();
        assert!(matches!(err, Error::ContentMissing(_)));
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ContentStore::open(dir.path()).expect("open");
        let id = Uuid::new_v4();

        store.write(id, "data.txt", b"x").expect("write");
        store.remove(id, "data.txt").expect("first remove");
        store.remove(id, "data.txt").expect("second remove");
    }
}
