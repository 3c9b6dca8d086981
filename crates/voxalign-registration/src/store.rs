//! Durable transform store: one JSON record per subject.
//!
//! Existence of a record is the sole "done" signal for batch resumability.
//! Writes go through a temporary file in the store directory and are moved
//! into place atomically, so no partially-written record is ever observable
//! and concurrent workers racing on the same subject serialize on the
//! filesystem's create-if-absent primitive.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use voxalign_core::AnyTransform;

use crate::error::{RegistrationError, Result};

/// Directory-backed transform store keyed by subject identifier.
#[derive(Debug, Clone)]
pub struct TransformStore {
    root: PathBuf,
}

impl TransformStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when a transform record exists for the subject.
    pub fn exists(&self, subject_id: &str) -> bool {
        match self.record_path(subject_id) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }

    /// Persist a transform for the subject.
    ///
    /// With `overwrite = false` an existing record fails with
    /// [`RegistrationError::AlreadyExists`] — atomically, so two workers
    /// racing on the same subject produce exactly one record. With
    /// `overwrite = true` the record is replaced atomically.
    pub fn save(&self, subject_id: &str, transform: &AnyTransform, overwrite: bool) -> Result<()> {
        let path = self.record_path(subject_id)?;
        let json = serde_json::to_vec_pretty(transform)?;

        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&json)?;
        tmp.flush()?;

        if overwrite {
            tmp.persist(&path).map_err(|e| e.error)?;
        } else {
            tmp.persist_noclobber(&path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    RegistrationError::AlreadyExists {
                        subject: subject_id.to_owned(),
                    }
                } else {
                    RegistrationError::Io(e.error)
                }
            })?;
        }
        Ok(())
    }

    /// Load the persisted transform for a subject.
    ///
    /// Fails with [`RegistrationError::NotFound`] when no record exists.
    pub fn load(&self, subject_id: &str) -> Result<AnyTransform> {
        let path = self.record_path(subject_id)?;
        let json = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RegistrationError::NotFound {
                    subject: subject_id.to_owned(),
                }
            } else {
                RegistrationError::Io(e)
            }
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Record path for a subject; rejects identifiers that would escape the
    /// store directory.
    fn record_path(&self, subject_id: &str) -> Result<PathBuf> {
        if subject_id.is_empty()
            || subject_id == "."
            || subject_id == ".."
            || subject_id.contains(['/', '\\'])
        {
            return Err(RegistrationError::invalid_configuration(format!(
                "invalid subject identifier '{subject_id}'"
            )));
        }
        Ok(self.root.join(format!("{subject_id}.json")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use voxalign_core::RigidTransform;

    fn store() -> (TempDir, TransformStore) {
        let dir = TempDir::new().unwrap();
        let store = TransformStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_save_load_roundtrip() {
        let (_dir, store) = store();
        let transform = AnyTransform::Rigid(RigidTransform::new(
            [0.1, -0.2, 0.3],
            [1.5, 2.5, -3.5],
            [10.0, 10.0, 10.0],
        ));

        store.save("subject-7", &transform, false).unwrap();
        assert!(store.exists("subject-7"));
        assert_eq!(store.load("subject-7").unwrap(), transform);
    }

    #[test]
    fn test_double_save_fails_then_overwrite_succeeds() {
        let (_dir, store) = store();
        let first = AnyTransform::Identity;
        let second = AnyTransform::Rigid(RigidTransform::translation_only([1.0, 0.0, 0.0]));

        store.save("s", &first, false).unwrap();
        let err = store.save("s", &second, false);
        assert!(matches!(err, Err(RegistrationError::AlreadyExists { .. })));
        assert_eq!(store.load("s").unwrap(), first);

        store.save("s", &second, true).unwrap();
        assert_eq!(store.load("s").unwrap(), second);
    }

    #[test]
    fn test_load_missing_subject() {
        let (_dir, store) = store();
        assert!(!store.exists("ghost"));
        assert!(matches!(
            store.load("ghost"),
            Err(RegistrationError::NotFound { .. })
        ));
    }

    #[test]
    fn test_rejects_path_traversal_identifiers() {
        let (_dir, store) = store();
        for bad in ["", ".", "..", "a/b", "a\\b"] {
            assert!(
                store.save(bad, &AnyTransform::Identity, false).is_err(),
                "identifier {bad:?} should be rejected"
            );
            assert!(!store.exists(bad));
        }
    }

    #[test]
    fn test_no_stray_files_after_failed_noclobber() {
        let (dir, store) = store();
        store.save("s", &AnyTransform::Identity, false).unwrap();
        let _ = store.save("s", &AnyTransform::Identity, false);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }
}
