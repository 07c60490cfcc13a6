use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use crate::lifecycle::error::StoreError;
use crate::lifecycle::model::{ModelVersion, VersionId};

/// Durable blob storage behind the version store.
///
/// Implementations must make `write_current` atomic: after it returns the
/// marker names the new id, and a crash mid-call leaves the old one.
pub trait ArtifactStore: Send + Sync {
    /// Ids of every fully written version, in any order.
    fn list_versions(&self) -> Result<Vec<VersionId>, StoreError>;
    fn read_version(&self, id: &VersionId) -> Result<ModelVersion, StoreError>;
    /// Persist a new version; never overwrites an existing id.
    fn write_version(&self, version: &ModelVersion) -> Result<(), StoreError>;
    /// Discard a version that never became current.
    fn remove_version(&self, id: &VersionId) -> Result<(), StoreError>;
    /// Record that `id` has been current at least once. Repeats are no-ops.
    fn mark_published(&self, id: &VersionId) -> Result<(), StoreError>;
    /// Whether `mark_published` completed for `id`.
    fn is_published(&self, id: &VersionId) -> Result<bool, StoreError>;
    /// Copy a version into the backup namespace. Repeats are no-ops.
    fn backup_version(&self, id: &VersionId) -> Result<(), StoreError>;
    fn list_backups(&self) -> Result<Vec<VersionId>, StoreError>;
    fn read_current(&self) -> Result<Option<VersionId>, StoreError>;
    fn write_current(&self, id: &VersionId) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    versions: BTreeMap<VersionId, ModelVersion>,
    backups: BTreeSet<VersionId>,
    published: BTreeSet<VersionId>,
    current: Option<VersionId>,
}

/// Process-local artifact store for embedding and tests.
#[derive(Default)]
pub struct MemoryArtifactStore {
    state: Mutex<MemoryState>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&mut state)
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        self.with_state(|s| Ok(s.versions.keys().cloned().collect()))
    }

    fn read_version(&self, id: &VersionId) -> Result<ModelVersion, StoreError> {
        self.with_state(|s| {
            s.versions
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::UnknownVersion(id.to_string()))
        })
    }

    fn write_version(&self, version: &ModelVersion) -> Result<(), StoreError> {
        self.with_state(|s| {
            if s.versions.contains_key(&version.version_id) {
                return Err(StoreError::AlreadyExists(version.version_id.to_string()));
            }
            s.versions.insert(version.version_id.clone(), version.clone());
            Ok(())
        })
    }

    fn remove_version(&self, id: &VersionId) -> Result<(), StoreError> {
        self.with_state(|s| {
            s.versions.remove(id);
            s.published.remove(id);
            Ok(())
        })
    }

    fn mark_published(&self, id: &VersionId) -> Result<(), StoreError> {
        self.with_state(|s| {
            if !s.versions.contains_key(id) {
                return Err(StoreError::UnknownVersion(id.to_string()));
            }
            s.published.insert(id.clone());
            Ok(())
        })
    }

    fn is_published(&self, id: &VersionId) -> Result<bool, StoreError> {
        self.with_state(|s| Ok(s.published.contains(id)))
    }

    fn backup_version(&self, id: &VersionId) -> Result<(), StoreError> {
        self.with_state(|s| {
            if !s.versions.contains_key(id) {
                return Err(StoreError::UnknownVersion(id.to_string()));
            }
            s.backups.insert(id.clone());
            Ok(())
        })
    }

    fn list_backups(&self) -> Result<Vec<VersionId>, StoreError> {
        self.with_state(|s| Ok(s.backups.iter().cloned().collect()))
    }

    fn read_current(&self) -> Result<Option<VersionId>, StoreError> {
        self.with_state(|s| Ok(s.current.clone()))
    }

    fn write_current(&self, id: &VersionId) -> Result<(), StoreError> {
        self.with_state(|s| {
            if !s.versions.contains_key(id) {
                return Err(StoreError::UnknownVersion(id.to_string()));
            }
            s.current = Some(id.clone());
            Ok(())
        })
    }
}
