//! Versioned model registry with an atomically swapped active pointer.
//!
//! Every deployed version lives in an append-only arena of `Arc`s ordered by
//! id. The active model is an index into that arena, and both sit behind one
//! `RwLock`, so a reader sees exactly one complete version. Deploys and
//! rollbacks also take a dedicated mutex; readers never wait on it.

mod artifacts;
mod fs;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::OffsetDateTime;

pub use artifacts::{ArtifactStore, MemoryArtifactStore};
pub use fs::FsArtifactStore;

use super::error::StoreError;
use super::model::{Metrics, ModelVersion, TrainedModel, VersionId};

#[derive(Default)]
struct Registry {
    versions: Vec<Arc<ModelVersion>>,
    active: Option<usize>,
    /// Largest id present on disk, including versions left out of `versions`.
    newest_on_disk: Option<VersionId>,
}

impl Registry {
    fn active(&self) -> Option<&Arc<ModelVersion>> {
        self.active.and_then(|idx| self.versions.get(idx))
    }

    fn newest(&self) -> Option<&VersionId> {
        let loaded = self.versions.last().map(|v| &v.version_id);
        loaded.max(self.newest_on_disk.as_ref())
    }
}

pub struct VersionStore {
    artifacts: Box<dyn ArtifactStore>,
    registry: RwLock<Registry>,
    deploy_lock: Mutex<()>,
}

impl VersionStore {
    /// Load every published version and the current marker.
    ///
    /// The current version must load. Any other version that cannot be read
    /// is logged and left out. Versions that were written but never became
    /// current are discarded.
    pub fn open(artifacts: impl ArtifactStore + 'static) -> Result<Self, StoreError> {
        let mut ids = artifacts.list_versions()?;
        ids.sort();
        let current = artifacts.read_current()?;
        if let Some(current) = &current {
            if !ids.contains(current) {
                return Err(StoreError::Corrupt {
                    version_id: current.to_string(),
                    reason: "current marker names a missing version".into(),
                });
            }
        }

        let mut registry = Registry::default();
        for id in &ids {
            let is_current = current.as_ref() == Some(id);
            if !is_current && !artifacts.is_published(id)? {
                tracing::warn!(version_id = %id, "Discarding version that was never deployed");
                match artifacts.remove_version(id) {
                    Ok(()) => continue,
                    Err(err) => {
                        tracing::warn!(version_id = %id, "Failed to discard version: {err}");
                        registry.newest_on_disk = Some(id.clone());
                        continue;
                    }
                }
            }
            registry.newest_on_disk = Some(id.clone());
            match artifacts.read_version(id) {
                Ok(version) => {
                    if is_current {
                        registry.active = Some(registry.versions.len());
                    }
                    registry.versions.push(Arc::new(version));
                }
                Err(err) if is_current => return Err(err),
                Err(err) => {
                    tracing::warn!(version_id = %id, "Skipping unreadable model version: {err}");
                }
            }
        }
        tracing::info!(
            versions = registry.versions.len(),
            active = registry
                .active()
                .map(|v| v.version_id.to_string())
                .unwrap_or_default(),
            "Opened model store"
        );
        Ok(Self {
            artifacts: Box::new(artifacts),
            registry: RwLock::new(registry),
            deploy_lock: Mutex::new(()),
        })
    }

    /// Open the filesystem store rooted at `root`.
    pub fn open_dir(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open(FsArtifactStore::new(root)?)
    }

    /// Empty store that lives only in this process.
    pub fn in_memory() -> Self {
        Self {
            artifacts: Box::new(MemoryArtifactStore::new()),
            registry: RwLock::new(Registry::default()),
            deploy_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>, StoreError> {
        self.registry.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>, StoreError> {
        self.registry.write().map_err(|_| StoreError::LockPoisoned)
    }

    /// Snapshot of the serving model; `None` until the first deploy.
    pub fn get_active(&self) -> Result<Option<Arc<ModelVersion>>, StoreError> {
        Ok(self.read()?.active().cloned())
    }

    pub fn active_version_id(&self) -> Result<Option<VersionId>, StoreError> {
        Ok(self.read()?.active().map(|v| v.version_id.clone()))
    }

    /// Every deployed version, oldest first.
    pub fn list_history(&self) -> Result<Vec<Arc<ModelVersion>>, StoreError> {
        Ok(self.read()?.versions.clone())
    }

    /// Ids copied into the backup namespace.
    pub fn list_backups(&self) -> Result<Vec<VersionId>, StoreError> {
        self.artifacts.list_backups()
    }

    /// Copy the active version into the backups. No-op without one.
    pub fn backup_active(&self) -> Result<Option<VersionId>, StoreError> {
        let Some(id) = self.active_version_id()? else {
            tracing::debug!("No active model to back up");
            return Ok(None);
        };
        self.artifacts.backup_version(&id)?;
        tracing::info!(version_id = %id, "Backed up active model");
        Ok(Some(id))
    }

    /// Publish the active version before the marker moves away from it.
    fn seal_active(&self) -> Result<(), StoreError> {
        match self.active_version_id()? {
            Some(id) => self.artifacts.mark_published(&id),
            None => Ok(()),
        }
    }

    /// Persist a new version and make it active.
    ///
    /// The new id sorts after every existing id. On error the previous
    /// active version stays in place, on disk and in memory.
    pub fn deploy(&self, model: TrainedModel, metrics: Metrics) -> Result<VersionId, StoreError> {
        let _guard = self.deploy_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.seal_active()?;
        let newest = self.read()?.newest().cloned();
        let version_id = VersionId::next(OffsetDateTime::now_utc(), newest.as_ref());
        let version = ModelVersion {
            version_id: version_id.clone(),
            model,
            metrics,
        };

        self.artifacts.write_version(&version)?;
        self.write()?.newest_on_disk = Some(version_id.clone());
        if let Err(err) = self.artifacts.write_current(&version_id) {
            if let Err(cleanup) = self.artifacts.remove_version(&version_id) {
                tracing::warn!(version_id = %version_id, "Failed to discard unpublished version: {cleanup}");
            }
            return Err(err);
        }
        // The marker already names this version; the next deploy retries the flag.
        if let Err(err) = self.artifacts.mark_published(&version_id) {
            tracing::warn!(version_id = %version_id, "Failed to flag version as published: {err}");
        }

        let mut registry = self.write()?;
        registry.versions.push(Arc::new(version));
        registry.active = Some(registry.versions.len() - 1);
        tracing::info!(version_id = %version_id, "Deployed model version");
        Ok(version_id)
    }

    /// Point serving back at an existing version. History is unchanged.
    pub fn rollback(&self, version_id: &VersionId) -> Result<(), StoreError> {
        let _guard = self.deploy_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let idx = self
            .read()?
            .versions
            .iter()
            .position(|v| v.version_id == *version_id)
            .ok_or_else(|| StoreError::UnknownVersion(version_id.to_string()))?;
        self.seal_active()?;
        self.artifacts.write_current(version_id)?;
        self.write()?.active = Some(idx);
        tracing::info!(version_id = %version_id, "Rolled back active model");
        Ok(())
    }
}
