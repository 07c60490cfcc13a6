//! Filesystem layout for model versions.
//!
//! ```text
//! <root>/versions/<id>/{model.json, metrics.json, manifest.json, PUBLISHED}
//! <root>/backups/<id>/...
//! <root>/CURRENT
//! ```
//! Version directories are staged under a hidden sibling and renamed into
//! place, so a listed version is always complete. `PUBLISHED` is created
//! once the version has been named by `CURRENT`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::artifacts::ArtifactStore;
use crate::fs_ops;
use crate::lifecycle::error::StoreError;
use crate::lifecycle::model::{Metrics, ModelVersion, TrainedModel, VersionId};

const VERSIONS_DIR: &str = "versions";
const BACKUPS_DIR: &str = "backups";
const CURRENT_FILE: &str = "CURRENT";
const MODEL_FILE: &str = "model.json";
const METRICS_FILE: &str = "metrics.json";
const MANIFEST_FILE: &str = "manifest.json";
const PUBLISHED_FILE: &str = "PUBLISHED";

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    version_id: VersionId,
    model_blake3: String,
    metrics_blake3: String,
}

/// Stores versions as JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        for dir in [root.join(VERSIONS_DIR), root.join(BACKUPS_DIR)] {
            fs::create_dir_all(&dir).map_err(|err| StoreError::io(&dir, err))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn version_dir(&self, id: &VersionId) -> PathBuf {
        self.root.join(VERSIONS_DIR).join(id.as_str())
    }

    fn backup_dir(&self, id: &VersionId) -> PathBuf {
        self.root.join(BACKUPS_DIR).join(id.as_str())
    }

    fn list_ids(&self, dir: &Path) -> Result<Vec<VersionId>, StoreError> {
        let entries = fs::read_dir(dir).map_err(|err| StoreError::io(dir, err))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| StoreError::io(dir, err))?;
            let is_dir = entry
                .file_type()
                .map_err(|err| StoreError::io(entry.path(), err))?
                .is_dir();
            let name = entry.file_name();
            // Staging leftovers and foreign files are skipped.
            if let Some(id) = name.to_str().and_then(VersionId::parse).filter(|_| is_dir) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn to_json<T: Serialize>(value: &T, what: &'static str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode { what, source })
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    use std::io::Write;
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn read_file(path: &Path) -> Result<Vec<u8>, StoreError> {
    fs::read(path).map_err(|err| StoreError::io(path, err))
}

fn parse_json<T: for<'de> Deserialize<'de>>(path: &Path, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

impl ArtifactStore for FsArtifactStore {
    fn list_versions(&self) -> Result<Vec<VersionId>, StoreError> {
        self.list_ids(&self.root.join(VERSIONS_DIR))
    }

    fn read_version(&self, id: &VersionId) -> Result<ModelVersion, StoreError> {
        let dir = self.version_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::UnknownVersion(id.to_string()));
        }
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: Manifest = parse_json(&manifest_path, &read_file(&manifest_path)?)?;
        let corrupt = |reason: String| StoreError::Corrupt {
            version_id: id.to_string(),
            reason,
        };
        if manifest.version_id != *id {
            return Err(corrupt(format!(
                "manifest names version {}",
                manifest.version_id
            )));
        }

        let model_path = dir.join(MODEL_FILE);
        let model_bytes = read_file(&model_path)?;
        if digest(&model_bytes) != manifest.model_blake3 {
            return Err(corrupt("model.json digest mismatch".into()));
        }
        let metrics_path = dir.join(METRICS_FILE);
        let metrics_bytes = read_file(&metrics_path)?;
        if digest(&metrics_bytes) != manifest.metrics_blake3 {
            return Err(corrupt("metrics.json digest mismatch".into()));
        }

        let model: TrainedModel = parse_json(&model_path, &model_bytes)?;
        model.check_integrity().map_err(corrupt)?;
        let metrics: Metrics = parse_json(&metrics_path, &metrics_bytes)?;
        Ok(ModelVersion {
            version_id: id.clone(),
            model,
            metrics,
        })
    }

    fn write_version(&self, version: &ModelVersion) -> Result<(), StoreError> {
        let dest = self.version_dir(&version.version_id);
        if dest.exists() {
            return Err(StoreError::AlreadyExists(version.version_id.to_string()));
        }
        let model_bytes = to_json(&version.model, "model")?;
        let metrics_bytes = to_json(&version.metrics, "metrics")?;
        let manifest_bytes = to_json(
            &Manifest {
                version_id: version.version_id.clone(),
                model_blake3: digest(&model_bytes),
                metrics_blake3: digest(&metrics_bytes),
            },
            "manifest",
        )?;

        let staging = fs_ops::staging_path(&dest).map_err(|err| StoreError::io(&dest, err))?;
        let result = (|| -> io::Result<()> {
            fs::create_dir_all(&staging)?;
            write_synced(&staging.join(MODEL_FILE), &model_bytes)?;
            write_synced(&staging.join(METRICS_FILE), &metrics_bytes)?;
            write_synced(&staging.join(MANIFEST_FILE), &manifest_bytes)?;
            fs_ops::sync_dir(&staging)?;
            fs::rename(&staging, &dest)?;
            fs_ops::sync_dir(&self.root.join(VERSIONS_DIR))
        })();
        if let Err(err) = result {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreError::io(&dest, err));
        }
        Ok(())
    }

    fn remove_version(&self, id: &VersionId) -> Result<(), StoreError> {
        let dir = self.version_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(dir, err)),
        }
    }

    fn mark_published(&self, id: &VersionId) -> Result<(), StoreError> {
        let dir = self.version_dir(id);
        if !dir.is_dir() {
            return Err(StoreError::UnknownVersion(id.to_string()));
        }
        let flag = dir.join(PUBLISHED_FILE);
        if flag.is_file() {
            return Ok(());
        }
        write_synced(&flag, b"")
            .and_then(|()| fs_ops::sync_dir(&dir))
            .map_err(|err| StoreError::io(flag, err))
    }

    fn is_published(&self, id: &VersionId) -> Result<bool, StoreError> {
        Ok(self.version_dir(id).join(PUBLISHED_FILE).is_file())
    }

    fn backup_version(&self, id: &VersionId) -> Result<(), StoreError> {
        let src = self.version_dir(id);
        if !src.is_dir() {
            return Err(StoreError::UnknownVersion(id.to_string()));
        }
        let dest = self.backup_dir(id);
        if dest.is_dir() {
            return Ok(());
        }
        let staging = fs_ops::staging_path(&dest).map_err(|err| StoreError::io(&dest, err))?;
        let result = fs_ops::copy_dir_all(&src, &staging)
            .and_then(|()| fs::rename(&staging, &dest))
            .and_then(|()| fs_ops::sync_dir(&self.root.join(BACKUPS_DIR)));
        if let Err(err) = result {
            let _ = fs::remove_dir_all(&staging);
            return Err(StoreError::io(dest, err));
        }
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<VersionId>, StoreError> {
        self.list_ids(&self.root.join(BACKUPS_DIR))
    }

    fn read_current(&self) -> Result<Option<VersionId>, StoreError> {
        let path = self.root.join(CURRENT_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(path, err)),
        };
        let trimmed = raw.trim();
        VersionId::parse(trimmed)
            .map(Some)
            .ok_or_else(|| StoreError::Corrupt {
                version_id: trimmed.to_string(),
                reason: format!("{CURRENT_FILE} marker is not a version id"),
            })
    }

    fn write_current(&self, id: &VersionId) -> Result<(), StoreError> {
        if !self.version_dir(id).is_dir() {
            return Err(StoreError::UnknownVersion(id.to_string()));
        }
        let path = self.root.join(CURRENT_FILE);
        fs_ops::atomic_write(&path, format!("{id}\n").as_bytes())
            .map_err(|err| StoreError::io(path, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::test_support::sample_version;
    use tempfile::tempdir;

    #[test]
    fn versions_round_trip_through_disk() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let version = sample_version("20260101T000000.000Z");
        store.write_version(&version).unwrap();
        assert_eq!(store.list_versions().unwrap(), vec![version.version_id.clone()]);
        assert_eq!(store.read_version(&version.version_id).unwrap(), version);
        assert!(matches!(
            store.write_version(&version),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn current_marker_is_replaced() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        assert_eq!(store.read_current().unwrap(), None);
        let a = sample_version("20260101T000000.000Z");
        let b = sample_version("20260102T000000.000Z");
        store.write_version(&a).unwrap();
        store.write_version(&b).unwrap();
        store.write_current(&a.version_id).unwrap();
        store.write_current(&b.version_id).unwrap();
        assert_eq!(store.read_current().unwrap(), Some(b.version_id));
        let unknown = VersionId::parse("20300101T000000.000Z").unwrap();
        assert!(store.write_current(&unknown).is_err());
    }

    #[test]
    fn tampered_model_is_corrupt() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let version = sample_version("20260101T000000.000Z");
        store.write_version(&version).unwrap();
        let model_path = dir
            .path()
            .join(VERSIONS_DIR)
            .join(version.version_id.as_str())
            .join(MODEL_FILE);
        let mut bytes = fs::read(&model_path).unwrap();
        bytes.push(b' ');
        fs::write(&model_path, bytes).unwrap();
        assert!(matches!(
            store.read_version(&version.version_id),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn backups_are_idempotent_copies() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let version = sample_version("20260101T000000.000Z");
        store.write_version(&version).unwrap();
        store.backup_version(&version.version_id).unwrap();
        store.backup_version(&version.version_id).unwrap();
        assert_eq!(store.list_backups().unwrap(), vec![version.version_id.clone()]);
        assert!(
            dir.path()
                .join(BACKUPS_DIR)
                .join(version.version_id.as_str())
                .join(MODEL_FILE)
                .is_file()
        );
    }

    #[test]
    fn published_flag_survives_and_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        let version = sample_version("20260101T000000.000Z");
        store.write_version(&version).unwrap();
        assert!(!store.is_published(&version.version_id).unwrap());
        store.mark_published(&version.version_id).unwrap();
        store.mark_published(&version.version_id).unwrap();

        let reopened = FsArtifactStore::new(dir.path()).unwrap();
        assert!(reopened.is_published(&version.version_id).unwrap());
        assert_eq!(reopened.read_version(&version.version_id).unwrap(), version);
        let unknown = VersionId::parse("20300101T000000.000Z").unwrap();
        assert!(matches!(
            reopened.mark_published(&unknown),
            Err(StoreError::UnknownVersion(_))
        ));
    }

    #[test]
    fn staging_leftovers_are_not_versions() {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path()).unwrap();
        fs::create_dir_all(
            dir.path()
                .join(VERSIONS_DIR)
                .join(".20260101T000000.000Z.staging-abcdef"),
        )
        .unwrap();
        assert!(store.list_versions().unwrap().is_empty());
    }
}
