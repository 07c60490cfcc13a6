mod support;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use receipt_classifier::corpus::StaticCorpus;
use receipt_classifier::lifecycle::{
    ArtifactStore, FsArtifactStore, LifecycleController, ModelVersion, RunStatus, StoreError,
    TrainedModel, VersionId, VersionStore,
};
use receipt_classifier::serving;
use support::fixtures::{Faults, FlakyArtifactStore, grocery_corpus, keyword_model, metrics};
use tempfile::tempdir;

fn flaky_controller(dir: &std::path::Path) -> (LifecycleController, Arc<Faults>) {
    let faults = Arc::new(Faults::default());
    let artifacts = FlakyArtifactStore::new(FsArtifactStore::new(dir).unwrap(), faults.clone());
    let store = Arc::new(VersionStore::open(artifacts).unwrap());
    let controller =
        LifecycleController::new(store, Box::new(StaticCorpus::new(grocery_corpus(50))));
    (controller, faults)
}

#[test]
fn failed_marker_swap_keeps_previous_model() {
    let dir = tempdir().unwrap();
    let (controller, faults) = flaky_controller(dir.path());
    let store = controller.store().clone();
    assert_eq!(controller.run(true).status, RunStatus::Deployed);
    let before = store.get_active().unwrap().unwrap();

    faults.write_current.store(true, Ordering::SeqCst);
    let outcome = controller.run(true);
    assert_eq!(outcome.status, RunStatus::Aborted);
    assert!(outcome.errors[0].contains("injected marker failure"));
    assert_eq!(outcome.version_id.as_ref(), Some(&before.version_id));

    let after = store.get_active().unwrap().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(store.list_history().unwrap().len(), 1);

    // The unpublished version must not resurface after a restart.
    let reopened = VersionStore::open_dir(dir.path()).unwrap();
    assert_eq!(reopened.list_history().unwrap().len(), 1);
    assert_eq!(
        reopened.active_version_id().unwrap(),
        Some(before.version_id.clone())
    );
}

#[test]
fn failed_write_and_backup_abort_cleanly() {
    let dir = tempdir().unwrap();
    let (controller, faults) = flaky_controller(dir.path());
    let store = controller.store().clone();
    assert_eq!(controller.run(true).status, RunStatus::Deployed);
    let active = store.active_version_id().unwrap();

    faults.write_version.store(true, Ordering::SeqCst);
    assert_eq!(controller.run(true).status, RunStatus::Aborted);
    faults.write_version.store(false, Ordering::SeqCst);

    faults.backup.store(true, Ordering::SeqCst);
    let outcome = controller.run(true);
    assert_eq!(outcome.status, RunStatus::Aborted);
    assert!(outcome.errors[0].contains("injected backup failure"));

    assert_eq!(store.active_version_id().unwrap(), active);
    assert_eq!(store.list_history().unwrap().len(), 1);
}

#[test]
fn corrupt_marker_is_reported_on_open() {
    let dir = tempdir().unwrap();
    FsArtifactStore::new(dir.path()).unwrap();
    std::fs::write(dir.path().join("CURRENT"), "not-a-version\n").unwrap();
    assert!(matches!(
        VersionStore::open_dir(dir.path()),
        Err(StoreError::Corrupt { .. })
    ));
}

fn dairy_model() -> TrainedModel {
    keyword_model(&["lait", "pomme"], &["laitiers", "fruits"])
}

#[test]
fn corrupt_old_version_does_not_block_the_active_model() {
    let dir = tempdir().unwrap();
    let (first, second) = {
        let store = VersionStore::open_dir(dir.path()).unwrap();
        let first = store.deploy(dairy_model(), metrics(0.8, 0.8)).unwrap();
        let second = store.deploy(dairy_model(), metrics(0.9, 0.9)).unwrap();
        (first, second)
    };
    let model_path = dir
        .path()
        .join("versions")
        .join(first.as_str())
        .join("model.json");
    let mut bytes = std::fs::read(&model_path).unwrap();
    bytes.push(b'x');
    std::fs::write(&model_path, bytes).unwrap();

    let store = VersionStore::open_dir(dir.path()).unwrap();
    assert_eq!(store.active_version_id().unwrap(), Some(second.clone()));
    let history: Vec<VersionId> = store
        .list_history()
        .unwrap()
        .iter()
        .map(|v| v.version_id.clone())
        .collect();
    assert_eq!(history, vec![second.clone()]);
    let predictions = serving::predict(&store, &["lait entier"]).unwrap();
    assert_eq!(predictions[0].category, "laitiers");

    let third = store.deploy(dairy_model(), metrics(0.9, 0.9)).unwrap();
    assert!(third > second);
}

#[test]
fn corrupt_active_version_fails_open() {
    let dir = tempdir().unwrap();
    let active = VersionStore::open_dir(dir.path())
        .unwrap()
        .deploy(dairy_model(), metrics(0.8, 0.8))
        .unwrap();
    let metrics_path = dir
        .path()
        .join("versions")
        .join(active.as_str())
        .join("metrics.json");
    std::fs::write(&metrics_path, b"{}").unwrap();
    assert!(matches!(
        VersionStore::open_dir(dir.path()),
        Err(StoreError::Corrupt { .. })
    ));
}

#[test]
fn version_written_but_never_made_current_is_dropped_on_reopen() {
    let dir = tempdir().unwrap();
    let active = VersionStore::open_dir(dir.path())
        .unwrap()
        .deploy(dairy_model(), metrics(0.8, 0.8))
        .unwrap();

    // A crash between writing the version and swapping the marker.
    let orphan = VersionId::parse("29990101T000000.000Z").unwrap();
    FsArtifactStore::new(dir.path())
        .unwrap()
        .write_version(&ModelVersion {
            version_id: orphan.clone(),
            model: dairy_model(),
            metrics: metrics(0.1, 0.1),
        })
        .unwrap();

    let store = VersionStore::open_dir(dir.path()).unwrap();
    assert_eq!(store.active_version_id().unwrap(), Some(active.clone()));
    let history: Vec<VersionId> = store
        .list_history()
        .unwrap()
        .iter()
        .map(|v| v.version_id.clone())
        .collect();
    assert_eq!(history, vec![active]);
    assert!(!dir.path().join("versions").join(orphan.as_str()).exists());

    let next = store.deploy(dairy_model(), metrics(0.9, 0.9)).unwrap();
    assert!(next < orphan);
}

#[test]
fn rolled_back_history_survives_reopen() {
    let dir = tempdir().unwrap();
    let (first, second) = {
        let store = VersionStore::open_dir(dir.path()).unwrap();
        let first = store.deploy(dairy_model(), metrics(0.8, 0.8)).unwrap();
        let second = store.deploy(dairy_model(), metrics(0.9, 0.9)).unwrap();
        store.rollback(&first).unwrap();
        (first, second)
    };
    let store = VersionStore::open_dir(dir.path()).unwrap();
    assert_eq!(store.active_version_id().unwrap(), Some(first));
    assert_eq!(store.list_history().unwrap().len(), 2);
    assert_eq!(store.list_history().unwrap()[1].version_id, second);
}
