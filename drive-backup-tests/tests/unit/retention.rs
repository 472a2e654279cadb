//! Retention properties for both storage domains

use drive_backup::managers::local_retention::LocalRetentionManager;
use drive_backup::managers::remote_retention::RemoteRetentionManager;
use rstest::rstest;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use test_utils::{
    at, remote_object, remote_objects, ArtifactPattern, BackupError, MockFileOps, MockRemoteStore, RemoteCall,
    GITLAB_FOLDER_ID,
};

fn jenkins_pattern() -> ArtifactPattern {
    ArtifactPattern::new("jenkins_backup_", ".tar.gz")
}

fn local_files(count: usize) -> MockFileOps {
    let files = MockFileOps::new();
    for i in 0..count {
        files.add_file(
            format!("/var/backups/jenkins/jenkins_backup_{}.tar.gz", i),
            at(i as i64 * 60),
        );
    }
    files
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(5)]
fn test_local_retention_leaves_exactly_newest(#[case] count: usize) {
    let files = local_files(count);
    let manager = LocalRetentionManager::new(&files);

    let result = manager
        .retain_latest(Path::new("/var/backups/jenkins"), &jenkins_pattern())
        .unwrap();

    let newest = PathBuf::from(format!("/var/backups/jenkins/jenkins_backup_{}.tar.gz", count - 1));
    assert_eq!(result.kept.path, newest);
    assert_eq!(files.files(), vec![newest.clone()]);
    assert_eq!(files.get_removals().len(), count - 1);
    assert!(!files.get_removals().contains(&newest));
}

#[test]
fn test_local_delete_failure_is_not_fatal() {
    let files = local_files(3).with_failing_removal("/var/backups/jenkins/jenkins_backup_0.tar.gz");
    let manager = LocalRetentionManager::new(&files);

    let result = manager
        .retain_latest(Path::new("/var/backups/jenkins"), &jenkins_pattern())
        .unwrap();

    assert_eq!(
        result.kept.path,
        PathBuf::from("/var/backups/jenkins/jenkins_backup_2.tar.gz")
    );
    assert_eq!(result.removed.len(), 1);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].target.ends_with("jenkins_backup_0.tar.gz"));
    assert!(result.warnings[0].cause.contains("Permission denied"));
    assert_eq!(files.files().len(), 2);
}

#[test]
fn test_local_retention_ignores_non_matching_files() {
    let files = local_files(2)
        .with_file("/var/backups/jenkins/jenkins_backup_9.tar.gz.partial", at(10_000))
        .with_file("/var/backups/jenkins/README", at(10_000));
    let manager = LocalRetentionManager::new(&files);

    manager
        .retain_latest(Path::new("/var/backups/jenkins"), &jenkins_pattern())
        .unwrap();

    assert_eq!(files.files().len(), 3);
}

#[test]
fn test_local_retention_empty_is_error() {
    let files = MockFileOps::new();
    let manager = LocalRetentionManager::new(&files);

    let err = manager
        .retain_latest(Path::new("/var/backups/jenkins"), &jenkins_pattern())
        .unwrap_err();
    assert!(matches!(err, BackupError::NoArtifactFound { .. }));
}

#[rstest]
#[case(1)]
#[case(2)]
#[case(4)]
#[case(7)]
fn test_remote_retention_issues_len_minus_one_deletes(#[case] count: usize) {
    let objects = remote_objects(GITLAB_FOLDER_ID, count);
    let newest = objects[count - 1].clone();
    let store = MockRemoteStore::new().with_objects(GITLAB_FOLDER_ID, objects);

    let outcome = RemoteRetentionManager::new(&store).retain_latest(GITLAB_FOLDER_ID);

    assert_eq!(outcome.kept.as_ref(), Some(&newest));
    let deleted = store.deleted_ids();
    assert_eq!(deleted.len(), count - 1);
    assert!(!deleted.contains(&newest.id));
}

#[test]
fn test_remote_retention_unordered_listing() {
    let store = MockRemoteStore::new().with_objects(
        GITLAB_FOLDER_ID,
        vec![
            remote_object("b", GITLAB_FOLDER_ID, 20),
            remote_object("d", GITLAB_FOLDER_ID, 40),
            remote_object("a", GITLAB_FOLDER_ID, 10),
            remote_object("c", GITLAB_FOLDER_ID, 30),
        ],
    );

    let outcome = RemoteRetentionManager::new(&store).retain_latest(GITLAB_FOLDER_ID);

    assert_eq!(outcome.kept.map(|o| o.id), Some("d".to_string()));
    assert_eq!(store.deleted_ids(), vec!["b", "a", "c"]);
}

#[test]
fn test_remote_retention_empty_folder() {
    let store = MockRemoteStore::new();

    let outcome = RemoteRetentionManager::new(&store).retain_latest(GITLAB_FOLDER_ID);

    assert!(outcome.kept.is_none());
    assert!(outcome.warnings.is_empty());
    assert_eq!(
        store.get_calls(),
        vec![RemoteCall::List {
            folder_id: GITLAB_FOLDER_ID.to_string()
        }]
    );
}

#[test]
fn test_remote_retention_waits_for_settle_delay() {
    let store = MockRemoteStore::new().with_objects(GITLAB_FOLDER_ID, remote_objects(GITLAB_FOLDER_ID, 2));
    let started = Instant::now();

    RemoteRetentionManager::new(&store)
        .with_settle_delay(Duration::from_millis(50))
        .retain_latest(GITLAB_FOLDER_ID);

    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(store.deleted_ids().len(), 1);
}
