//! Remote folder pruning after upload

use test_utils::{
    OptionAssertions, gitlab_artifact_name, remote_object, remote_objects, at, ConfigBuilder, JobState, MockExecutor, MockFileOps,
    MockRemoteStore, RemoteStore, TestContext, GITLAB_FOLDER_ID,
};

fn gitlab_context() -> (TestContext, MockFileOps) {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dir = ctx.job_directory("gitlab");
    let files = MockFileOps::new().with_file(dir.join(gitlab_artifact_name(500)), at(500));
    (ctx, files)
}

#[test]
fn test_five_objects_pruned_to_the_newest() {
    let store = MockRemoteStore::new().with_objects(GITLAB_FOLDER_ID, remote_objects(GITLAB_FOLDER_ID, 5));
    let newest = store.objects(GITLAB_FOLDER_ID)[4].clone();

    let outcome = drive_backup::managers::remote_retention::RemoteRetentionManager::new(&store)
        .retain_latest(GITLAB_FOLDER_ID);

    assert_eq!(outcome.removed.len(), 4);
    let listed = store.list_objects(GITLAB_FOLDER_ID).unwrap();
    assert_eq!(listed, vec![newest]);
}

#[test]
fn test_upload_replaces_previous_remote_backups() {
    let (ctx, files) = gitlab_context();
    let remote = MockRemoteStore::new().with_objects(
        GITLAB_FOLDER_ID,
        vec![
            remote_object("previous-1", GITLAB_FOLDER_ID, 10),
            remote_object("previous-2", GITLAB_FOLDER_ID, 20),
        ],
    );

    let summary = ctx.orchestrator(MockExecutor::new(), files, remote.clone()).run_all();

    let report = summary.report("gitlab").assert_some();
    assert_eq!(report.state, JobState::RemoteRetained);
    let uploaded = report.uploaded.clone().assert_some();
    assert_eq!(report.remote_kept.as_ref(), Some(&uploaded));
    assert_eq!(remote.objects(GITLAB_FOLDER_ID), vec![uploaded]);

    let mut deleted = remote.deleted_ids();
    deleted.sort();
    assert_eq!(deleted, vec!["previous-1", "previous-2"]);
}

#[test]
fn test_remote_delete_failure_is_warning() {
    let (ctx, files) = gitlab_context();
    let remote = MockRemoteStore::new()
        .with_objects(
            GITLAB_FOLDER_ID,
            vec![
                remote_object("locked", GITLAB_FOLDER_ID, 10),
                remote_object("old", GITLAB_FOLDER_ID, 20),
            ],
        )
        .with_failing_delete("locked");

    let summary = ctx.orchestrator(MockExecutor::new(), files, remote.clone()).run_all();

    assert!(summary.all_succeeded());
    let report = summary.report("gitlab").assert_some();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].target.contains("locked"));
    assert_eq!(remote.objects(GITLAB_FOLDER_ID).len(), 2);
}
