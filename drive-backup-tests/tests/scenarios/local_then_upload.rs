//! Local retention runs before upload and decides what gets uploaded

use test_utils::{
    OptionAssertions, at, gitlab_artifact_name, jenkins_artifact_name, write_aged_file, ConfigBuilder, JobState, MockExecutor,
    MockFileOps, MockRemoteStore, RealFileOps, RemoteCall, TestContext, GITLAB_FOLDER_ID, JENKINS_FOLDER_ID,
};

#[test]
fn test_only_newest_archive_survives_and_is_uploaded() {
    let ctx = TestContext::from_builder(ConfigBuilder::gitlab_and_jenkins().disable_job("gitlab"));
    let dir = ctx.job_directory("jenkins");

    // T1 < T2 exist before the run; the run itself writes T3
    write_aged_file(&dir, &jenkins_artifact_name(1));
    write_aged_file(&dir, &jenkins_artifact_name(2));
    std::fs::write(dir.join("notes.txt"), "unrelated").unwrap();

    let executor = MockExecutor::new().creating_output_after("-czf");
    let remote = MockRemoteStore::new();
    let summary = ctx
        .orchestrator(executor.clone(), RealFileOps::new(), remote.clone())
        .run_all();

    assert!(summary.all_succeeded());
    assert_eq!(summary.skipped, vec!["gitlab"]);

    let report = summary.report("jenkins").assert_some();
    assert_eq!(report.state, JobState::RemoteRetained);
    let kept = report.artifact.as_ref().unwrap();

    let remaining = TestContext::list_file_names(&dir);
    let kept_name = kept.path.file_name().unwrap().to_string_lossy().to_string();
    assert_eq!(remaining, vec![kept_name.clone(), "notes.txt".to_string()]);
    assert_ne!(kept_name, jenkins_artifact_name(1));
    assert_ne!(kept_name, jenkins_artifact_name(2));

    let uploads: Vec<_> = remote
        .get_calls()
        .into_iter()
        .filter_map(|c| match c {
            RemoteCall::Upload { folder_id, path } => Some((folder_id, path)),
            _ => None,
        })
        .collect();
    assert_eq!(uploads, vec![(JENKINS_FOLDER_ID.to_string(), kept.path.clone())]);
    assert_eq!(executor.call_count("tar"), 1);
}

#[test]
fn test_external_command_artifacts_pruned_to_newest() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dir = ctx.job_directory("gitlab");
    let files = MockFileOps::new()
        .with_file(dir.join(gitlab_artifact_name(100)), at(100))
        .with_file(dir.join(gitlab_artifact_name(300)), at(300))
        .with_file(dir.join(gitlab_artifact_name(200)), at(200));
    let remote = MockRemoteStore::new();

    let summary = ctx
        .orchestrator(MockExecutor::new(), files.clone(), remote.clone())
        .run_all();

    assert!(summary.all_succeeded());
    assert_eq!(files.files(), vec![dir.join(gitlab_artifact_name(300))]);

    let stored = remote.objects(GITLAB_FOLDER_ID);
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, gitlab_artifact_name(300));
}

#[test]
fn test_local_removal_failure_still_uploads() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dir = ctx.job_directory("gitlab");
    let stuck = dir.join(gitlab_artifact_name(100));
    let files = MockFileOps::new()
        .with_file(&stuck, at(100))
        .with_file(dir.join(gitlab_artifact_name(200)), at(200))
        .with_failing_removal(&stuck);
    let remote = MockRemoteStore::new();

    let summary = ctx.orchestrator(MockExecutor::new(), files, remote.clone()).run_all();

    let report = summary.report("gitlab").assert_some();
    assert!(report.succeeded());
    assert_eq!(report.warnings.len(), 1);
    assert!(remote.upload_called());
    assert_eq!(summary.warning_count(), 1);
}
