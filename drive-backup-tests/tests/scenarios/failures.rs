//! Fatal and non-fatal failures, and isolation between jobs

use test_utils::{
    OptionAssertions, at, gitlab_artifact_name, BackupError, ConfigBuilder, JobState, MockExecutor, MockFileOps, MockRemoteStore,
    MockResponse, RealFileOps, RemoteCall, TestContext, GITLAB_FOLDER_ID, JENKINS_FOLDER_ID,
};

#[test]
fn test_failed_backup_command_aborts_job_but_not_run() {
    let ctx = TestContext::from_builder(ConfigBuilder::gitlab_and_jenkins());
    let executor = MockExecutor::new()
        .expect(
            "gitlab-backup",
            MockResponse::Failure {
                stderr: "Backup failed".to_string(),
                exit_code: 1,
            },
        )
        .creating_output_after("-czf");
    let remote = MockRemoteStore::new();

    let summary = ctx
        .orchestrator(executor.clone(), RealFileOps::new(), remote.clone())
        .run_all();

    assert!(!summary.all_succeeded());

    let gitlab = summary.report("gitlab").assert_some();
    assert_eq!(gitlab.state, JobState::Aborted);
    assert_eq!(gitlab.failed_after, Some(JobState::Created));
    assert!(matches!(
        gitlab.error,
        Some(BackupError::ExternalCommandFailed { exit_code: Some(1), .. })
    ));
    assert!(gitlab.uploaded.is_none());

    // The sibling job still ran to completion
    let jenkins = summary.report("jenkins").assert_some();
    assert_eq!(jenkins.state, JobState::RemoteRetained);
    assert!(executor.was_called("tar"));

    let upload_folders: Vec<_> = remote
        .get_calls()
        .into_iter()
        .filter_map(|c| match c {
            RemoteCall::Upload { folder_id, .. } => Some(folder_id),
            _ => None,
        })
        .collect();
    assert_eq!(upload_folders, vec![JENKINS_FOLDER_ID.to_string()]);

    let failed: Vec<_> = summary.failed().map(|r| r.job.as_str()).collect();
    assert_eq!(failed, vec!["gitlab"]);
}

#[test]
fn test_listing_failure_after_upload_is_only_a_warning() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dir = ctx.job_directory("gitlab");
    let files = MockFileOps::new().with_file(dir.join(gitlab_artifact_name(1)), at(1));
    let remote = MockRemoteStore::new().with_failing_list();

    let summary = ctx.orchestrator(MockExecutor::new(), files, remote.clone()).run_all();

    assert!(summary.all_succeeded());
    let report = summary.report("gitlab").assert_some();
    assert_eq!(report.state, JobState::RemoteRetained);
    assert!(report.error.is_none());
    assert!(report.uploaded.is_some());
    assert!(report.remote_kept.is_none());
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].target.contains(GITLAB_FOLDER_ID));
    assert!(remote.deleted_ids().is_empty());
}

#[test]
fn test_upload_failure_aborts_job() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let dir = ctx.job_directory("gitlab");
    let files = MockFileOps::new().with_file(dir.join(gitlab_artifact_name(1)), at(1));
    let remote = MockRemoteStore::new().with_failing_upload();

    let summary = ctx.orchestrator(MockExecutor::new(), files.clone(), remote.clone()).run_all();

    let report = summary.report("gitlab").assert_some();
    assert_eq!(report.state, JobState::Aborted);
    assert_eq!(report.failed_after, Some(JobState::LocalRetained));
    assert!(matches!(report.error, Some(BackupError::UploadFailed { .. })));
    // The local artifact is kept for the next run
    assert_eq!(files.files().len(), 1);
    assert!(remote.deleted_ids().is_empty());
}

#[test]
fn test_missing_artifact_after_command_aborts() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let remote = MockRemoteStore::new();

    let summary = ctx
        .orchestrator(MockExecutor::new(), MockFileOps::new(), remote.clone())
        .run_all();

    let report = summary.report("gitlab").assert_some();
    assert!(matches!(report.error, Some(BackupError::NoArtifactFound { .. })));
    assert!(!remote.upload_called());
}

#[test]
fn test_missing_sources_abort_directory_archive() {
    let builder = ConfigBuilder::new().add_directory_archive_job(
        "jenkins",
        JENKINS_FOLDER_ID,
        vec!["/nonexistent/jenkins_home".into()],
    );
    let ctx = TestContext::from_builder(builder);
    let executor = MockExecutor::new();

    let summary = ctx
        .orchestrator(executor.clone(), RealFileOps::new(), MockRemoteStore::new())
        .run_all();

    let report = summary.report("jenkins").assert_some();
    assert!(matches!(report.error, Some(BackupError::NoValidSources { .. })));
    assert!(executor.get_calls().is_empty());
}
