//! Archive creation against mocked commands

use drive_backup::managers::archive::ArchiveCreator;
use std::path::PathBuf;
use std::time::Duration;
use test_utils::{
    at, gitlab_artifact_name, BackupError, ConfigBuilder, MockExecutor, MockFileOps, MockResponse, RealFileOps,
    TestContext,
};

#[test]
fn test_external_command_runs_elevated_with_timeout() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let job = ctx.job("gitlab");
    let files = MockFileOps::new()
        .with_file(job.local_directory.join(gitlab_artifact_name(1)), at(1))
        .with_file(job.local_directory.join(gitlab_artifact_name(2)), at(2));
    let executor = MockExecutor::new();

    let artifact = ArchiveCreator::new(&executor, &files)
        .with_sudo(true)
        .with_timeout(Some(Duration::from_secs(30)))
        .create(&job)
        .unwrap();

    assert_eq!(artifact.path, job.local_directory.join(gitlab_artifact_name(2)));
    let calls = executor.get_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program, "sudo");
    assert_eq!(calls[0].args, vec!["gitlab-backup", "create"]);
}

#[test]
fn test_external_command_timeout() {
    let ctx = TestContext::from_builder(ConfigBuilder::minimal());
    let executor = MockExecutor::new().expect("gitlab-backup", MockResponse::Timeout);

    let err = ArchiveCreator::new(&executor, &MockFileOps::new())
        .with_timeout(Some(Duration::from_secs(5)))
        .create(&ctx.job("gitlab"))
        .unwrap_err();

    assert!(matches!(err, BackupError::CommandTimedOut { timeout, .. } if timeout == Duration::from_secs(5)));
}

#[test]
fn test_directory_archive_writes_timestamped_file() {
    let ctx = TestContext::from_builder(ConfigBuilder::gitlab_and_jenkins());
    let job = ctx.job("jenkins");
    let executor = MockExecutor::new().creating_output_after("-czf");

    let artifact = ArchiveCreator::new(&executor, &RealFileOps::new()).create(&job).unwrap();

    let name = artifact.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("jenkins_backup_"));
    assert!(name.ends_with(".tar.gz"));
    // jenkins_backup_YYYY-MM-DD_HH-MM-SS.tar.gz
    assert_eq!(name.len(), "jenkins_backup_".len() + 19 + ".tar.gz".len());
    assert_eq!(artifact.path.parent().map(PathBuf::from), Some(job.local_directory.clone()));
    assert!(job.local_directory.is_dir());
}

#[test]
fn test_directory_archive_tar_failure() {
    let ctx = TestContext::from_builder(ConfigBuilder::gitlab_and_jenkins());
    let executor = MockExecutor::new().expect(
        "tar",
        MockResponse::Failure {
            stderr: "tar: Cannot open: Permission denied".to_string(),
            exit_code: 2,
        },
    );

    let err = ArchiveCreator::new(&executor, &RealFileOps::new())
        .create(&ctx.job("jenkins"))
        .unwrap_err();

    assert_eq!(err.exit_code(), Some(2));
}
