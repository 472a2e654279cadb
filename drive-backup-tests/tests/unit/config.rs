//! Unit tests for configuration loading and validation
//!
//! These tests verify config parsing, validation, and job resolution.

use drive_backup::config::{load_config, resolve_all_jobs, ConfigError};
use rstest::rstest;
use std::path::PathBuf;
use test_utils::{minimal_config_toml, BackupMethod, ConfigBuilder, JobConfig, ResultAssertions, TestContext};

#[test]
fn test_config_loading_valid() {
    let (config, path, _temp_dir) = ConfigBuilder::gitlab_and_jenkins().write();

    let loaded = load_config(&path).assert_ok_msg("Config should load successfully");
    assert_eq!(loaded.jobs.len(), config.jobs.len());
    assert_eq!(loaded.global.backup_root, config.global.backup_root);
}

#[test]
fn test_config_from_template() {
    let ctx = TestContext::new();
    let cred = ctx.create_file("cred.json", "{}");
    let source = ctx.create_subdir("jenkins_home");

    let contents = minimal_config_toml()
        .replace("{credentials_file}", &cred.display().to_string())
        .replace("{backup_root}", &ctx.temp_dir().join("backups").display().to_string())
        .replace("{log_directory}", &ctx.temp_dir().join("logs").display().to_string())
        .replace("{source_path}", &source.display().to_string());
    let path = ctx.create_file("config.toml", &contents);

    let config = load_config(&path).assert_ok();
    let jobs = resolve_all_jobs(&config).assert_ok();
    assert_eq!(jobs[0].method_kind(), BackupMethod::DirectoryArchive);
    assert_eq!(jobs[0].local_directory, ctx.temp_dir().join("backups").join("jenkins"));
}

#[test]
fn test_missing_credentials_file_rejected() {
    let builder = ConfigBuilder::minimal();
    let missing = builder.temp_dir().join("missing.json");
    let (_config, path, _temp_dir) = builder.with_credentials_file(&missing).write();

    load_config(&path).assert_err_contains("Credentials file does not exist");
}

#[test]
fn test_duplicate_job_names_rejected() {
    let (_config, path, _temp_dir) = ConfigBuilder::minimal()
        .add_external_command_job("gitlab", "other-folder", &["gitlab-backup", "create"])
        .write();

    assert!(matches!(load_config(&path), Err(ConfigError::DuplicateJob(name)) if name == "gitlab"));
}

fn job(method: BackupMethod) -> JobConfig {
    JobConfig {
        name: "svc".to_string(),
        method,
        enabled: true,
        remote_folder_id: "folder".to_string(),
        source_paths: vec![],
        command: vec![],
        local_directory: None,
        artifact_suffix: None,
    }
}

#[rstest]
#[case::archive_without_sources(job(BackupMethod::DirectoryArchive))]
#[case::command_without_program(JobConfig { command: vec!["  ".to_string()], ..job(BackupMethod::ExternalCommand) })]
#[case::empty_folder_id(JobConfig { remote_folder_id: String::new(), command: vec!["x".to_string()], ..job(BackupMethod::ExternalCommand) })]
#[case::suffix_on_directory_archive(JobConfig { artifact_suffix: Some(".tgz".to_string()), source_paths: vec![PathBuf::from("/srv")], ..job(BackupMethod::DirectoryArchive) })]
#[case::empty_suffix(JobConfig { artifact_suffix: Some(String::new()), command: vec!["x".to_string()], ..job(BackupMethod::ExternalCommand) })]
fn test_invalid_jobs_rejected(#[case] invalid: JobConfig) {
    let (_config, path, _temp_dir) = ConfigBuilder::new().add_job_config(invalid).write();

    assert!(matches!(load_config(&path), Err(ConfigError::InvalidJob { .. })));
}

#[test]
fn test_unknown_method_is_parse_error() {
    let ctx = TestContext::new();
    let cred = ctx.create_file("cred.json", "{}");
    let path = ctx.create_file(
        "config.toml",
        &format!(
            r#"
[global]
credentials_file = "{}"

[[jobs]]
name = "svn"
method = "rsync"
remote_folder_id = "folder"
"#,
            cred.display()
        ),
    );

    assert!(matches!(load_config(&path), Err(ConfigError::ParseError(_))));
}

#[test]
fn test_resolution_defaults() {
    let config = ConfigBuilder::gitlab_and_jenkins().build();
    let jobs = resolve_all_jobs(&config).assert_ok();

    let gitlab = &jobs[0];
    assert_eq!(gitlab.pattern.prefix, "");
    assert_eq!(gitlab.pattern.suffix, "_gitlab_backup.tar");

    let jenkins = &jobs[1];
    assert_eq!(jenkins.pattern.prefix, "jenkins_backup_");
    assert_eq!(jenkins.pattern.suffix, ".tar.gz");
    assert_eq!(jenkins.local_directory, config.global.backup_root.join("jenkins"));
    assert_eq!(jenkins.source_paths().len(), 1);
    assert!(jenkins.source_paths()[0].ends_with(PathBuf::from("jenkins_home")));
}
