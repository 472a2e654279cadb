use anyhow::Result;
use clap::{Parser, Subcommand};
use drive_backup::config::{self, Config};
use drive_backup::managers::logging::{self, LoggingConfig};
use drive_backup::{BackupOrchestrator, RunSummary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drive-backup")]
#[command(about = "Back up services locally and mirror the newest archive to Google Drive", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/drive-backup/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled job (default)
    Run,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Validate => {
            logging::init_console_logging();
            let config = config::load_config(&cli.config)?;
            handle_validate(&config)
        }
        Commands::Run => {
            let config = config::load_config(&cli.config)?;

            // Keep the guard alive so buffered log lines are flushed on exit
            let _log_guard = logging::init_logging(&LoggingConfig::from_config(&config.global))?;

            let orchestrator = BackupOrchestrator::from_config(&config)?;
            let summary = orchestrator.run_all();
            print_summary(&summary);

            if !summary.all_succeeded() {
                let failed: Vec<&str> = summary.failed().map(|r| r.job.as_str()).collect();
                anyhow::bail!("{} job(s) failed: {}", failed.len(), failed.join(", "));
            }
            Ok(())
        }
    }
}

fn handle_validate(config: &Config) -> Result<()> {
    let jobs = config::resolve_all_jobs(config)?;

    println!("Configuration is valid!");
    println!("Jobs: {}", jobs.len());
    for job in &jobs {
        println!("  {}", job.name);
        println!("    Method: {:?}", job.method_kind());
        println!("    Enabled: {}", job.enabled);
        println!("    Local directory: {}", job.local_directory.display());
        println!("    Artifacts: {}", job.pattern);
        println!("    Remote folder: {}", job.remote_folder_id);
        if !job.source_paths().is_empty() {
            let sources: Vec<String> = job.source_paths().iter().map(|p| p.display().to_string()).collect();
            println!("    Sources: {}", sources.join(", "));
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("=== Backup summary ===");
    for report in &summary.reports {
        let marker = if report.succeeded() { "✓" } else { "✗" };
        println!(
            "{} {} ({}, {:.1}s)",
            marker,
            report.job,
            report.state,
            report.duration.as_secs_f64()
        );
        if let Some(err) = &report.error {
            println!("    Error: {}", err);
        }
        for warning in &report.warnings {
            println!("    Warning: {}", warning);
        }
    }
    for name in &summary.skipped {
        println!("- {} (disabled)", name);
    }
}
