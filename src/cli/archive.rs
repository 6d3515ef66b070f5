use std::{io::IsTerminal, path::PathBuf, sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::watch;

use crate::{
    archive::{BatchReport, BatchRunner, HaltReason, classify::count_algorithmic},
    config,
    error::RunError,
    failure, info,
    management::{SessionLog, TokenManager},
    spotify::{PlaylistApi, SpotifyClient},
    success,
    types::{ArchiveOutcome, ArchiveResult, UnchangedReason},
    warning,
};

/// Exit status for configuration and validation errors.
pub const EXIT_CONFIG: i32 = 2;
/// Exit status when credentials are missing or rejected.
pub const EXIT_AUTH: i32 = 3;

const PLATFORM_RESTRICTION_HINT: &str =
    "Use your own created playlists instead of algorithmic ones";

#[derive(Debug, Clone, Default)]
pub struct ArchiveArgs {
    pub config_file: Option<PathBuf>,
    pub playlists: Vec<String>,
    pub log_file: Option<PathBuf>,
}

/// Runs one archive session and returns the process exit status.
pub async fn archive(args: ArchiveArgs, shutdown: watch::Receiver<bool>) -> i32 {
    let configs = match config::resolve_configs(args.config_file.as_deref(), &args.playlists)
        .await
        .and_then(config::validate_configs)
    {
        Ok(configs) => configs,
        Err(e) => {
            failure!("{}", e);
            return EXIT_CONFIG;
        }
    };

    info!("Archiving {} playlist(s)", configs.len());
    let algorithmic = count_algorithmic(&configs);
    if algorithmic > 0 {
        warning!(
            "{} of {} playlist id(s) look like Spotify algorithmic playlists, which are blocked from API access",
            algorithmic,
            configs.len()
        );
    }

    let tokens = match TokenManager::load_or_bootstrap().await {
        Ok(tokens) => tokens,
        Err(e) => {
            failure!("{}", e);
            return EXIT_AUTH;
        }
    };
    let api: Arc<dyn PlaylistApi> = Arc::new(SpotifyClient::new(tokens));

    let spinner = spinner();
    let progress = spinner.clone();
    let runner = BatchRunner::new(api)
        .with_shutdown(shutdown)
        .with_progress(move |position, total, config| {
            progress.set_message(format!(
                "Archiving playlist {position}/{total} ({})",
                config.source_id
            ));
        });

    let report = runner.run_all(configs).await;
    spinner.finish_and_clear();

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            failure!("{}", e);
            return if e.is_auth() {
                EXIT_AUTH
            } else if matches!(e, RunError::Validation(_)) {
                EXIT_CONFIG
            } else {
                1
            };
        }
    };

    let log_path = args.log_file.unwrap_or_else(config::archive_log_file);
    let log_saved = match SessionLog::new(&log_path)
        .append(report.session_record())
        .await
    {
        Ok(()) => true,
        Err(e) => {
            failure!("Failed to write archive log {}: {}", log_path.display(), e);
            false
        }
    };

    print_summary(&report);

    match report.exit_code() {
        0 if !log_saved => 1,
        code => code,
    }
}

pub(super) fn spinner() -> ProgressBar {
    if !std::io::stdout().is_terminal() {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Connecting to Spotify...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        spinner.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    spinner
}

fn print_summary(report: &BatchReport) {
    let record = report.session_record();
    info!(
        "Total: {} | Succeeded: {} | Failed: {}",
        record.total_count,
        record.success_count,
        record.failed_count()
    );

    for result in &report.results {
        let line = describe_result(result);
        if result.is_success() {
            success!("{}", line);
        } else {
            failure!("{}", line);
            if result.is_platform_restriction() {
                warning!("{}", PLATFORM_RESTRICTION_HINT);
            }
        }
    }

    match report.halted {
        Some(HaltReason::AuthFailure) => warning!(
            "Run stopped after an authentication failure, {} playlist(s) not attempted",
            report.skipped
        ),
        Some(HaltReason::Interrupted) => warning!(
            "Run interrupted, {} playlist(s) not attempted",
            report.skipped
        ),
        None => {}
    }
}

/// One summary line for a result.
pub fn describe_result(result: &ArchiveResult) -> String {
    let source = result.source_name.as_deref().unwrap_or(&result.source_id);

    match &result.outcome {
        ArchiveOutcome::Created {
            archive_name,
            source_count,
            archive_count,
            ..
        } => format!(
            "Created: {source} → {archive_name} | Source: {source_count} | Archive: {archive_count}"
        ),
        ArchiveOutcome::Updated {
            archive_name,
            source_count,
            archive_count_after,
            new_items_added,
            ..
        } => format!(
            "Updated (+{new_items_added}): {source} → {archive_name} | Source: {source_count} | Archive: {archive_count_after}"
        ),
        ArchiveOutcome::Unchanged {
            reason,
            archive_name,
            source_count,
            archive_count,
            ..
        } => {
            let label = match reason {
                UnchangedReason::AlreadyArchived => "Unchanged (already archived)",
                UnchangedReason::SourceEmptyPreserved => {
                    "Unchanged (source empty, archive preserved)"
                }
            };
            format!(
                "{label}: {source} → {archive_name} | Source: {source_count} | Archive: {archive_count}"
            )
        }
        ArchiveOutcome::EmptySourceNoArchive { source_name } => {
            format!("Skipped (empty source, no archive): {source_name}")
        }
        ArchiveOutcome::Failed {
            error_kind,
            message,
            ..
        } => format!("Failed ({error_kind}): {source}: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn updated_line_shows_added_count() {
        let result = ArchiveResult::new(
            "src",
            Some("Weekly".into()),
            ArchiveOutcome::Updated {
                archive_id: "arc".into(),
                archive_name: "Weekly (Cumulative)".into(),
                source_count: 30,
                archive_count_before: 60,
                archive_count_after: 65,
                new_items_added: 5,
            },
        );
        assert_eq!(
            describe_result(&result),
            "Updated (+5): Weekly → Weekly (Cumulative) | Source: 30 | Archive: 65"
        );
    }

    #[test]
    fn failed_line_falls_back_to_source_id() {
        let result = ArchiveResult::new(
            "37i9dQZF1DXcBWIGoYBM5M",
            None,
            ArchiveOutcome::Failed {
                error_kind: ErrorKind::PlatformRestriction,
                message: "blocked".into(),
                is_platform_restriction: true,
                committed_batches: None,
            },
        );
        assert_eq!(
            describe_result(&result),
            "Failed (platform restriction): 37i9dQZF1DXcBWIGoYBM5M: blocked"
        );
    }

    #[test]
    fn empty_source_line() {
        let result = ArchiveResult::new(
            "src",
            Some("Empty".into()),
            ArchiveOutcome::EmptySourceNoArchive {
                source_name: "Empty".into(),
            },
        );
        assert_eq!(
            describe_result(&result),
            "Skipped (empty source, no archive): Empty"
        );
    }
}
