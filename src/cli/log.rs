use std::path::PathBuf;

use tabled::Table;

use crate::{config, failure, management::SessionLog, types::SessionTableRow, warning};

/// Prints the most recent `last` sessions of the archive log, oldest first.
pub async fn show_log(log_file: Option<PathBuf>, last: Option<usize>) -> i32 {
    let path = log_file.unwrap_or_else(config::archive_log_file);

    let history = match SessionLog::new(&path).load().await {
        Ok(history) => history,
        Err(e) => {
            failure!("{}", e);
            return 1;
        }
    };

    if history.archive_sessions.is_empty() {
        warning!("No archive sessions recorded in {}", path.display());
        return 0;
    }

    let sessions = &history.archive_sessions;
    let skip = last.map_or(0, |n| sessions.len().saturating_sub(n));

    let rows: Vec<SessionTableRow> = sessions
        .iter()
        .skip(skip)
        .map(|s| SessionTableRow {
            date: s.session_timestamp.format("%Y-%m-%d %H:%M UTC").to_string(),
            total: s.total_count,
            succeeded: s.success_count,
            failed: s.failed_count(),
        })
        .collect();

    println!("{}", Table::new(rows));
    0
}
