use crate::{
    error::{ApiError, ErrorKind, WriteError},
    types::{ArchiveConfig, ArchiveOutcome},
    utils,
};

/// A failure raised while reconciling one playlist, tagged with the side it
/// came from so a 404 on the archive is not mistaken for a missing source.
#[derive(Debug)]
pub enum ReconcileError {
    /// Reading the source playlist failed.
    Source(ApiError),
    /// Listing, creating or reading the archive failed.
    Archive(ApiError),
    /// Appending to the archive failed.
    Write(WriteError),
}

impl From<WriteError> for ReconcileError {
    fn from(err: WriteError) -> Self {
        ReconcileError::Write(err)
    }
}

/// Turns a reconciliation failure into a `Failed` outcome. Never fails itself.
pub fn classify(source_id: &str, error: &ReconcileError) -> ArchiveOutcome {
    match error {
        ReconcileError::Source(err) if err.is_not_found() => {
            if utils::is_algorithmic_playlist(source_id) {
                failed(
                    ErrorKind::PlatformRestriction,
                    format!(
                        "Playlist {source_id} is not accessible. This appears to be a Spotify \
                         algorithmic playlist (Daily Mix, Discover Weekly, etc.) which are blocked \
                         from API access since November 27, 2024. Use your own created playlists \
                         instead of algorithmic ones. Original error: {err}"
                    ),
                    None,
                )
            } else {
                failed(
                    ErrorKind::SourceNotFound,
                    format!(
                        "Playlist {source_id} was not found. Check the id and that the playlist \
                         still exists. Original error: {err}"
                    ),
                    None,
                )
            }
        }
        ReconcileError::Source(err) | ReconcileError::Archive(err) => classify_api(err, None),
        ReconcileError::Write(err) if err.source.is_auth() => {
            classify_api(&err.source, Some(err.committed_batches))
        }
        ReconcileError::Write(err) if err.committed_batches > 0 => failed(
            ErrorKind::PartialWriteFailure,
            err.to_string(),
            Some(err.committed_batches),
        ),
        ReconcileError::Write(err) => classify_api(&err.source, Some(0)),
    }
}

fn classify_api(err: &ApiError, committed_batches: Option<usize>) -> ArchiveOutcome {
    if err.is_auth() {
        return failed(
            ErrorKind::AuthError,
            format!(
                "Spotify rejected the credentials: {err}. Run plarchive auth or update \
                 SPOTIFY_REFRESH_TOKEN"
            ),
            committed_batches,
        );
    }
    failed(ErrorKind::TransientOrUnknown, err.to_string(), committed_batches)
}

fn failed(error_kind: ErrorKind, message: String, committed_batches: Option<usize>) -> ArchiveOutcome {
    ArchiveOutcome::Failed {
        error_kind,
        is_platform_restriction: error_kind == ErrorKind::PlatformRestriction,
        message,
        committed_batches,
    }
}

/// Number of configured sources that look like algorithmic playlists.
pub fn count_algorithmic(configs: &[ArchiveConfig]) -> usize {
    configs
        .iter()
        .filter(|c| utils::is_algorithmic_playlist(&c.source_id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(outcome: &ArchiveOutcome) -> (ErrorKind, bool) {
        match outcome {
            ArchiveOutcome::Failed {
                error_kind,
                is_platform_restriction,
                ..
            } => (*error_kind, *is_platform_restriction),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn not_found_on_algorithmic_source_is_platform_restriction() {
        let err = ReconcileError::Source(ApiError::NotFound("Resource not found".into()));
        let outcome = classify("37i9dQZF1E39vTG3GurFPW", &err);
        assert_eq!(kind_of(&outcome), (ErrorKind::PlatformRestriction, true));

        let ArchiveOutcome::Failed { message, .. } = outcome else {
            unreachable!()
        };
        assert!(message.contains("Use your own created playlists"));
    }

    #[test]
    fn not_found_on_regular_source_is_source_not_found() {
        let err = ReconcileError::Source(ApiError::NotFound("Resource not found".into()));
        let outcome = classify("3cEYpjA9oz9GiPac4AsH4n", &err);
        assert_eq!(kind_of(&outcome), (ErrorKind::SourceNotFound, false));
    }

    #[test]
    fn not_found_on_archive_side_is_not_blamed_on_source() {
        let err = ReconcileError::Archive(ApiError::NotFound("gone".into()));
        let outcome = classify("37i9dQZF1E39vTG3GurFPW", &err);
        assert_eq!(kind_of(&outcome), (ErrorKind::TransientOrUnknown, false));
    }

    #[test]
    fn unauthorized_is_auth_error() {
        let err = ReconcileError::Source(ApiError::Unauthorized {
            status: 401,
            message: "expired".into(),
        });
        assert_eq!(kind_of(&classify("x", &err)), (ErrorKind::AuthError, false));
    }

    #[test]
    fn transient_errors_keep_the_raw_message() {
        let err = ReconcileError::Source(ApiError::Status {
            status: 500,
            message: "Server error".into(),
        });
        let outcome = classify("x", &err);
        let ArchiveOutcome::Failed {
            error_kind, message, ..
        } = outcome
        else {
            unreachable!()
        };
        assert_eq!(error_kind, ErrorKind::TransientOrUnknown);
        assert_eq!(message, "HTTP 500: Server error");
    }

    #[test]
    fn write_failure_after_commits_is_partial() {
        let err = ReconcileError::Write(WriteError {
            committed_batches: 2,
            total_batches: 3,
            source: ApiError::Transport("reset".into()),
        });
        let outcome = classify("x", &err);
        assert_eq!(kind_of(&outcome), (ErrorKind::PartialWriteFailure, false));
        assert!(matches!(
            outcome,
            ArchiveOutcome::Failed {
                committed_batches: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn write_failure_on_first_batch_uses_the_cause() {
        let err = ReconcileError::Write(WriteError {
            committed_batches: 0,
            total_batches: 1,
            source: ApiError::Transport("reset".into()),
        });
        assert_eq!(
            kind_of(&classify("x", &err)),
            (ErrorKind::TransientOrUnknown, false)
        );
    }

    #[test]
    fn auth_failure_during_write_stays_fatal() {
        let err = ReconcileError::Write(WriteError {
            committed_batches: 1,
            total_batches: 3,
            source: ApiError::Unauthorized {
                status: 401,
                message: "revoked".into(),
            },
        });
        assert_eq!(kind_of(&classify("x", &err)), (ErrorKind::AuthError, false));
    }

    #[test]
    fn counts_algorithmic_configs() {
        let configs = vec![
            ArchiveConfig::new("37i9dQZF1DXcBWIGoYBM5M", None),
            ArchiveConfig::new("3cEYpjA9oz9GiPac4AsH4n", None),
        ];
        assert_eq!(count_algorithmic(&configs), 1);
    }
}
