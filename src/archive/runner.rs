use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    config,
    error::{ErrorKind, RunError},
    spotify::PlaylistApi,
    types::{ArchiveConfig, ArchiveResult, SessionRecord},
};

use super::engine::ReconciliationEngine;

/// Why a run stopped before reaching the end of its configuration list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// Credentials were rejected; every later call would fail too.
    AuthFailure,
    /// A shutdown signal arrived between two reconciliations.
    Interrupted,
}

/// Results of one batch run, in configuration order.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub results: Vec<ArchiveResult>,
    pub halted: Option<HaltReason>,
    /// Configurations never attempted because the run halted.
    pub skipped: usize,
}

impl BatchReport {
    pub fn session_record(&self) -> SessionRecord {
        SessionRecord::from_results(self.results.clone())
    }

    pub fn all_succeeded(&self) -> bool {
        self.halted.is_none() && self.results.iter().all(ArchiveResult::is_success)
    }

    /// Process exit status: 0 success, 1 a playlist failed, 3 credentials
    /// rejected, 130 interrupted.
    pub fn exit_code(&self) -> i32 {
        match self.halted {
            Some(HaltReason::Interrupted) => 130,
            Some(HaltReason::AuthFailure) => 3,
            None if self.all_succeeded() => 0,
            None => 1,
        }
    }
}

/// Archives a list of playlists one after the other.
///
/// Runs are strictly sequential: the API rate limit is shared by the whole
/// account, and the archive lookup relies on no other write creating a
/// same-named playlist while the listing is scanned.
pub struct BatchRunner {
    api: Arc<dyn PlaylistApi>,
    shutdown: Option<watch::Receiver<bool>>,
    progress: Option<Box<ProgressFn>>,
}

/// Called before each reconciliation with the 1-based position, the total and
/// the entry about to be processed.
pub type ProgressFn = dyn Fn(usize, usize, &ArchiveConfig) + Send + Sync;

impl BatchRunner {
    pub fn new(api: Arc<dyn PlaylistApi>) -> Self {
        Self {
            api,
            shutdown: None,
            progress: None,
        }
    }

    /// Checks `shutdown` before each playlist. A reconciliation that already
    /// started always runs to completion.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn with_progress<F>(mut self, progress: F) -> Self
    where
        F: Fn(usize, usize, &ArchiveConfig) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(progress));
        self
    }

    fn shutdown_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Validates `configs`, then reconciles each entry in order.
    ///
    /// A failing playlist is recorded and the run moves on, except for an
    /// authentication failure, which halts it.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::Validation`] for a malformed entry, before any
    /// network call, and [`RunError::Identity`] when the current account
    /// cannot be determined.
    pub async fn run_all(&self, configs: Vec<ArchiveConfig>) -> Result<BatchReport, RunError> {
        let configs = config::validate_configs(configs)?;

        let user_id = self
            .api
            .current_user_id()
            .await
            .map_err(RunError::Identity)?;
        tracing::info!(%user_id, playlists = configs.len(), "starting archive run");

        let engine = ReconciliationEngine::new(Arc::clone(&self.api), user_id);
        let total = configs.len();
        let mut results = Vec::with_capacity(total);
        let mut halted = None;

        for (index, config) in configs.iter().enumerate() {
            if self.shutdown_requested() {
                tracing::warn!(remaining = total - index, "shutdown requested, stopping run");
                halted = Some(HaltReason::Interrupted);
                break;
            }

            tracing::info!(
                source_id = %config.source_id,
                position = index + 1,
                total,
                "processing playlist"
            );
            if let Some(progress) = &self.progress {
                progress(index + 1, total, config);
            }
            let result = engine.reconcile(config).await;
            let auth_failed = result.error_kind().is_some_and(ErrorKind::is_fatal);
            results.push(result);

            if auth_failed {
                tracing::error!(remaining = total - index - 1, "credentials rejected, stopping run");
                halted = Some(HaltReason::AuthFailure);
                break;
            }
        }

        Ok(BatchReport {
            skipped: total - results.len(),
            results,
            halted,
        })
    }
}
