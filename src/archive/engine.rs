use std::{collections::HashSet, fmt, sync::Arc};

use chrono::Utc;
use tracing::Instrument;

use crate::{
    spotify::PlaylistApi,
    types::{ArchiveConfig, ArchiveOutcome, ArchiveResult, CollectionSnapshot, UnchangedReason},
    utils,
};

use super::{
    classify::{ReconcileError, classify},
    locator,
    reader::CollectionReader,
    writer::ArchiveWriter,
};

/// Steps of a single reconciliation, recorded so a failure can say where it
/// happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ReadSource,
    LocateOrCreateArchive,
    CreateNew,
    ReuseExisting,
    ComputeDiff,
    AppendNew,
    Finalize,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ReadSource => "read-source",
            Phase::LocateOrCreateArchive => "locate-or-create-archive",
            Phase::CreateNew => "create-new",
            Phase::ReuseExisting => "reuse-existing",
            Phase::ComputeDiff => "compute-diff",
            Phase::AppendNew => "append-new",
            Phase::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Brings one archive playlist up to date with its source.
///
/// Archives only grow: items are appended after the existing ones and nothing
/// is ever removed, even when the source is emptied.
pub struct ReconciliationEngine {
    reader: CollectionReader,
    writer: ArchiveWriter,
    user_id: String,
}

/// Source state read at the start of a reconciliation.
struct SourceState {
    snapshot: CollectionSnapshot,
    item_count: usize,
    uris: Vec<String>,
    archive_name: String,
}

impl ReconciliationEngine {
    pub fn new(api: Arc<dyn PlaylistApi>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            reader: CollectionReader::new(Arc::clone(&api)),
            writer: ArchiveWriter::new(api, user_id.clone()),
            user_id,
        }
    }

    /// Reconciles one configured source. Failures are classified into a
    /// `Failed` result; this never returns an error.
    pub async fn reconcile(&self, config: &ArchiveConfig) -> ArchiveResult {
        let source_id = config.source_id.as_str();
        let mut phase = Phase::ReadSource;
        let mut source_name = None;

        let span = tracing::info_span!("reconcile", source_id);
        let result = self
            .run(config, &mut phase, &mut source_name)
            .instrument(span.clone())
            .await;
        let _enter = span.enter();

        match result {
            Ok(outcome) => {
                tracing::info!(outcome = ?outcome, "reconciliation finished");
                ArchiveResult::new(source_id, source_name, outcome)
            }
            Err(err) => {
                let outcome = classify(source_id, &err);
                tracing::error!(%phase, error = ?err, "reconciliation failed");
                ArchiveResult::new(source_id, source_name, outcome)
            }
        }
    }

    async fn run(
        &self,
        config: &ArchiveConfig,
        phase: &mut Phase,
        source_name: &mut Option<String>,
    ) -> Result<ArchiveOutcome, ReconcileError> {
        *phase = Phase::ReadSource;
        let source = self.read_source(config).await?;
        *source_name = Some(source.snapshot.name.clone());

        *phase = Phase::LocateOrCreateArchive;
        let owned = self
            .reader
            .read_owned_collections()
            .await
            .map_err(ReconcileError::Archive)?;
        let existing = locator::find_existing(&owned, &source.archive_name, &self.user_id)
            .map(str::to_string);

        match existing {
            Some(archive_id) => {
                tracing::info!(%archive_id, archive_name = %source.archive_name, "reusing archive");
                self.reuse_existing(source, archive_id, phase).await
            }
            None if source.item_count == 0 => {
                tracing::warn!("source playlist is empty, no archive created");
                Ok(ArchiveOutcome::EmptySourceNoArchive {
                    source_name: source.snapshot.name,
                })
            }
            None => self.create_new(source, phase).await,
        }
    }

    async fn read_source(&self, config: &ArchiveConfig) -> Result<SourceState, ReconcileError> {
        let snapshot = self
            .reader
            .read_snapshot(&config.source_id)
            .await
            .map_err(ReconcileError::Source)?;
        let items = self
            .reader
            .read_all_items(&config.source_id)
            .await
            .map_err(ReconcileError::Source)?;

        tracing::info!(source_name = %snapshot.name, items = items.len(), "read source playlist");

        let archive_name = utils::archive_name(&snapshot.name, config.custom_name.as_deref());
        Ok(SourceState {
            item_count: items.len(),
            uris: utils::dedup_preserving_order(items.into_iter().map(|item| item.uri)),
            archive_name,
            snapshot,
        })
    }

    async fn create_new(
        &self,
        source: SourceState,
        phase: &mut Phase,
    ) -> Result<ArchiveOutcome, ReconcileError> {
        *phase = Phase::CreateNew;
        let description =
            utils::archive_description(&source.snapshot.name, &source.snapshot.id, Utc::now());
        let archive_id = self
            .writer
            .create(&source.archive_name, &description)
            .await
            .map_err(ReconcileError::Archive)?;

        self.writer.append_items(&archive_id, &source.uris).await?;

        *phase = Phase::Finalize;
        let archive_count = self.final_count(&archive_id, source.uris.len()).await;

        Ok(ArchiveOutcome::Created {
            archive_id,
            archive_name: source.archive_name,
            source_count: source.item_count,
            archive_count,
        })
    }

    async fn reuse_existing(
        &self,
        source: SourceState,
        archive_id: String,
        phase: &mut Phase,
    ) -> Result<ArchiveOutcome, ReconcileError> {
        *phase = Phase::ReuseExisting;
        let existing = self
            .reader
            .read_archive_uris(&archive_id)
            .await
            .map_err(ReconcileError::Archive)?;

        if source.item_count == 0 {
            tracing::info!("source playlist is empty, archive preserved");
            return Ok(ArchiveOutcome::Unchanged {
                reason: UnchangedReason::SourceEmptyPreserved,
                archive_id,
                archive_name: source.archive_name,
                source_count: 0,
                archive_count: existing.len(),
            });
        }

        *phase = Phase::ComputeDiff;
        let archived: HashSet<String> = existing.iter().cloned().collect();
        let new_uris = compute_new_uris(&source.uris, &archived);

        if new_uris.is_empty() {
            tracing::info!("all tracks already archived");
            return Ok(ArchiveOutcome::Unchanged {
                reason: UnchangedReason::AlreadyArchived,
                archive_id,
                archive_name: source.archive_name,
                source_count: source.item_count,
                archive_count: existing.len(),
            });
        }

        *phase = Phase::AppendNew;
        self.writer.append_items(&archive_id, &new_uris).await?;

        *phase = Phase::Finalize;
        let archive_count_after = self
            .final_count(&archive_id, existing.len() + new_uris.len())
            .await;

        Ok(ArchiveOutcome::Updated {
            archive_id,
            archive_name: source.archive_name,
            source_count: source.item_count,
            archive_count_before: existing.len(),
            archive_count_after,
            new_items_added: new_uris.len(),
        })
    }

    /// Re-reads the archive for an authoritative count. The writes already
    /// succeeded, so a failed re-read falls back to the computed count.
    async fn final_count(&self, archive_id: &str, expected: usize) -> usize {
        match self.reader.read_archive_uris(archive_id).await {
            Ok(uris) => {
                if uris.len() != expected {
                    tracing::warn!(
                        archive_id,
                        expected,
                        actual = uris.len(),
                        "archive count differs from the computed count"
                    );
                }
                uris.len()
            }
            Err(e) => {
                tracing::warn!(archive_id, error = %e, "could not re-read archive, using computed count");
                expected
            }
        }
    }
}

/// Source uris missing from the archive, in source order.
pub fn compute_new_uris(source_uris: &[String], existing: &HashSet<String>) -> Vec<String> {
    source_uris
        .iter()
        .filter(|uri| !existing.contains(*uri))
        .cloned()
        .collect()
}
