use std::sync::Arc;

use crate::{
    error::{ApiError, WriteError},
    spotify::{MAX_ITEMS_PER_REQUEST, PlaylistApi},
    types::CreatePlaylistRequest,
};

/// Items per append request.
pub const BATCH_SIZE: usize = MAX_ITEMS_PER_REQUEST;

/// Creates archive playlists and appends to them.
#[derive(Clone)]
pub struct ArchiveWriter {
    api: Arc<dyn PlaylistApi>,
    user_id: String,
}

impl ArchiveWriter {
    pub fn new(api: Arc<dyn PlaylistApi>, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
        }
    }

    /// Creates a private playlist and returns its id. Archives are never
    /// public, whatever the visibility of their source.
    pub async fn create(&self, name: &str, description: &str) -> Result<String, ApiError> {
        let request = CreatePlaylistRequest {
            name: name.to_string(),
            description: description.to_string(),
            public: false,
            collaborative: false,
        };

        let created = self.api.create_playlist(&self.user_id, &request).await?;
        tracing::info!(archive_id = %created.id, archive_name = name, "created archive playlist");
        Ok(created.id)
    }

    /// Appends `uris` in order, [`BATCH_SIZE`] per request.
    ///
    /// The first failing batch stops the append. Earlier batches stay
    /// committed and their count is reported in the [`WriteError`].
    /// Returns the number of batches written.
    pub async fn append_items(&self, collection_id: &str, uris: &[String]) -> Result<usize, WriteError> {
        let total_batches = uris.len().div_ceil(BATCH_SIZE);

        for (index, batch) in uris.chunks(BATCH_SIZE).enumerate() {
            if let Err(source) = self.api.add_items(collection_id, batch).await {
                tracing::error!(
                    collection_id,
                    batch = index + 1,
                    total_batches,
                    error = %source,
                    "append failed"
                );
                return Err(WriteError {
                    committed_batches: index,
                    total_batches,
                    source,
                });
            }

            tracing::info!(
                collection_id,
                batch = index + 1,
                total_batches,
                items = batch.len(),
                "appended batch"
            );
        }

        Ok(total_batches)
    }
}
