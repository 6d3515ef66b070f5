use std::sync::Arc;

use crate::{
    error::ApiError,
    spotify::PlaylistApi,
    types::{CollectionSnapshot, Item, OwnedCollection, Page},
};

/// Paginated reads of playlists and of the account's playlist listing.
///
/// Every read drains the listing before returning. Errors are passed through
/// unchanged; retrying is the client's job.
#[derive(Clone)]
pub struct CollectionReader {
    api: Arc<dyn PlaylistApi>,
}

impl CollectionReader {
    pub fn new(api: Arc<dyn PlaylistApi>) -> Self {
        Self { api }
    }

    pub async fn read_snapshot(&self, collection_id: &str) -> Result<CollectionSnapshot, ApiError> {
        Ok(self.api.playlist(collection_id).await?.into())
    }

    /// All items of a playlist in playlist order. Entries without a usable
    /// uri (local files, removed tracks) are skipped.
    pub async fn read_all_items(&self, collection_id: &str) -> Result<Vec<Item>, ApiError> {
        let entries = drain(|cursor| self.api.playlist_items(collection_id, cursor)).await?;
        let total = entries.len();
        let items: Vec<Item> = entries.into_iter().filter_map(Item::from_entry).collect();

        tracing::debug!(
            collection_id,
            items = items.len(),
            skipped = total - items.len(),
            "read playlist items"
        );
        Ok(items)
    }

    /// Track uris of a playlist in playlist order, fetched without full
    /// payloads. Repeated entries are kept, so the length is the real
    /// entry count.
    pub async fn read_archive_uris(&self, collection_id: &str) -> Result<Vec<String>, ApiError> {
        let entries = drain(|cursor| self.api.playlist_uris(collection_id, cursor)).await?;
        let uris: Vec<String> = entries
            .into_iter()
            .filter_map(|entry| entry.track)
            .filter(|track| !track.is_local)
            .filter_map(|track| track.uri)
            .filter(|uri| !uri.is_empty())
            .collect();

        tracing::debug!(collection_id, uris = uris.len(), "read archive uris");
        Ok(uris)
    }

    /// Every playlist in the current account's listing, across all pages.
    pub async fn read_owned_collections(&self) -> Result<Vec<OwnedCollection>, ApiError> {
        let playlists = drain(|cursor| self.api.current_user_playlists(cursor)).await?;
        Ok(playlists.into_iter().map(OwnedCollection::from).collect())
    }
}

/// Follows `next` until the listing is exhausted.
async fn drain<T, F, Fut>(mut fetch: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, ApiError>>,
{
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = fetch(cursor.clone()).await?;
        all.extend(page.items);

        match page.next {
            // A server repeating the same cursor would loop forever.
            Some(next) if cursor.as_deref() != Some(next.as_str()) => cursor = Some(next),
            _ => break,
        }
    }

    Ok(all)
}
