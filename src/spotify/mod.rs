//! # Spotify Integration Module
//!
//! This module is the boundary between the archive engine and the Spotify Web
//! API. The engine only sees the [`PlaylistApi`] trait; [`client::SpotifyClient`]
//! implements it over HTTP and [`auth`] obtains the credentials it runs with.
//!
//! ## Architecture
//!
//! ```text
//! archive::engine / archive::runner
//!          ↓
//! PlaylistApi (trait)
//!          ↓
//! SpotifyClient ── retry on 429 / 5xx, status → ApiError mapping
//!          ↓
//! TokenManager ── cached token, refresh before expiry
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## API Coverage
//!
//! - `GET /me` - current account id, used to filter owned playlists
//! - `GET /me/playlists` - the account's playlists, paginated by `next`
//! - `GET /playlists/{id}` - playlist snapshot
//! - `GET /playlists/{id}/tracks` - playlist entries, full or `fields`-narrowed
//! - `POST /users/{user_id}/playlists` - create an archive playlist
//! - `POST /playlists/{id}/tracks` - append up to 100 uris
//!
//! ## Pagination
//!
//! Listing calls return a [`Page`] whose `next` is the absolute URL of the
//! following page. Callers pass it back as the `cursor` of the next call until
//! it is `None`.
//!
//! ## Retry Policy
//!
//! Retrying lives here and not in the engine. Rate limits honour `Retry-After`
//! up to a ceiling, gateway errors back off and retry, and once the retry
//! budget is spent the last error surfaces unchanged.

pub mod auth;
pub mod client;

use async_trait::async_trait;

use crate::{
    error::ApiError,
    types::{CreatePlaylistRequest, CreatePlaylistResponse, Page, Playlist, PlaylistEntry},
};

pub use client::{RetryPolicy, SpotifyClient};

/// Maximum number of uris accepted by one append request.
pub const MAX_ITEMS_PER_REQUEST: usize = 100;

/// The remote operations the archive engine depends on.
#[async_trait]
pub trait PlaylistApi: Send + Sync {
    /// Id of the account the client is authenticated as.
    async fn current_user_id(&self) -> Result<String, ApiError>;

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist, ApiError>;

    /// One page of a playlist's entries with full track payloads.
    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>, ApiError>;

    /// One page of a playlist's entries carrying only the track uri.
    async fn playlist_uris(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>, ApiError>;

    /// One page of the current account's playlists, owned and followed.
    async fn current_user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<Playlist>, ApiError>;

    async fn create_playlist(
        &self,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<CreatePlaylistResponse, ApiError>;

    /// Appends at most [`MAX_ITEMS_PER_REQUEST`] uris to the end of a playlist.
    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), ApiError>;
}
