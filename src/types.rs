use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::ErrorKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

#[derive(Debug, Clone)]
pub struct PkceToken {
    pub code_verifier: String,
    pub token: Option<Token>,
}

// ---- Spotify wire types -------------------------------------------------

/// One page of a paginated listing. `next` is the absolute URL of the
/// following page, `None` on the last page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TracksRef {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub owner: PlaylistOwner,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tracks: TracksRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub track: Option<PlaylistTrack>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTrack {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Vec<TrackArtist>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackArtist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistRequest {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub collaborative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlaylistResponse {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistRequest {
    pub uris: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddTrackToPlaylistResponse {
    pub snapshot_id: String,
}

// ---- Archive domain -----------------------------------------------------

/// A playlist track that can take part in deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub display_name: String,
    pub artist_names: Vec<String>,
    pub uri: String,
    pub added_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Validates a raw playlist entry. Removed tracks and local files have no
    /// usable identity and yield `None`.
    pub fn from_entry(entry: PlaylistEntry) -> Option<Self> {
        let track = entry.track?;
        if track.is_local {
            return None;
        }
        let id = track.id.filter(|id| !id.is_empty())?;
        let uri = track.uri.filter(|uri| !uri.is_empty())?;

        Some(Item {
            id,
            display_name: track.name.unwrap_or_default(),
            artist_names: track.artists.into_iter().map(|a| a.name).collect(),
            uri,
            added_at: entry.added_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub is_public: bool,
    pub description: String,
    pub item_count: u64,
}

impl From<Playlist> for CollectionSnapshot {
    fn from(p: Playlist) -> Self {
        CollectionSnapshot {
            id: p.id,
            name: p.name,
            owner_id: p.owner.id,
            is_public: p.public.unwrap_or(false),
            description: p.description.unwrap_or_default(),
            item_count: p.tracks.total,
        }
    }
}

/// An entry of the current user's playlist listing. The listing also holds
/// followed playlists, so `owner_id` may be another account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCollection {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub item_count: u64,
    pub is_public: bool,
}

impl From<Playlist> for OwnedCollection {
    fn from(p: Playlist) -> Self {
        OwnedCollection {
            id: p.id,
            name: p.name,
            owner_id: p.owner.id,
            item_count: p.tracks.total,
            is_public: p.public.unwrap_or(false),
        }
    }
}

/// One playlist to archive. Serialized with the field names the config
/// files and `SPOTIFY_PLAYLISTS_CONFIG` use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(rename = "playlist_id", alias = "source_id")]
    pub source_id: String,
    #[serde(default)]
    pub custom_name: Option<String>,
}

impl ArchiveConfig {
    pub fn new(source_id: impl Into<String>, custom_name: Option<String>) -> Self {
        Self {
            source_id: source_id.into(),
            custom_name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnchangedReason {
    AlreadyArchived,
    SourceEmptyPreserved,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum ArchiveOutcome {
    Created {
        archive_id: String,
        archive_name: String,
        source_count: usize,
        archive_count: usize,
    },
    Updated {
        archive_id: String,
        archive_name: String,
        source_count: usize,
        archive_count_before: usize,
        archive_count_after: usize,
        new_items_added: usize,
    },
    Unchanged {
        reason: UnchangedReason,
        archive_id: String,
        archive_name: String,
        source_count: usize,
        archive_count: usize,
    },
    EmptySourceNoArchive {
        source_name: String,
    },
    Failed {
        error_kind: ErrorKind,
        message: String,
        is_platform_restriction: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        committed_batches: Option<usize>,
    },
}

/// Outcome of reconciling one source playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveResult {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: ArchiveOutcome,
}

impl ArchiveResult {
    pub fn new(source_id: &str, source_name: Option<String>, outcome: ArchiveOutcome) -> Self {
        Self {
            source_id: source_id.to_string(),
            source_name,
            timestamp: Utc::now(),
            outcome,
        }
    }

    /// Everything except `Failed` counts as success, `EmptySourceNoArchive` included.
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, ArchiveOutcome::Failed { .. })
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.outcome {
            ArchiveOutcome::Failed { error_kind, .. } => Some(*error_kind),
            _ => None,
        }
    }

    pub fn is_platform_restriction(&self) -> bool {
        matches!(
            self.outcome,
            ArchiveOutcome::Failed {
                is_platform_restriction: true,
                ..
            }
        )
    }
}

/// One batch run, as appended to the session history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_timestamp: DateTime<Utc>,
    pub results: Vec<ArchiveResult>,
    pub total_count: usize,
    pub success_count: usize,
}

impl SessionRecord {
    pub fn from_results(results: Vec<ArchiveResult>) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            session_timestamp: Utc::now(),
            total_count: results.len(),
            success_count,
            results,
        }
    }

    pub fn failed_count(&self) -> usize {
        self.total_count - self.success_count
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionHistory {
    #[serde(default)]
    pub archive_sessions: Vec<SessionRecord>,
}

#[derive(Tabled)]
pub struct PlaylistConfigTableRow {
    pub playlist_id: String,
    pub archive_name: String,
}

#[derive(Tabled)]
pub struct OwnedPlaylistTableRow {
    pub playlist_id: String,
    pub name: String,
    pub tracks: u64,
    pub public: bool,
    pub configured: bool,
}

#[derive(Tabled)]
pub struct SessionTableRow {
    pub date: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
