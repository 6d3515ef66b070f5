use std::collections::HashSet;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

/// Suffix appended to every archive playlist name.
pub const ARCHIVE_SUFFIX: &str = " (Cumulative)";

/// Id prefix of Spotify's editorial and algorithmic playlists.
pub const ALGORITHMIC_PLAYLIST_PREFIX: &str = "37i9dQ";

const PLAYLIST_ID_LEN: usize = 22;

pub fn generate_code_verifier() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(128)
        .map(char::from)
        .collect()
}

pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Name of the archive playlist for a source: the custom name when given,
/// otherwise the source's own name, followed by [`ARCHIVE_SUFFIX`].
pub fn archive_name(source_name: &str, custom_name: Option<&str>) -> String {
    let base = custom_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(source_name);
    format!("{base}{ARCHIVE_SUFFIX}")
}

pub fn archive_description(source_name: &str, source_id: &str, now: DateTime<Utc>) -> String {
    format!(
        "Cumulative archive of '{source_name}' (last updated: {updated}). Original playlist: spotify:playlist:{source_id}",
        updated = now.format("%Y-%m-%d at %H:%M UTC"),
    )
}

pub fn is_algorithmic_playlist(playlist_id: &str) -> bool {
    playlist_id.starts_with(ALGORITHMIC_PLAYLIST_PREFIX)
}

/// Extracts a playlist id from a raw id, an `open.spotify.com` URL or a
/// `spotify:playlist:` URI.
pub fn extract_playlist_id(input: &str) -> Option<String> {
    let input = input.trim();

    if is_playlist_id(input) {
        return Some(input.to_string());
    }

    let candidate = if let Some(rest) = input.split_once("spotify:playlist:").map(|(_, r)| r) {
        rest
    } else if input.contains("spotify.com/") {
        // Share links may carry a locale segment: /intl-de/playlist/<id>
        match input.split_once("/playlist/") {
            Some((_, rest)) => rest,
            None => return None,
        }
    } else {
        return None;
    };

    let id: String = candidate
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();

    is_playlist_id(&id).then_some(id)
}

fn is_playlist_id(s: &str) -> bool {
    s.len() == PLAYLIST_ID_LEN && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Removes repeated uris, keeping the first occurrence and the input order.
pub fn dedup_preserving_order<I>(uris: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    uris.into_iter()
        .filter(|uri| seen.insert(uri.clone()))
        .collect()
}
