//! Configuration management for the playlist archiver.
//!
//! This module handles loading and accessing configuration values from environment
//! variables and `.env` files, and resolves the list of playlists a run should
//! archive. Every accessor returns a [`ConfigError`] instead of panicking so the
//! binary can report a missing setting before any network call is made.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the current directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::{error::ConfigError, types::ArchiveConfig, utils};

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8080/callback";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8080";
pub const DEFAULT_SCOPE: &str =
    "playlist-read-private playlist-modify-public playlist-modify-private";
pub const DEFAULT_LOG_FILE: &str = "archive_log.json";

/// Loads environment variables from `.env` files.
///
/// Looks for a `.env` in the current directory first and then in the
/// platform-specific local data directory under `plarchive/.env`. Variables
/// already present in the process environment are never overridden, and a
/// missing file is not an error.
///
/// # Directory Structure
///
/// The data directory file lives in:
/// - Linux: `~/.local/share/plarchive/.env`
/// - macOS: `~/Library/Application Support/plarchive/.env`
/// - Windows: `%LOCALAPPDATA%/plarchive/.env`
///
/// # Errors
///
/// Returns an error if a `.env` file exists but cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    match dotenv::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(e.to_string()),
    }

    let path = data_dir().join(".env");
    if async_fs::metadata(&path).await.is_ok() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Directory holding the `.env` file, the token cache and other local state.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("plarchive");
    path
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Returns the address of the local OAuth callback server.
pub fn server_addr() -> String {
    var_or("SERVER_ADDRESS", DEFAULT_SERVER_ADDRESS)
}

/// Returns the Spotify application client id.
///
/// # Errors
///
/// Returns [`ConfigError::MissingVar`] if `SPOTIFY_CLIENT_ID` is not set.
pub fn spotify_client_id() -> Result<String, ConfigError> {
    required("SPOTIFY_CLIENT_ID")
}

/// Returns the Spotify application client secret, if configured.
///
/// When present, token refreshes authenticate with HTTP basic auth; without it
/// the PKCE public-client refresh is used.
pub fn spotify_client_secret() -> Option<String> {
    optional("SPOTIFY_CLIENT_SECRET")
}

/// Returns a long-lived refresh token for headless runs (CI schedules).
pub fn spotify_refresh_token() -> Option<String> {
    optional("SPOTIFY_REFRESH_TOKEN")
}

pub fn spotify_redirect_uri() -> String {
    var_or("SPOTIFY_REDIRECT_URI", DEFAULT_REDIRECT_URI)
}

pub fn spotify_scope() -> String {
    var_or("SPOTIFY_API_AUTH_SCOPE", DEFAULT_SCOPE)
}

pub fn spotify_apiauth_url() -> String {
    var_or("SPOTIFY_API_AUTH_URL", DEFAULT_AUTH_URL)
}

pub fn spotify_apiurl() -> String {
    var_or("SPOTIFY_API_URL", DEFAULT_API_URL)
}

pub fn spotify_apitoken_url() -> String {
    var_or("SPOTIFY_API_TOKEN_URL", DEFAULT_TOKEN_URL)
}

/// Returns the path of the session history file.
pub fn archive_log_file() -> PathBuf {
    PathBuf::from(var_or("ARCHIVE_LOG_FILE", DEFAULT_LOG_FILE))
}

/// Resolves which playlists to archive.
///
/// Sources are tried in order and the first one present wins:
/// 1. `config_file`, a JSON array of `{ "playlist_id", "custom_name" }`
/// 2. `cli_playlists`, ids, URLs or URIs given on the command line
/// 3. `SPOTIFY_PLAYLISTS_CONFIG`, the same JSON array in an env var
/// 4. `SPOTIFY_PLAYLIST_IDS`, comma-separated ids
///
/// The result is not validated yet; see [`validate_configs`].
///
/// # Errors
///
/// Returns [`ConfigError::NoPlaylists`] when no source is present, or a parse
/// error for malformed JSON.
pub async fn resolve_configs(
    config_file: Option<&Path>,
    cli_playlists: &[String],
) -> Result<Vec<ArchiveConfig>, ConfigError> {
    if let Some(path) = config_file {
        let content = async_fs::read_to_string(path).await?;
        return parse_configs_json(&content);
    }

    if !cli_playlists.is_empty() {
        return Ok(cli_playlists
            .iter()
            .map(|id| ArchiveConfig::new(id.clone(), None))
            .collect());
    }

    if let Some(json) = optional("SPOTIFY_PLAYLISTS_CONFIG") {
        return parse_configs_json(&json);
    }

    if let Some(ids) = optional("SPOTIFY_PLAYLIST_IDS") {
        let configs = parse_playlist_ids(&ids);
        if !configs.is_empty() {
            return Ok(configs);
        }
    }

    Err(ConfigError::NoPlaylists)
}

/// Parses a JSON array of archive configurations.
pub fn parse_configs_json(json: &str) -> Result<Vec<ArchiveConfig>, ConfigError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if !value.is_array() {
        return Err(ConfigError::NotAnArray);
    }
    Ok(serde_json::from_value(value)?)
}

/// Parses a comma-separated id list. Blank entries are ignored.
pub fn parse_playlist_ids(ids: &str) -> Vec<ArchiveConfig> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| ArchiveConfig::new(id, None))
        .collect()
}

/// Validates and normalizes archive configurations.
///
/// Every entry needs a non-empty source id. URLs and `spotify:playlist:` URIs
/// are reduced to the bare id, and blank custom names are dropped.
///
/// # Errors
///
/// Returns the first invalid entry's error; nothing is partially accepted.
pub fn validate_configs(configs: Vec<ArchiveConfig>) -> Result<Vec<ArchiveConfig>, ConfigError> {
    configs
        .into_iter()
        .enumerate()
        .map(|(index, config)| {
            let source_id = normalize_source_id(&config.source_id)
                .map_err(|e| match e {
                    ConfigError::EmptySourceId { .. } => ConfigError::EmptySourceId { index },
                    other => other,
                })?;
            let custom_name = config
                .custom_name
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty());
            Ok(ArchiveConfig {
                source_id,
                custom_name,
            })
        })
        .collect()
}

/// Reduces an id, URL or URI to a bare playlist id.
pub fn normalize_source_id(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ConfigError::EmptySourceId { index: 0 });
    }
    if let Some(id) = utils::extract_playlist_id(raw) {
        return Ok(id);
    }
    if raw.contains('/') || raw.contains(':') || raw.contains(char::is_whitespace) {
        return Err(ConfigError::InvalidPlaylistRef(raw.to_string()));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_array() {
        let configs = parse_configs_json(
            r#"[{"playlist_id": "abc", "custom_name": "Mine"}, {"playlist_id": "def"}]"#,
        )
        .unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].custom_name.as_deref(), Some("Mine"));
        assert_eq!(configs[1].custom_name, None);
    }

    #[test]
    fn rejects_non_array_json() {
        assert!(matches!(
            parse_configs_json(r#"{"playlist_id": "abc"}"#),
            Err(ConfigError::NotAnArray)
        ));
        assert!(matches!(
            parse_configs_json("not json"),
            Err(ConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn parses_comma_separated_ids() {
        let configs = parse_playlist_ids(" a, ,b ,");
        let ids: Vec<_> = configs.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn validation_rejects_empty_id_with_its_index() {
        let configs = vec![
            ArchiveConfig::new("abc", None),
            ArchiveConfig::new("   ", None),
        ];
        assert!(matches!(
            validate_configs(configs),
            Err(ConfigError::EmptySourceId { index: 1 })
        ));
    }

    #[test]
    fn validation_normalizes_urls_and_blank_names() {
        let configs = vec![ArchiveConfig::new(
            "https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=xyz",
            Some("  ".into()),
        )];
        let configs = validate_configs(configs).unwrap();
        assert_eq!(configs[0].source_id, "37i9dQZF1DXcBWIGoYBM5M");
        assert_eq!(configs[0].custom_name, None);
    }

    #[test]
    fn validation_rejects_malformed_references() {
        assert!(matches!(
            normalize_source_id("https://example.com/thing"),
            Err(ConfigError::InvalidPlaylistRef(_))
        ));
    }
}
