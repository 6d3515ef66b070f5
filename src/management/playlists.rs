use std::path::Path;

use crate::{
    config,
    error::ConfigError,
    types::{ArchiveConfig, PlaylistConfigTableRow},
    utils,
};

/// The playlist configuration file being edited.
///
/// Each operation consumes the builder and returns the updated value, so the
/// list is only ever changed through the value a caller holds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBuilder {
    entries: Vec<ArchiveConfig>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads an existing configuration file; a missing file starts empty.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        match async_fs::read_to_string(path).await {
            Ok(json) => Ok(Self {
                entries: config::validate_configs(config::parse_configs_json(&json)?)?,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Adds a playlist given as an id, URL or URI.
    pub fn add(mut self, playlist: &str, custom_name: Option<String>) -> Result<Self, ConfigError> {
        let source_id = utils::extract_playlist_id(playlist)
            .ok_or_else(|| ConfigError::InvalidPlaylistRef(playlist.trim().to_string()))?;

        if self.contains(&source_id) {
            return Err(ConfigError::Duplicate(source_id));
        }

        let custom_name = custom_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        self.entries.push(ArchiveConfig::new(source_id, custom_name));
        Ok(self)
    }

    pub fn remove(mut self, playlist: &str) -> Result<Self, ConfigError> {
        let source_id =
            utils::extract_playlist_id(playlist).unwrap_or_else(|| playlist.trim().to_string());
        let before = self.entries.len();
        self.entries.retain(|e| e.source_id != source_id);

        if self.entries.len() == before {
            return Err(ConfigError::UnknownEntry(source_id));
        }
        Ok(self)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.entries.iter().any(|e| e.source_id == source_id)
    }

    pub fn entries(&self) -> &[ArchiveConfig] {
        &self.entries
    }

    /// Rows for display. Without a custom name the archive name depends on
    /// the source's current name, which is shown as a placeholder.
    pub fn table_rows(&self) -> Vec<PlaylistConfigTableRow> {
        self.entries
            .iter()
            .map(|e| PlaylistConfigTableRow {
                playlist_id: e.source_id.clone(),
                archive_name: utils::archive_name("<playlist name>", e.custom_name.as_deref()),
            })
            .collect()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }
        async_fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}
