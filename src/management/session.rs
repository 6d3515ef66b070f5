use std::path::{Path, PathBuf};

use crate::{
    error::SessionLogError,
    types::{SessionHistory, SessionRecord},
};

/// Append-only history of archive runs, stored as
/// `{ "archive_sessions": [ ... ] }`.
pub struct SessionLog {
    path: PathBuf,
}

impl SessionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole history. A missing file is an empty history.
    pub async fn load(&self) -> Result<SessionHistory, SessionLogError> {
        let json = match async_fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionHistory::default());
            }
            Err(e) => return Err(SessionLogError::Io(e)),
        };

        if json.trim().is_empty() {
            return Ok(SessionHistory::default());
        }
        Ok(serde_json::from_str(&json)?)
    }

    /// Appends `record` after all earlier sessions.
    ///
    /// An existing file that does not parse is left untouched and reported
    /// as an error.
    pub async fn append(&self, record: SessionRecord) -> Result<(), SessionLogError> {
        let mut history = self.load().await?;
        history.archive_sessions.push(record);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&history)?;
        let staging = self.staging_path();
        async_fs::write(&staging, json).await?;
        if let Err(e) = async_fs::rename(&staging, &self.path).await {
            let _ = async_fs::remove_file(&staging).await;
            return Err(SessionLogError::Io(e));
        }

        tracing::info!(
            path = %self.path.display(),
            sessions = history.archive_sessions.len(),
            "archive log saved"
        );
        Ok(())
    }

    /// Sibling file the new history is written to before it replaces the log.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "archive_log.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
