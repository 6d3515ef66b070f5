use std::path::PathBuf;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use crate::{config, error::ApiError, types::Token};

/// Seconds before expiry at which a token is refreshed.
const EXPIRY_MARGIN_SECS: u64 = 240;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct TokenManager {
    token: Token,
    token_url: String,
    persist_on_refresh: bool,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager {
            token,
            token_url: config::spotify_apitoken_url(),
            persist_on_refresh: true,
        }
    }

    /// A manager around a fixed access token that is never refreshed or persisted.
    pub fn with_static_token(access_token: impl Into<String>) -> Self {
        TokenManager {
            token: Token {
                access_token: access_token.into(),
                refresh_token: String::new(),
                scope: String::new(),
                expires_in: u64::MAX / 2,
                obtained_at: Utc::now().timestamp() as u64,
            },
            token_url: config::spotify_apitoken_url(),
            persist_on_refresh: false,
        }
    }

    /// Loads the cached token written by `plarchive auth`.
    pub async fn load() -> Result<Self, String> {
        let path = Self::token_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        let token: Token = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self::new(token))
    }

    /// Loads the cached token, falling back to `SPOTIFY_REFRESH_TOKEN` for
    /// headless runs. The fallback token is marked expired so the first
    /// request exchanges it for an access token.
    pub async fn load_or_bootstrap() -> Result<Self, ApiError> {
        match Self::load().await {
            Ok(manager) => Ok(manager),
            Err(cache_err) => {
                let Some(refresh_token) = config::spotify_refresh_token() else {
                    return Err(ApiError::Unauthorized {
                        status: 401,
                        message: format!(
                            "No cached token ({cache_err}) and SPOTIFY_REFRESH_TOKEN is not set. Run plarchive auth"
                        ),
                    });
                };

                let mut manager = Self::new(Token {
                    access_token: String::new(),
                    refresh_token,
                    scope: config::spotify_scope(),
                    expires_in: 0,
                    obtained_at: 0,
                });
                manager.persist_on_refresh = false;
                Ok(manager)
            }
        }
    }

    pub async fn persist(&self) -> Result<(), String> {
        let path = Self::token_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Returns an access token, refreshing it first when it is about to expire.
    ///
    /// A failed refresh is an authorization failure: every later call would
    /// fail the same way.
    pub async fn get_valid_token(&mut self) -> Result<String, ApiError> {
        if self.is_expired() {
            let new_token = self.refresh_token().await?;
            self.token = new_token;
            if self.persist_on_refresh {
                if let Err(e) = self.persist().await {
                    tracing::warn!(error = %e, "failed to persist refreshed token");
                }
            }
        }

        Ok(self.token.access_token.clone())
    }

    fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp() as u64;
        now + EXPIRY_MARGIN_SECS >= self.token.obtained_at.saturating_add(self.token.expires_in)
    }

    async fn refresh_token(&self) -> Result<Token, ApiError> {
        if self.token.refresh_token.is_empty() {
            return Err(ApiError::Unauthorized {
                status: 401,
                message: "Access token expired and no refresh token is available".into(),
            });
        }

        let client_id = config::spotify_client_id().map_err(|e| ApiError::Unauthorized {
            status: 401,
            message: e.to_string(),
        })?;

        let client = Client::new();
        let mut request = client.post(&self.token_url);
        let mut form = vec![
            ("grant_type", "refresh_token".to_string()),
            ("refresh_token", self.token.refresh_token.clone()),
        ];
        match config::spotify_client_secret() {
            Some(secret) => request = request.basic_auth(&client_id, Some(secret)),
            None => form.push(("client_id", client_id)),
        }

        let res = request
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let message = format!(
                "Token refresh failed: {}",
                res.text().await.unwrap_or_default()
            );
            // An invalid or revoked refresh token comes back as 400 invalid_grant.
            return Err(if status.is_client_error() {
                ApiError::Unauthorized {
                    status: status.as_u16(),
                    message,
                }
            } else {
                ApiError::from_status(status, message)
            });
        }

        let json: TokenResponse = res.json().await?;
        tracing::debug!("access token refreshed");

        Ok(Token {
            access_token: json.access_token,
            // Spotify omits the refresh token when it is not rotated.
            refresh_token: json
                .refresh_token
                .unwrap_or_else(|| self.token.refresh_token.clone()),
            scope: json.scope.unwrap_or_else(|| self.token.scope.clone()),
            expires_in: json.expires_in.unwrap_or(3600),
            obtained_at: Utc::now().timestamp() as u64,
        })
    }

    fn token_path() -> PathBuf {
        let mut path = config::data_dir();
        path.push("cache/token.json");
        path
    }
}
