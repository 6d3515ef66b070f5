use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::{sync::Mutex, time::sleep};

use crate::{
    config,
    error::ApiError,
    management::TokenManager,
    types::{
        AddTrackToPlaylistRequest, AddTrackToPlaylistResponse, CreatePlaylistRequest,
        CreatePlaylistResponse, CurrentUser, Page, Playlist, PlaylistEntry,
    },
};

use super::{MAX_ITEMS_PER_REQUEST, PlaylistApi};

const PLAYLIST_PAGE_LIMIT: &str = "100";
const USER_PLAYLISTS_PAGE_LIMIT: &str = "50";
const URI_FIELDS: &str = "items(track(uri,is_local)),next";

/// Transport-level retry settings.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Longest `Retry-After` delay that is waited out, in seconds.
    pub max_retry_after: u64,
    /// Delay before retrying a 502/503/504.
    pub server_error_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_after: 120,
            server_error_backoff: Duration::from_secs(10),
        }
    }
}

/// [`PlaylistApi`] over the Spotify Web API.
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    tokens: Mutex<TokenManager>,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(tokens: TokenManager) -> Self {
        Self::with_base_url(config::spotify_apiurl(), tokens)
    }

    pub fn with_base_url(api_url: impl Into<String>, tokens: TokenManager) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            tokens: Mutex::new(tokens),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sends a request, retrying rate limits and, for `idempotent` requests,
    /// gateway errors.
    ///
    /// A 429 means the request was rejected, so it is retried for any method.
    /// A 502/503/504 may arrive after the server committed a write, so a POST
    /// is never resent on one.
    ///
    /// `build` is called once per attempt so every retry carries a fresh token.
    async fn send<F>(&self, idempotent: bool, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;

        loop {
            let token = self.tokens.lock().await.get_valid_token().await?;
            let response = build(&self.http).bearer_auth(token).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            let can_retry = attempt < self.retry.max_retries;
            attempt += 1;

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);

                if can_retry && retry_after <= self.retry.max_retry_after {
                    tracing::warn!(retry_after, attempt, "rate limited, waiting");
                    sleep(Duration::from_secs(retry_after)).await;
                    continue;
                }
                return Err(ApiError::RateLimited { retry_after });
            }

            if can_retry
                && idempotent
                && matches!(
                    status,
                    StatusCode::BAD_GATEWAY
                        | StatusCode::SERVICE_UNAVAILABLE
                        | StatusCode::GATEWAY_TIMEOUT
                )
            {
                tracing::warn!(status = status.as_u16(), attempt, "server error, retrying");
                sleep(self.retry.server_error_backoff).await;
                continue;
            }

            let message = error_message(response).await;
            return Err(ApiError::from_status(status, message));
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let response = self.send(true, |http| http.get(url).query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        first_page_url: &str,
        query: &[(&str, &str)],
        cursor: Option<String>,
    ) -> Result<Page<T>, ApiError> {
        match cursor {
            // `next` already carries every query parameter of the listing.
            Some(next) => self.get_json(&next, &[]).await,
            None => self.get_json(first_page_url, query).await,
        }
    }
}

/// Extracts `error.message` from a Spotify error body, falling back to the raw text.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| {
            json.pointer("/error/message")
                .or_else(|| json.get("error_description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            } else {
                body
            }
        })
}

#[async_trait]
impl PlaylistApi for SpotifyClient {
    async fn current_user_id(&self) -> Result<String, ApiError> {
        let url = format!("{}/me", self.api_url);
        let user: CurrentUser = self.get_json(&url, &[]).await?;
        Ok(user.id)
    }

    async fn playlist(&self, playlist_id: &str) -> Result<Playlist, ApiError> {
        let url = format!("{}/playlists/{playlist_id}", self.api_url);
        self.get_json(&url, &[]).await
    }

    async fn playlist_items(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>, ApiError> {
        let url = format!("{}/playlists/{playlist_id}/tracks", self.api_url);
        self.get_page(&url, &[("limit", PLAYLIST_PAGE_LIMIT)], cursor)
            .await
    }

    async fn playlist_uris(
        &self,
        playlist_id: &str,
        cursor: Option<String>,
    ) -> Result<Page<PlaylistEntry>, ApiError> {
        let url = format!("{}/playlists/{playlist_id}/tracks", self.api_url);
        self.get_page(
            &url,
            &[("fields", URI_FIELDS), ("limit", PLAYLIST_PAGE_LIMIT)],
            cursor,
        )
        .await
    }

    async fn current_user_playlists(
        &self,
        cursor: Option<String>,
    ) -> Result<Page<Playlist>, ApiError> {
        let url = format!("{}/me/playlists", self.api_url);
        self.get_page(&url, &[("limit", USER_PLAYLISTS_PAGE_LIMIT)], cursor)
            .await
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        request: &CreatePlaylistRequest,
    ) -> Result<CreatePlaylistResponse, ApiError> {
        let url = format!("{}/users/{user_id}/playlists", self.api_url);
        let response = self.send(false, |http| http.post(&url).json(request)).await?;
        response
            .json::<CreatePlaylistResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn add_items(&self, playlist_id: &str, uris: &[String]) -> Result<(), ApiError> {
        if uris.len() > MAX_ITEMS_PER_REQUEST {
            return Err(ApiError::InvalidRequest(format!(
                "{} uris exceed the limit of {MAX_ITEMS_PER_REQUEST} per request",
                uris.len()
            )));
        }
        if uris.is_empty() {
            return Ok(());
        }

        let url = format!("{}/playlists/{playlist_id}/tracks", self.api_url);
        let body = AddTrackToPlaylistRequest {
            uris: uris.to_vec(),
        };
        let response = self.send(false, |http| http.post(&url).json(&body)).await?;
        let snapshot = response
            .json::<AddTrackToPlaylistResponse>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        tracing::debug!(playlist_id, snapshot_id = %snapshot.snapshot_id, count = uris.len(), "items appended");
        Ok(())
    }
}
