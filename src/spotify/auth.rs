use std::{sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::{
    config, error,
    management::TokenManager,
    server::start_api_server,
    success,
    types::{PkceToken, Token},
    utils, warning,
};

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    scope: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// How long `auth` waits for the browser round trip.
const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the OAuth 2.0 PKCE authorization flow and caches the resulting token.
///
/// 1. Generates the PKCE code verifier and its SHA256 challenge
/// 2. Starts the local callback server on `SERVER_ADDRESS`
/// 3. Opens the authorization URL in the default browser
/// 4. Waits up to two minutes for the callback to deliver a token
/// 5. Persists the token where [`TokenManager::load`] finds it
///
/// The printed refresh token can be stored as `SPOTIFY_REFRESH_TOKEN` for
/// unattended runs.
///
/// # Errors
///
/// Exits the process when `SPOTIFY_CLIENT_ID` is missing, the flow times out
/// or the token cannot be saved.
pub async fn auth(shared_state: Arc<Mutex<Option<PkceToken>>>) {
    let client_id = match config::spotify_client_id() {
        Ok(id) => id,
        Err(e) => error!("{}", e),
    };

    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);

    let server_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    let auth_url = reqwest::Url::parse_with_params(
        &config::spotify_apiauth_url(),
        &[
            ("client_id", client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", config::spotify_redirect_uri().as_str()),
            ("code_challenge", code_challenge.as_str()),
            ("code_challenge_method", "S256"),
            ("scope", config::spotify_scope().as_str()),
        ],
    );
    let auth_url = match auth_url {
        Ok(url) => url.to_string(),
        Err(e) => error!("Invalid SPOTIFY_API_AUTH_URL: {}", e),
    };

    // The callback may arrive as soon as the browser opens.
    *shared_state.lock().await = Some(PkceToken {
        code_verifier,
        token: None,
    });

    if webbrowser::open(&auth_url).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    match wait_for_token(shared_state).await {
        Some(token) => {
            let refresh_token = token.refresh_token.clone();
            if let Err(e) = TokenManager::new(token).persist().await {
                error!("Failed to save token to cache: {}", e);
            }

            success!("Logged in, token cached for plarchive archive");
            success!(
                "For unattended runs set SPOTIFY_REFRESH_TOKEN={}",
                refresh_token
            );
        }
        None => error!("No authorization received within {} seconds", AUTH_TIMEOUT.as_secs()),
    }
}

/// Polls the shared state until the callback handler stores a token.
async fn wait_for_token(shared_state: Arc<Mutex<Option<PkceToken>>>) -> Option<Token> {
    let poll = async {
        let mut ticker = tokio::time::interval(Duration::from_millis(500));
        loop {
            ticker.tick().await;
            let token = shared_state
                .lock()
                .await
                .as_ref()
                .and_then(|pkce| pkce.token.clone());
            if let Some(token) = token {
                return token;
            }
        }
    };

    tokio::time::timeout(AUTH_TIMEOUT, poll).await.ok()
}

/// Exchanges an authorization code and its PKCE verifier for a token.
pub async fn exchange_code_pkce(code: &str, verifier: &str) -> Result<Token, String> {
    let client_id = config::spotify_client_id().map_err(|e| e.to_string())?;
    let redirect_uri = config::spotify_redirect_uri();

    let client = Client::new();
    let res = client
        .post(config::spotify_apitoken_url())
        .form(&[
            ("grant_type", "authorization_code"),
            ("client_id", client_id.as_str()),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        return Err(format!("token endpoint returned {status}: {body}"));
    }

    let json: CodeExchangeResponse = res.json().await.map_err(|e| e.to_string())?;

    Ok(Token {
        access_token: json.access_token,
        refresh_token: json.refresh_token,
        scope: json.scope,
        expires_in: json.expires_in,
        obtained_at: Utc::now().timestamp() as u64,
    })
}
