//! # API Module
//!
//! HTTP endpoints served by the short-lived local server that `plarchive auth`
//! starts while the browser completes the Spotify authorization.
//!
//! - [`callback`] - receives the authorization code, exchanges it together with
//!   the PKCE verifier for a token and hands the token to the waiting flow.
//! - [`health`] - reports status and version.
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use plarchive::api::{callback, health};
//!
//! let app = Router::new()
//!     .route("/callback", get(callback))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

pub use callback::callback;
pub use health::health;
