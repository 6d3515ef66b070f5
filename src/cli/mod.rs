//! # CLI Module
//!
//! Command implementations behind the `plarchive` binary. Each command prints
//! operator-facing lines with the colored macros and returns the process exit
//! status instead of exiting itself.
//!
//! ## Commands
//!
//! - [`archive`] - reconcile every configured playlist with its archive and
//!   append the session to the archive log
//! - [`auth`] - OAuth PKCE login; caches the token used by `archive`
//! - [`config_add`], [`config_remove`], [`config_list`] - edit the playlist
//!   configuration file
//! - [`show_log`] - table of past archive sessions
//!
//! ## Exit Status
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | every playlist succeeded                        |
//! | 1    | at least one playlist failed                    |
//! | 2    | configuration or validation error, nothing ran  |
//! | 3    | credentials missing or rejected                 |
//! | 130  | interrupted before the list was finished        |
//!
//! ## Usage
//!
//! ```bash
//! plarchive auth
//! plarchive config add https://open.spotify.com/playlist/<id> --name "My Mix"
//! plarchive archive --config playlists_config.json
//! plarchive log --last 5
//! ```

mod archive;
mod auth;
mod config;
mod log;

pub use archive::{ArchiveArgs, EXIT_AUTH, EXIT_CONFIG, archive, describe_result};
pub use auth::auth;
pub use config::{DEFAULT_CONFIG_FILE, config_add, config_list, config_list_remote, config_remove};
pub use log::show_log;
