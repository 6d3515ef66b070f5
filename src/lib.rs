//! Cumulative playlist archiver for Spotify.
//!
//! For every configured source playlist, plarchive keeps a private
//! "<name> (Cumulative)" playlist in the user's account that collects every
//! track the source has ever contained. Tracks are only appended, never
//! removed, so rotating playlists like weekly mixes keep their history.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints of the local OAuth callback server
//! - `archive` - reconciliation engine, archive lookup, writes and batch runs
//! - `cli` - command implementations used by the binary
//! - `config` - environment variables and archive configuration sources
//! - `error` - error types and the failure taxonomy recorded per playlist
//! - `logging` - `tracing` subscriber setup
//! - `management` - token cache, session history and config file editing
//! - `server` - local HTTP server for OAuth callbacks
//! - `spotify` - the remote playlist API and its HTTP client
//! - `types` - wire types and archive domain types
//! - `utils` - naming, id parsing and PKCE helpers

pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for the CLI glue.
///
/// Library seams return typed errors from [`error`]; this boxed alias is used
/// where several of them meet.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an operator-facing status line marked with a blue `o`.
///
/// Takes the same arguments as `println!`.
///
/// ```ignore
/// info!("Archiving {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line marked with a green check.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line and exits with status 1.
///
/// The expansion diverges, so it can stand in a `match` arm of any type.
/// Commands with their own exit status return it instead of calling this.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a yellow `!` line for problems that do not stop the command.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red `!` line without exiting.
#[macro_export]
macro_rules! failure {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
  })
}
