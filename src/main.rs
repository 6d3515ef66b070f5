use std::path::PathBuf;

use clap::{
    ArgAction, Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tokio::sync::watch;

use plarchive::{cli, config, error, logging};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Diagnostic log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[clap(long, global = true, default_value = "warn", env = "PLARCHIVE_LOG_LEVEL")]
    log_level: String,

    /// Emit diagnostics as JSON lines
    #[clap(long, global = true)]
    log_json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Archive all configured playlists
    Archive(ArchiveOptions),

    /// Authorize with Spotify API
    Auth,

    /// Edit the playlist configuration file
    Config(ConfigOptions),

    /// Show past archive sessions
    Log(LogOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Args, Debug, Clone)]
pub struct ArchiveOptions {
    /// JSON file with playlists to archive
    #[clap(long)]
    config: Option<PathBuf>,

    /// Playlist id, URL or URI; can be repeated
    #[clap(long = "playlist", action = ArgAction::Append, num_args = 1)]
    playlists: Vec<String>,

    /// Archive log file (defaults to ARCHIVE_LOG_FILE or archive_log.json)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigOptions {
    /// Configuration file to edit
    #[clap(long, global = true, default_value = cli::DEFAULT_CONFIG_FILE)]
    file: PathBuf,

    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Add a playlist by id, URL or URI
    Add {
        playlist: String,

        /// Custom archive name, without the "(Cumulative)" suffix
        #[clap(long)]
        name: Option<String>,

        /// Read the playlist from Spotify before adding it
        #[clap(long)]
        verify: bool,
    },

    /// Remove a playlist
    Remove { playlist: String },

    /// List configured playlists
    List {
        /// Print the configuration as one JSON line for SPOTIFY_PLAYLISTS_CONFIG
        #[clap(long)]
        json: bool,

        /// List the playlists you own on Spotify instead, to pick from
        #[clap(long, conflicts_with = "json")]
        remote: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LogOptions {
    /// Only show the most recent N sessions
    #[clap(long)]
    last: Option<usize>,

    /// Archive log file (defaults to ARCHIVE_LOG_FILE or archive_log.json)
    #[clap(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_level, cli.log_json) {
        error!("{}", e);
    }

    let code = match cli.command {
        Command::Archive(opt) => {
            let args = cli::ArchiveArgs {
                config_file: opt.config,
                playlists: opt.playlists,
                log_file: opt.log_file,
            };
            cli::archive(args, shutdown_signal()).await
        }
        Command::Auth => {
            cli::auth().await;
            0
        }
        Command::Config(opt) => match opt.command {
            ConfigSubcommand::Add {
                playlist,
                name,
                verify,
            } => cli::config_add(&opt.file, &playlist, name, verify).await,
            ConfigSubcommand::Remove { playlist } => cli::config_remove(&opt.file, &playlist).await,
            ConfigSubcommand::List { remote: true, .. } => cli::config_list_remote(&opt.file).await,
            ConfigSubcommand::List { json, .. } => cli::config_list(&opt.file, json).await,
        },
        Command::Log(opt) => cli::show_log(opt.log_file, opt.last).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
            0
        }
    };

    std::process::exit(code);
}

/// Flips to `true` on Ctrl-C or SIGTERM. The run finishes the playlist in
/// progress and stops before the next one.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("shutdown signal received");
        plarchive::warning!("Shutdown requested, finishing the current playlist...");
        let _ = tx.send(true);
    });

    rx
}
