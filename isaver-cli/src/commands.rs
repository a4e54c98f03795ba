//! CLI command implementations

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Subcommand, ValueEnum};
use isaver_core::tracing_setup::init_tracing;
use isaver_core::{IsaverConfig, RuntimeMode, SourceUrl, YtDlpProvider, fetch};
use tracing::Level;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the download server
    Server {
        /// Address to bind to
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: SocketAddr,
        /// Use simulated collaborators for offline development
        #[arg(long)]
        demo: bool,
        /// Console log level
        #[arg(long, value_enum, default_value = "info")]
        log_level: LogLevel,
        /// Override the yt-dlp binary path
        #[arg(long)]
        ytdlp_path: Option<PathBuf>,
        /// Override the ffmpeg binary path
        #[arg(long)]
        ffmpeg_path: Option<PathBuf>,
    },
    /// Probe a source URL and print its selectable resolutions
    Resolutions {
        /// Video URL to inspect
        url: String,
    },
}

/// Console log levels for user control
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_tracing_level(self) -> Level {
        match self {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Server {
            bind,
            demo,
            log_level,
            ytdlp_path,
            ffmpeg_path,
        } => {
            init_tracing(log_level.as_tracing_level(), None)?;

            let mut config = IsaverConfig::from_env();
            if let Some(path) = ytdlp_path {
                config.fetch.ytdlp_path = path;
            }
            if let Some(path) = ffmpeg_path {
                config.mux.ffmpeg_path = path;
            }

            let mode = if demo {
                RuntimeMode::Development
            } else {
                RuntimeMode::Production
            };

            isaver_web::run_server(config, mode, bind).await
        }
        Commands::Resolutions { url } => list_resolutions(url).await,
    }
}

/// Probe a source and print its quality tiers, highest first.
async fn list_resolutions(url: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = IsaverConfig::from_env();
    let source = SourceUrl::parse(&url)?;
    let provider = YtDlpProvider::new(config.fetch.clone(), &config.network)?;

    let resolutions = fetch::list_resolutions(&provider, &source, &config.fetch).await?;
    if resolutions.is_empty() {
        println!("No downloadable video streams found");
    } else {
        for height in resolutions {
            println!("{height}p");
        }
    }

    Ok(())
}
