use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wallpaper_rotator::client::Client;
use wallpaper_rotator::config::Config;
use wallpaper_rotator::server::Server;

#[derive(Parser)]
#[command(
    name = "wallpaper-rotator",
    version,
    about = "Rotates the desktop wallpaper from a folder at a fixed interval"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the rotation daemon
    Daemon {
        /// Alternate config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Reload the wallpaper list, optionally from a new folder
    Reload {
        /// Folder to load wallpapers from
        directory: Option<String>,
    },
    /// Switch to the next wallpaper
    Next,
    /// Switch to the previous wallpaper
    Prev,
    /// Start automatic rotation
    Start,
    /// Stop automatic rotation
    Stop,
    /// Set the rotation interval in minutes (1-1440)
    Interval { minutes: u64 },
    /// Show daemon status
    Status {
        /// Print status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Stop the daemon process
    Shutdown,
    /// Write an example config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Daemon { config } => {
            let settings = Config::load_or_default(config.as_deref());
            Server::new(settings, config).run().await
        }
        Command::Reload { directory } => Client::connect().await?.reload(directory).await,
        Command::Next => Client::connect().await?.next().await,
        Command::Prev => Client::connect().await?.previous().await,
        Command::Start => Client::connect().await?.start().await,
        Command::Stop => Client::connect().await?.stop().await,
        Command::Interval { minutes } => Client::connect().await?.set_interval(minutes).await,
        Command::Status { json } => Client::connect().await?.get_status(json).await,
        Command::Shutdown => Client::connect().await?.shutdown().await,
        Command::InitConfig => Config::generate_example(),
    }
}
