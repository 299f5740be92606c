//! Catalog CLI - command-line front end for the catalog client

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-cli")]
#[command(about = "Command-line client for the music catalog API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate and store a token
    Login {
        /// Run the full authorization flow even if a token is stored
        #[arg(short, long)]
        force: bool,
    },

    /// Forget the stored token
    Logout,

    /// Show current authentication status
    Status,

    /// Show one track
    Track {
        id: String,

        /// Market (ISO 3166-1 alpha-2) for track relinking
        #[arg(short, long)]
        market: Option<String>,
    },

    /// Show several tracks; any number of ids
    Tracks {
        ids: Vec<String>,
    },

    /// List every track of an album
    AlbumTracks {
        id: String,

        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// List followed artists
    Followed {
        /// Maximum number of pages to fetch
        #[arg(short, long, default_value = "1")]
        pages: usize,
    },

    /// Show a playlist and its items
    Playlist {
        id: String,

        /// Fetch every page of items instead of the first
        #[arg(short, long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login { force } => {
            tracing::info!("Starting authentication flow...");
            commands::login(force).await?;
        }
        Commands::Logout => {
            commands::logout()?;
        }
        Commands::Status => {
            commands::status()?;
        }
        Commands::Track { id, market } => {
            commands::show_track(&id, market.as_deref()).await?;
        }
        Commands::Tracks { ids } => {
            commands::show_tracks(&ids).await?;
        }
        Commands::AlbumTracks { id, limit } => {
            commands::album_tracks(&id, limit).await?;
        }
        Commands::Followed { pages } => {
            commands::followed(pages).await?;
        }
        Commands::Playlist { id, all } => {
            commands::show_playlist(&id, all).await?;
        }
    }

    Ok(())
}
