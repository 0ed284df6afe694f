//! `stickerkit`, a developer CLI for encrypted sticker packs.
//!
//! # Usage
//!
//! ```bash
//! # Print a pack's manifest as JSON
//! stickerkit manifest <pack-id> <pack-key>
//!
//! # Save a sticker, or print the cover as a data URI
//! stickerkit sticker <pack-id> <pack-key> 3 --out sticker.webp
//! stickerkit sticker <pack-id> <pack-key> cover --format data-uri
//!
//! # Look up the emoji of a sticker
//! stickerkit emoji <pack-id> <pack-key> 3
//! ```

use clap::{Parser, Subcommand};
use stickerkit_core::{AssetFormat, ClientConfig, StickerRef, DEFAULT_CDN_URL};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Fetch and decrypt sticker packs
#[derive(Parser, Debug)]
#[command(name = "stickerkit")]
#[command(about = "Fetch, verify and decrypt sticker packs from the CDN")]
#[command(version)]
struct Cli {
    /// CDN base URL
    #[arg(long, env = "STICKERKIT_CDN_URL", default_value = DEFAULT_CDN_URL, global = true)]
    cdn_url: String,

    /// Retries for transient network failures
    #[arg(long, default_value_t = 3, global = true)]
    retries: u32,

    /// Log level (trace, debug, info, warn, error), overridden by `RUST_LOG`
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the decoded manifest of a pack as JSON
    Manifest {
        /// Pack id (hex)
        pack_id: String,
        /// Pack key (64 hex characters)
        pack_key: String,
    },
    /// Decrypt a sticker image, or the cover
    Sticker {
        /// Pack id (hex)
        pack_id: String,
        /// Pack key (64 hex characters)
        pack_key: String,
        /// Sticker id, or `cover`
        sticker: StickerRef,
        /// Output encoding
        #[arg(long, default_value = "raw")]
        format: AssetFormat,
        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<std::path::PathBuf>,
    },
    /// Print the emoji of a sticker
    Emoji {
        /// Pack id (hex)
        pack_id: String,
        /// Pack key (64 hex characters)
        pack_key: String,
        /// Sticker id
        sticker_id: u32,
    },
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig::with_base_url(&self.cdn_url).max_retries(self.retries)
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tracing::debug!("using CDN at {}", cli.cdn_url);
    commands::run(&cli.config(), cli.command).await
}
