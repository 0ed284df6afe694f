#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
//! `StickerKit` fetches end-to-end encrypted sticker packs from a CDN.
//!
//! Every file a pack consists of (its protobuf manifest and one WebP image per sticker) is
//! served as an `IV || AES-256-CBC || HMAC-SHA256` container. The keys for both primitives are
//! derived with HKDF from the pack key that is shared alongside the pack id. The
//! [`StickerPackService`] downloads, authenticates and decrypts these containers and memoizes
//! the results so every file is fetched at most once per service.

mod cache;
pub use cache::{EntryState, ResponseCache};

mod client;
pub use client::StickerPackService;

mod config;
pub use config::*;

pub mod container;

pub mod crypto;

mod error;
pub use error::*;

mod http_request;
pub use http_request::HttpTransport;

mod manifest;
pub use manifest::{Manifest, Sticker};

mod transport;
pub use transport::Transport;

mod types;
pub use types::*;

/// Forwarding of log records to a host-provided logger.
pub mod logger;

#[cfg(feature = "ffi")]
mod ffi;
#[cfg(feature = "ffi")]
pub use ffi::StickerPackClient;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("stickerkit_core");
