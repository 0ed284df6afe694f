#![allow(dead_code, missing_docs)]

//! Common test utilities shared across integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use aes::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
use async_trait::async_trait;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use prost::Message;
use sha2::Sha256;
use stickerkit_core::{StickerKitError, StickerKitResult, Transport};

pub const BASE_URL: &str = "https://cdn.test";
pub const PACK_ID: &str = "9acc9e8aba563d26a4994e69263e3b25";
pub const PACK_KEY: &str = "5a6dff3948c28efb9b7aaf93ecc375c69fc316e78077ed26867a14d10a0f6a12";
pub const OTHER_PACK_KEY: &str =
    "c1ffcc0f9b4c9a6c7f2ad1c3a0cf1e4e3b17b0b3e5a9d1e1b43c0d2f8e6a7b90";

/// Derives the cipher and MAC keys exactly like the CDN's packer.
fn pack_keys(pack_key: &str) -> ([u8; 32], [u8; 32]) {
    let secret = hex::decode(pack_key).expect("hex pack key");
    let mut okm = [0u8; 64];
    Hkdf::<Sha256>::new(Some(&[0u8; 32][..]), &secret)
        .expand(b"Sticker Pack", &mut okm)
        .expect("64 bytes of HKDF output");

    let mut cipher_key = [0u8; 32];
    let mut mac_key = [0u8; 32];
    cipher_key.copy_from_slice(&okm[..32]);
    mac_key.copy_from_slice(&okm[32..]);
    (cipher_key, mac_key)
}

/// `IV || AES-256-CBC(plaintext) || HMAC-SHA256(IV || body)`
pub fn seal(pack_key: &str, plaintext: &[u8]) -> Vec<u8> {
    let (cipher_key, mac_key) = pack_keys(pack_key);
    let iv = [0x5au8; 16];

    let body = cbc::Encryptor::<aes::Aes256>::new_from_slices(&cipher_key, &iv)
        .expect("key and iv sizes")
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut container = iv.to_vec();
    container.extend_from_slice(&body);
    let mut mac = Hmac::<Sha256>::new_from_slice(&mac_key).expect("any key size");
    mac.update(&container);
    container.extend_from_slice(&mac.finalize().into_bytes());
    container
}

#[derive(Clone, PartialEq, Message)]
struct StickerMessage {
    #[prost(uint32, tag = "1")]
    id: u32,
    #[prost(string, tag = "2")]
    emoji: String,
}

#[derive(Clone, PartialEq, Message)]
struct PackMessage {
    #[prost(string, tag = "1")]
    title: String,
    #[prost(string, tag = "2")]
    author: String,
    #[prost(message, optional, tag = "3")]
    cover: Option<StickerMessage>,
    #[prost(message, repeated, tag = "4")]
    stickers: Vec<StickerMessage>,
}

/// Encodes a `Pack` message with the given stickers, the first one doubling as the cover.
pub fn manifest_bytes(title: &str, author: &str, stickers: &[(u32, &str)]) -> Vec<u8> {
    let stickers: Vec<_> = stickers
        .iter()
        .map(|(id, emoji)| StickerMessage {
            id: *id,
            emoji: (*emoji).to_string(),
        })
        .collect();
    PackMessage {
        title: title.to_string(),
        author: author.to_string(),
        cover: stickers.first().cloned(),
        stickers,
    }
    .encode_to_vec()
}

pub fn manifest_path(pack_id: &str) -> String {
    format!("/stickers/{pack_id}/manifest.proto")
}

pub fn asset_path(pack_id: &str, sticker: &str) -> String {
    format!("/stickers/{pack_id}/full/{sticker}")
}

/// In-memory CDN counting fetches per URL.
///
/// Each fetch yields to the scheduler a few times before answering, so concurrent callers
/// overlap with an in-flight request.
#[derive(Default)]
pub struct FakeCdn {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl FakeCdn {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, path: &str, body: Vec<u8>) {
        self.files
            .lock()
            .unwrap()
            .insert(format!("{BASE_URL}{path}"), body);
    }

    pub fn fetches_of(&self, path: &str) -> usize {
        self.fetches
            .lock()
            .unwrap()
            .get(&format!("{BASE_URL}{path}"))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl Transport for FakeCdn {
    async fn fetch(&self, url: &str) -> StickerKitResult<Vec<u8>> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        for _ in 0..3 {
            tokio::task::yield_now().await;
        }

        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| StickerKitError::NetworkError {
                url: url.to_string(),
                status: Some(404),
                error: "request failed with status 404 Not Found".to_string(),
            })
    }
}
