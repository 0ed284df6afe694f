//! Cryptographic primitives for sticker pack containers.
//!
//! The core pipeline only talks to a [`CipherBackend`], so the primitives can be swapped per
//! platform (e.g. a host-provided implementation on mobile) without touching the container or
//! key derivation logic. [`RustCryptoBackend`] is the pure-Rust default.

mod backend;
mod derivation;

pub use backend::RustCryptoBackend;
pub use derivation::{derive_keys, DerivedKeyPair, SharedSecret, PACK_KEY_LEN};

use crate::error::StickerKitResult;

/// Size of the AES-256 key and of the HMAC-SHA256 key, in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of the AES-CBC initialization vector, in bytes.
pub const IV_SIZE: usize = 16;

/// Size of an HMAC-SHA256 tag, in bytes.
pub const MAC_SIZE: usize = 32;

/// The primitives needed to open a sticker pack container.
///
/// Implementations must be stateless with respect to the inputs: every method is called with
/// all of the material it needs, and may be called concurrently from several tasks.
pub trait CipherBackend: Send + Sync {
    /// Fills `okm` with HKDF-SHA256 output for the given input key material, salt and info.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StickerKitError::KeyDerivation`] if `okm` is longer than HKDF-SHA256
    /// can produce.
    fn hkdf_sha256(
        &self,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        okm: &mut [u8],
    ) -> StickerKitResult<()>;

    /// Checks `tag` against HMAC-SHA256(`key`, `data`) in constant time.
    fn hmac_sha256_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> bool;

    /// Decrypts an AES-256-CBC body and strips its PKCS#7 padding.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StickerKitError::MalformedContainer`] if the body is not a whole number
    /// of blocks or the padding is invalid.
    fn aes256_cbc_decrypt(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> StickerKitResult<Vec<u8>>;

    /// Standard (padded) base64 encoding, used for data URIs.
    fn base64_encode(&self, bytes: &[u8]) -> String;
}
