//! Pack key parsing and HKDF key derivation.
//!
//! Every container of a pack is encrypted under keys derived from the same pack key:
//!
//! ```text
//! okm = HKDF-SHA256(ikm = pack_key, salt = 0^32, info = "Sticker Pack", len = 64)
//! cipher_key = okm[0..32]
//! mac_key    = okm[32..64]
//! ```
//!
//! The salt is fixed so any client holding the pack key derives identical keys.

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::{CipherBackend, KEY_SIZE};
use crate::error::{StickerKitError, StickerKitResult};

/// Length of a decoded pack key, in bytes.
pub const PACK_KEY_LEN: usize = 32;

const HKDF_SALT: [u8; 32] = [0u8; 32];
const HKDF_INFO: &[u8] = b"Sticker Pack";

/// The per-pack secret, decoded from its hex form.
///
/// # Security
///
/// - Zeroized on drop.
/// - Never logged; `Debug` is redacted.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; PACK_KEY_LEN]);

impl SharedSecret {
    /// Decodes a hex-encoded pack key.
    ///
    /// # Errors
    ///
    /// Returns [`StickerKitError::KeyDerivation`] if the input is not exactly
    /// `2 * PACK_KEY_LEN` hex digits. The error never echoes the input.
    pub fn from_hex(encoded: &str) -> StickerKitResult<Self> {
        let mut bytes = [0u8; PACK_KEY_LEN];
        hex::decode_to_slice(encoded, &mut bytes).map_err(|err| {
            let reason = match err {
                hex::FromHexError::OddLength => "odd number of hex digits".to_string(),
                hex::FromHexError::InvalidStringLength => format!(
                    "expected {} hex digits, got {}",
                    PACK_KEY_LEN * 2,
                    encoded.len()
                ),
                hex::FromHexError::InvalidHexCharacter { index, .. } => {
                    format!("non-hex character at position {index}")
                }
            };
            StickerKitError::KeyDerivation { reason }
        })?;
        Ok(Self(bytes))
    }

    /// Returns the raw secret bytes. Treat as sensitive material.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PACK_KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedSecret").field(&"[REDACTED]").finish()
    }
}

/// The AES and HMAC keys derived from a [`SharedSecret`]. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeyPair {
    cipher_key: [u8; KEY_SIZE],
    mac_key: [u8; KEY_SIZE],
}

impl DerivedKeyPair {
    /// The AES-256-CBC key.
    #[must_use]
    pub const fn cipher_key(&self) -> &[u8; KEY_SIZE] {
        &self.cipher_key
    }

    /// The HMAC-SHA256 key.
    #[must_use]
    pub const fn mac_key(&self) -> &[u8; KEY_SIZE] {
        &self.mac_key
    }
}

impl std::fmt::Debug for DerivedKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKeyPair")
            .field("cipher_key", &"[REDACTED]")
            .field("mac_key", &"[REDACTED]")
            .finish()
    }
}

/// Derives the container keys for a pack.
///
/// Pure and deterministic: the same secret always yields the same pair.
///
/// # Errors
///
/// Propagates the backend's HKDF failure, which cannot happen for a 64-byte output with a
/// conforming backend.
pub fn derive_keys(
    backend: &dyn CipherBackend,
    secret: &SharedSecret,
) -> StickerKitResult<DerivedKeyPair> {
    let mut okm = Zeroizing::new([0u8; KEY_SIZE * 2]);
    backend.hkdf_sha256(secret.as_bytes(), &HKDF_SALT, HKDF_INFO, &mut okm[..])?;

    let mut pair = DerivedKeyPair {
        cipher_key: [0u8; KEY_SIZE],
        mac_key: [0u8; KEY_SIZE],
    };
    pair.cipher_key.copy_from_slice(&okm[..KEY_SIZE]);
    pair.mac_key.copy_from_slice(&okm[KEY_SIZE..]);
    Ok(pair)
}
