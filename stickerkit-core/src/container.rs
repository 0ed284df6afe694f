//! Authenticated container opening.
//!
//! Wire layout of every manifest and sticker image served by the CDN:
//!
//! ```text
//! +----------+----------------------------+-----------------------------+
//! | IV (16)  | AES-256-CBC body (PKCS#7)  | HMAC-SHA256(IV || body) (32)|
//! +----------+----------------------------+-----------------------------+
//! ```
//!
//! The MAC is always checked before any decryption happens.

use crate::crypto::{derive_keys, CipherBackend, SharedSecret, IV_SIZE, MAC_SIZE};
use crate::error::{StickerKitError, StickerKitResult};

/// Smallest well-formed container: an IV and a MAC around an empty body.
pub const MIN_CONTAINER_LEN: usize = IV_SIZE + MAC_SIZE;

/// A borrowed view over the three parts of a container.
#[derive(Debug, Clone, Copy)]
pub struct ContainerParts<'a> {
    /// Initialization vector.
    pub iv: &'a [u8; IV_SIZE],
    /// AES-256-CBC ciphertext.
    pub body: &'a [u8],
    /// The bytes covered by the MAC (IV followed by body).
    pub authenticated: &'a [u8],
    /// HMAC-SHA256 tag.
    pub mac: &'a [u8],
}

impl<'a> ContainerParts<'a> {
    /// Splits `raw` into IV, body and MAC.
    ///
    /// # Errors
    ///
    /// Returns [`StickerKitError::MalformedContainer`] if `raw` is shorter than
    /// [`MIN_CONTAINER_LEN`].
    pub fn split(raw: &'a [u8]) -> StickerKitResult<Self> {
        if raw.len() < MIN_CONTAINER_LEN {
            return Err(StickerKitError::MalformedContainer {
                reason: format!(
                    "container is {} bytes, expected at least {MIN_CONTAINER_LEN}",
                    raw.len()
                ),
            });
        }

        let (authenticated, mac) = raw.split_at(raw.len() - MAC_SIZE);
        let (iv, body) = authenticated.split_at(IV_SIZE);
        let iv = iv
            .try_into()
            .map_err(|_| StickerKitError::MalformedContainer {
                reason: "invalid IV length".to_string(),
            })?;

        Ok(Self {
            iv,
            body,
            authenticated,
            mac,
        })
    }
}

/// Verifies and decrypts a container with a pack key in hex form.
///
/// # Errors
///
/// - [`StickerKitError::MalformedContainer`] if the container is too short or the padding is
///   invalid after a successful MAC check.
/// - [`StickerKitError::KeyDerivation`] if `pack_key` is not a valid pack key.
/// - [`StickerKitError::Integrity`] if the MAC does not match. Nothing is decrypted in that case.
pub fn open(
    backend: &dyn CipherBackend,
    pack_key: &str,
    raw: &[u8],
) -> StickerKitResult<Vec<u8>> {
    let parts = ContainerParts::split(raw)?;
    let secret = SharedSecret::from_hex(pack_key)?;
    open_parts(backend, &secret, parts)
}

/// Verifies and decrypts a container with an already decoded secret.
///
/// # Errors
///
/// See [`open`].
pub fn open_with_secret(
    backend: &dyn CipherBackend,
    secret: &SharedSecret,
    raw: &[u8],
) -> StickerKitResult<Vec<u8>> {
    open_parts(backend, secret, ContainerParts::split(raw)?)
}

fn open_parts(
    backend: &dyn CipherBackend,
    secret: &SharedSecret,
    parts: ContainerParts<'_>,
) -> StickerKitResult<Vec<u8>> {
    let keys = derive_keys(backend, secret)?;

    if !backend.hmac_sha256_verify(keys.mac_key(), parts.authenticated, parts.mac) {
        return Err(StickerKitError::Integrity);
    }

    backend.aes256_cbc_decrypt(keys.cipher_key(), parts.iv, parts.body)
}


#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use test_case::test_case;

    use super::test_support::{seal, PACK_KEY};
    use super::*;
    use crate::crypto::{RustCryptoBackend, IV_SIZE, KEY_SIZE};

    /// Delegates to [`RustCryptoBackend`] and counts decryptions.
    #[derive(Default)]
    struct SpyBackend {
        decryptions: AtomicUsize,
    }

    impl CipherBackend for SpyBackend {
        fn hkdf_sha256(
            &self,
            ikm: &[u8],
            salt: &[u8],
            info: &[u8],
            okm: &mut [u8],
        ) -> StickerKitResult<()> {
            RustCryptoBackend.hkdf_sha256(ikm, salt, info, okm)
        }

        fn hmac_sha256_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
            RustCryptoBackend.hmac_sha256_verify(key, data, tag)
        }

        fn aes256_cbc_decrypt(
            &self,
            key: &[u8; KEY_SIZE],
            iv: &[u8; IV_SIZE],
            ciphertext: &[u8],
        ) -> StickerKitResult<Vec<u8>> {
            self.decryptions.fetch_add(1, Ordering::SeqCst);
            RustCryptoBackend.aes256_cbc_decrypt(key, iv, ciphertext)
        }

        fn base64_encode(&self, bytes: &[u8]) -> String {
            RustCryptoBackend.base64_encode(bytes)
        }
    }

    #[test]
    fn test_open_round_trip() {
        let plaintext = b"RIFF\x00\x00\x00\x00WEBPVP8 sticker image bytes";
        let raw = seal(PACK_KEY, [7u8; 16], plaintext);

        let opened = open(&RustCryptoBackend, PACK_KEY, &raw).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn test_open_empty_plaintext() {
        // A full padding block, so the body is 16 bytes.
        let raw = seal(PACK_KEY, [1u8; 16], b"");
        assert_eq!(raw.len(), MIN_CONTAINER_LEN + 16);
        assert!(open(&RustCryptoBackend, PACK_KEY, &raw).unwrap().is_empty());
    }

    #[test]
    fn test_flipped_mac_byte_never_decrypts() {
        let spy = SpyBackend::default();
        let mut raw = seal(PACK_KEY, [9u8; 16], b"manifest bytes");
        let last = raw.len() - 1;
        raw[last] ^= 0x01;

        let result = open(&spy, PACK_KEY, &raw);

        assert_eq!(result, Err(StickerKitError::Integrity));
        assert_eq!(result.unwrap_err().to_string(), "MAC verification failed");
        assert_eq!(spy.decryptions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_valid_container_decrypts_once() {
        let spy = SpyBackend::default();
        let raw = seal(PACK_KEY, [9u8; 16], b"manifest bytes");

        open(&spy, PACK_KEY, &raw).unwrap();
        assert_eq!(spy.decryptions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tampered_iv_fails_integrity() {
        let mut raw = seal(PACK_KEY, [3u8; 16], b"manifest bytes");
        raw[0] ^= 0x80;
        assert_eq!(
            open(&RustCryptoBackend, PACK_KEY, &raw),
            Err(StickerKitError::Integrity)
        );
    }

    #[test]
    fn test_wrong_key_fails_integrity() {
        let raw = seal(PACK_KEY, [3u8; 16], b"manifest bytes");
        let other_key = "ff".repeat(32);
        assert_eq!(
            open(&RustCryptoBackend, &other_key, &raw),
            Err(StickerKitError::Integrity)
        );
    }

    #[test_case(0 ; "empty")]
    #[test_case(16 ; "iv only")]
    #[test_case(47 ; "one byte short")]
    fn test_short_container_is_malformed(len: usize) {
        let spy = SpyBackend::default();
        let raw = vec![0u8; len];
        assert!(matches!(
            open(&spy, PACK_KEY, &raw),
            Err(StickerKitError::MalformedContainer { .. })
        ));
        assert_eq!(spy.decryptions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_bad_padding_after_valid_mac_is_malformed() {
        // Authentic container whose body is a single block of garbage: the MAC passes, the
        // PKCS#7 padding almost certainly does not. Search a few IVs for one that fails unpadding.
        let secret = SharedSecret::from_hex(PACK_KEY).unwrap();
        let keys = derive_keys(&RustCryptoBackend, &secret).unwrap();

        let outcome = (0u8..=255).find_map(|seed| {
            let mut raw = vec![seed; 16];
            raw.extend_from_slice(&[0xA5; 16]);
            let mut mac =
                <hmac::Hmac<sha2::Sha256> as hmac::Mac>::new_from_slice(keys.mac_key()).unwrap();
            hmac::Mac::update(&mut mac, &raw);
            raw.extend_from_slice(&hmac::Mac::finalize(mac).into_bytes());
            open(&RustCryptoBackend, PACK_KEY, &raw).err()
        });

        assert!(matches!(
            outcome,
            Some(StickerKitError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn test_invalid_pack_key_is_reported() {
        let raw = seal(PACK_KEY, [3u8; 16], b"manifest bytes");
        assert!(matches!(
            open(&RustCryptoBackend, "not-a-key", &raw),
            Err(StickerKitError::KeyDerivation { .. })
        ));
    }

    #[test]
    fn test_open_with_secret() {
        let raw = seal(PACK_KEY, [5u8; 16], b"cover");
        let secret = SharedSecret::from_hex(PACK_KEY).unwrap();
        assert_eq!(
            open_with_secret(&RustCryptoBackend, &secret, &raw).unwrap(),
            b"cover"
        );
    }
}
