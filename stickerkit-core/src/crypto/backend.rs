use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD, Engine};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{CipherBackend, IV_SIZE, KEY_SIZE};
use crate::error::{StickerKitError, StickerKitResult};

type HmacSha256 = Hmac<Sha256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// [`CipherBackend`] built on the `RustCrypto` crates. Works on every target, including wasm.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCryptoBackend;

impl CipherBackend for RustCryptoBackend {
    fn hkdf_sha256(
        &self,
        ikm: &[u8],
        salt: &[u8],
        info: &[u8],
        okm: &mut [u8],
    ) -> StickerKitResult<()> {
        let len = okm.len();
        Hkdf::<Sha256>::new(Some(salt), ikm)
            .expand(info, okm)
            .map_err(|_| StickerKitError::KeyDerivation {
                reason: format!("cannot expand HKDF-SHA256 to {len} bytes"),
            })
    }

    fn hmac_sha256_verify(&self, key: &[u8], data: &[u8], tag: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
            return false;
        };
        mac.update(data);
        let expected = mac.finalize().into_bytes();
        expected.as_slice().ct_eq(tag).into()
    }

    fn aes256_cbc_decrypt(
        &self,
        key: &[u8; KEY_SIZE],
        iv: &[u8; IV_SIZE],
        ciphertext: &[u8],
    ) -> StickerKitResult<Vec<u8>> {
        let decryptor = Aes256CbcDec::new_from_slices(key, iv).map_err(|_| {
            StickerKitError::MalformedContainer {
                reason: "invalid AES-256-CBC key or IV length".to_string(),
            }
        })?;
        decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| StickerKitError::MalformedContainer {
                reason: "AES-256-CBC decryption failed: invalid padding".to_string(),
            })
    }

    fn base64_encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 5869, test case 1.
    #[test]
    fn test_hkdf_rfc5869_vector() {
        let ikm = [0x0bu8; 22];
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let mut okm = [0u8; 42];

        RustCryptoBackend
            .hkdf_sha256(&ikm, &salt, &info, &mut okm)
            .unwrap();

        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn test_hkdf_rejects_oversized_output() {
        let mut okm = vec![0u8; 255 * 32 + 1];
        let result = RustCryptoBackend.hkdf_sha256(b"ikm", b"salt", b"info", &mut okm);
        assert!(matches!(result, Err(StickerKitError::KeyDerivation { .. })));
    }

    // RFC 4231, test case 2.
    #[test]
    fn test_hmac_verify() {
        let data = b"what do ya want for nothing?";
        let tag = hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
            .unwrap();
        assert!(RustCryptoBackend.hmac_sha256_verify(b"Jefe", data, &tag));

        let mut wrong = tag.clone();
        wrong[31] ^= 0x01;
        assert!(!RustCryptoBackend.hmac_sha256_verify(b"Jefe", data, &wrong));
        assert!(!RustCryptoBackend.hmac_sha256_verify(b"Jefe", data, &tag[..16]));
    }

    #[test]
    fn test_cbc_rejects_partial_block() {
        let result = RustCryptoBackend.aes256_cbc_decrypt(&[0u8; 32], &[0u8; 16], &[0u8; 17]);
        assert!(matches!(
            result,
            Err(StickerKitError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn test_base64_encode() {
        assert_eq!(RustCryptoBackend.base64_encode(b"webp"), "d2VicA==");
    }
}
