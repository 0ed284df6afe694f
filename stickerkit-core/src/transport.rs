use async_trait::async_trait;

use crate::error::StickerKitResult;

/// Fetches raw bytes from the CDN.
///
/// The core applies no retry policy of its own; implementations decide whether and how to
/// retry. Errors should be [`crate::StickerKitError::NetworkError`] so callers can tell
/// transport failures from decryption failures.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs a GET request and returns the response body.
    async fn fetch(&self, url: &str) -> StickerKitResult<Vec<u8>>;
}
