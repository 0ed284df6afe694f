use std::time::Duration;

use crate::types::StickerRef;

/// The public CDN serving sticker packs.
pub const DEFAULT_CDN_URL: &str = "https://cdn-ca.signal.org";

/// Default per-request timeout of [`crate::HttpTransport`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of retries of [`crate::HttpTransport`] (total attempts = retries + 1).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Client configuration.
///
/// Only the CDN location affects the core pipeline; timeout and retries are consumed by the
/// HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    cdn_base_url: String,
    timeout: Duration,
    max_retries: u32,
    allow_insecure_http: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cdn_base_url: DEFAULT_CDN_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            allow_insecure_http: false,
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at a different CDN (mirrors, test servers).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self::default().base_url(base_url)
    }

    /// Sets the CDN base URL. A trailing `/` is ignored.
    #[must_use]
    pub fn base_url(mut self, base_url: &str) -> Self {
        self.cdn_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of retries for transient transport failures.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Allows plain `http://` URLs. Only meant for local test servers.
    #[must_use]
    pub const fn allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }

    /// The CDN base URL, without trailing `/`.
    #[must_use]
    pub fn cdn_base_url(&self) -> &str {
        &self.cdn_base_url
    }

    /// The per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// The number of retries for transient transport failures.
    #[must_use]
    pub const fn retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether plain `http://` URLs may be fetched.
    #[must_use]
    pub const fn insecure_http_allowed(&self) -> bool {
        self.allow_insecure_http
    }

    /// URL builder for this configuration.
    #[must_use]
    pub fn endpoints(&self) -> CdnEndpoints {
        CdnEndpoints {
            base_url: self.cdn_base_url.clone(),
        }
    }
}

/// Builds CDN URLs for manifests and sticker images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnEndpoints {
    base_url: String,
}

impl CdnEndpoints {
    /// `{base}/stickers/{pack_id}/manifest.proto`
    #[must_use]
    pub fn manifest_url(&self, pack_id: &str) -> String {
        format!("{}/stickers/{pack_id}/manifest.proto", self.base_url)
    }

    /// `{base}/stickers/{pack_id}/full/{sticker}`, where `sticker` is an id or `cover`.
    #[must_use]
    pub fn asset_url(&self, pack_id: &str, sticker: StickerRef) -> String {
        format!("{}/stickers/{pack_id}/full/{sticker}", self.base_url)
    }
}
