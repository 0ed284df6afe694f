use std::fmt;
use std::sync::Arc;

use crate::cache::ResponseCache;
use crate::config::{CdnEndpoints, ClientConfig};
use crate::container;
use crate::crypto::{CipherBackend, RustCryptoBackend};
use crate::error::{Stage, StickerKitError, StickerKitResult};
use crate::http_request::HttpTransport;
use crate::manifest::Manifest;
use crate::transport::Transport;
use crate::types::{Asset, AssetFormat, StickerRef, DATA_URI_PREFIX};

/// Cache key of a decoded manifest.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ManifestKey {
    pack_id: String,
    pack_key: String,
}

impl fmt::Debug for ManifestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestKey")
            .field("pack_id", &self.pack_id)
            .field("pack_key", &"[REDACTED]")
            .finish()
    }
}

/// Cache key of a decrypted sticker image.
#[derive(Clone, PartialEq, Eq, Hash)]
struct AssetKey {
    pack_id: String,
    pack_key: String,
    sticker: StickerRef,
}

impl fmt::Debug for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetKey")
            .field("pack_id", &self.pack_id)
            .field("pack_key", &"[REDACTED]")
            .field("sticker", &self.sticker)
            .finish()
    }
}

/// Canonical form of a pack key: hex digits are case-insensitive and surrounding whitespace
/// is not part of the key.
fn normalize_pack_key(pack_key: &str) -> String {
    pack_key.trim().to_ascii_lowercase()
}

/// Fetches, verifies and decrypts sticker packs from the CDN.
///
/// Every manifest and every sticker image is fetched at most once per service instance:
/// concurrent requests for the same pack share one download, and both successes and failures
/// are kept for the lifetime of the service. Create a new service to start from a clean slate.
///
/// # Examples
///
/// ```no_run
/// use stickerkit_core::{AssetFormat, ClientConfig, StickerPackService, StickerRef};
///
/// # async fn example() -> stickerkit_core::StickerKitResult<()> {
/// let service = StickerPackService::new(&ClientConfig::default());
/// let pack_id = "9acc9e8aba563d26a4994e69263e3b25";
/// let pack_key = "5a6dff3948c28efb9b7aaf93ecc375c69fc316e78077ed26867a14d10a0f6a12";
///
/// let manifest = service.get_pack_manifest(pack_id, pack_key).await?;
/// let cover = service
///     .get_asset(pack_id, pack_key, StickerRef::Cover, AssetFormat::DataUri)
///     .await?;
/// println!("{} by {}: {:?}", manifest.title, manifest.author, cover.as_data_uri());
/// # Ok(())
/// # }
/// ```
pub struct StickerPackService {
    endpoints: CdnEndpoints,
    transport: Arc<dyn Transport>,
    cipher: Arc<dyn CipherBackend>,
    manifests: ResponseCache<ManifestKey, Arc<Manifest>>,
    assets: ResponseCache<AssetKey, Arc<[u8]>>,
}

impl StickerPackService {
    /// Creates a service fetching over HTTPS with the pure-Rust cipher backend.
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_backends(
            config,
            Arc::new(HttpTransport::new(config)),
            Arc::new(RustCryptoBackend),
        )
    }

    /// Creates a service with a custom transport and cipher backend.
    #[must_use]
    pub fn with_backends(
        config: &ClientConfig,
        transport: Arc<dyn Transport>,
        cipher: Arc<dyn CipherBackend>,
    ) -> Self {
        Self {
            endpoints: config.endpoints(),
            transport,
            cipher,
            manifests: ResponseCache::new(),
            assets: ResponseCache::new(),
        }
    }

    /// Returns the decoded manifest of a pack.
    ///
    /// # Errors
    ///
    /// - [`Stage::ManifestFetch`] wrapping the transport error if the download fails.
    /// - [`Stage::ManifestDecode`] wrapping [`StickerKitError::KeyDerivation`],
    ///   [`StickerKitError::Integrity`], [`StickerKitError::MalformedContainer`] or
    ///   [`StickerKitError::ManifestDecode`] if the manifest cannot be opened or parsed.
    ///
    /// A failure is cached: later calls for the same pack and key return it without fetching.
    pub async fn get_pack_manifest(
        &self,
        pack_id: &str,
        pack_key: &str,
    ) -> StickerKitResult<Arc<Manifest>> {
        let pack_key = normalize_pack_key(pack_key);
        let key = ManifestKey {
            pack_id: pack_id.to_string(),
            pack_key: pack_key.clone(),
        };
        let url = self.endpoints.manifest_url(pack_id);
        let transport = Arc::clone(&self.transport);
        let cipher = Arc::clone(&self.cipher);
        let pack_id = pack_id.to_string();

        self.manifests
            .get_or_compute(key, move || async move {
                log::debug!("fetching manifest of pack {pack_id}");
                let raw = transport
                    .fetch(&url)
                    .await
                    .map_err(|err| err.in_stage(Stage::ManifestFetch))?;

                let manifest = container::open(cipher.as_ref(), &pack_key, &raw)
                    .and_then(|plaintext| Manifest::decode(&plaintext))
                    .map_err(|err| err.in_stage(Stage::ManifestDecode))?;
                log::debug!(
                    "decoded manifest of pack {pack_id} with {} stickers",
                    manifest.stickers.len()
                );
                Ok(Arc::new(manifest))
            })
            .await
    }

    /// Returns a decrypted sticker image, or the pack's cover.
    ///
    /// Only the decrypted bytes are cached; [`AssetFormat::DataUri`] re-encodes them on every
    /// call.
    ///
    /// # Errors
    ///
    /// - [`Stage::AssetFetch`] wrapping the transport error if the download fails.
    /// - [`Stage::AssetDecrypt`] wrapping [`StickerKitError::KeyDerivation`],
    ///   [`StickerKitError::Integrity`] or [`StickerKitError::MalformedContainer`] if the image
    ///   cannot be opened.
    pub async fn get_asset(
        &self,
        pack_id: &str,
        pack_key: &str,
        sticker: StickerRef,
        format: AssetFormat,
    ) -> StickerKitResult<Asset> {
        Ok(match format {
            AssetFormat::Raw => Asset::Raw(self.raw_asset(pack_id, pack_key, sticker).await?),
            AssetFormat::DataUri => {
                Asset::DataUri(self.asset_data_uri(pack_id, pack_key, sticker).await?)
            }
        })
    }

    /// Returns the emoji associated with a sticker of a pack.
    ///
    /// The cover is not searched; only the manifest's sticker list is.
    ///
    /// # Errors
    ///
    /// Any error of [`Self::get_pack_manifest`], or [`StickerKitError::StickerNotFound`] if the
    /// manifest has no sticker with `sticker_id`.
    pub async fn get_emoji(
        &self,
        pack_id: &str,
        pack_key: &str,
        sticker_id: u32,
    ) -> StickerKitResult<String> {
        let manifest = self.get_pack_manifest(pack_id, pack_key).await?;
        manifest
            .sticker(sticker_id)
            .map(|sticker| sticker.emoji.clone())
            .ok_or_else(|| StickerKitError::StickerNotFound {
                pack_id: pack_id.to_string(),
                sticker_id,
            })
    }

    /// Number of manifests requested so far, in any state.
    #[must_use]
    pub fn cached_manifests(&self) -> usize {
        self.manifests.len()
    }

    /// Number of sticker images requested so far, in any state.
    #[must_use]
    pub fn cached_assets(&self) -> usize {
        self.assets.len()
    }

    /// The decrypted bytes behind [`AssetFormat::Raw`].
    pub(crate) async fn raw_asset(
        &self,
        pack_id: &str,
        pack_key: &str,
        sticker: StickerRef,
    ) -> StickerKitResult<Arc<[u8]>> {
        let pack_key = normalize_pack_key(pack_key);
        let key = AssetKey {
            pack_id: pack_id.to_string(),
            pack_key: pack_key.clone(),
            sticker,
        };
        let url = self.endpoints.asset_url(pack_id, sticker);
        let transport = Arc::clone(&self.transport);
        let cipher = Arc::clone(&self.cipher);
        let pack_id = pack_id.to_string();

        self.assets
            .get_or_compute(key, move || async move {
                log::debug!("fetching sticker {sticker} of pack {pack_id}");
                let raw = transport
                    .fetch(&url)
                    .await
                    .map_err(|err| err.in_stage(Stage::AssetFetch))?;

                let image = container::open(cipher.as_ref(), &pack_key, &raw)
                    .map_err(|err| err.in_stage(Stage::AssetDecrypt))?;
                Ok(Arc::from(image))
            })
            .await
    }

    /// The URI behind [`AssetFormat::DataUri`], encoded from the cached bytes.
    pub(crate) async fn asset_data_uri(
        &self,
        pack_id: &str,
        pack_key: &str,
        sticker: StickerRef,
    ) -> StickerKitResult<String> {
        let bytes = self.raw_asset(pack_id, pack_key, sticker).await?;
        Ok(format!(
            "{DATA_URI_PREFIX}{}",
            self.cipher.base64_encode(&bytes)
        ))
    }
}

impl fmt::Debug for StickerPackService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StickerPackService")
            .field("endpoints", &self.endpoints)
            .field("manifests", &self.manifests)
            .field("assets", &self.assets)
            .finish_non_exhaustive()
    }
}
