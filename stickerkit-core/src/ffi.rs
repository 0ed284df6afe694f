//! Foreign-language bindings.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::error::StickerKitError;
use crate::manifest::Manifest;
use crate::types::StickerRef;
use crate::StickerPackService;

/// A sticker pack client for mobile hosts.
///
/// Wraps a [`StickerPackService`], so one instance should be kept around for as long as its
/// cached packs are useful.
#[derive(Debug, uniffi::Object)]
pub struct StickerPackClient {
    service: StickerPackService,
}

#[uniffi::export(async_runtime = "tokio")]
#[allow(clippy::needless_pass_by_value)]
impl StickerPackClient {
    /// Creates a client for the default CDN, or for `cdn_base_url` if given.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(cdn_base_url: Option<String>) -> Arc<Self> {
        let config = cdn_base_url.map_or_else(ClientConfig::default, |url| {
            ClientConfig::with_base_url(&url)
        });
        Arc::new(Self {
            service: StickerPackService::new(&config),
        })
    }

    /// Returns the decoded manifest of a pack.
    ///
    /// # Errors
    ///
    /// See [`StickerPackService::get_pack_manifest`].
    pub async fn pack_manifest(
        &self,
        pack_id: String,
        pack_key: String,
    ) -> Result<Manifest, StickerKitError> {
        let manifest = self.service.get_pack_manifest(&pack_id, &pack_key).await?;
        Ok(Manifest::clone(&manifest))
    }

    /// Returns the decrypted WebP bytes of a sticker.
    ///
    /// # Errors
    ///
    /// See [`StickerPackService::get_asset`].
    pub async fn sticker_image(
        &self,
        pack_id: String,
        pack_key: String,
        sticker_id: u32,
    ) -> Result<Vec<u8>, StickerKitError> {
        self.image(&pack_id, &pack_key, StickerRef::Id(sticker_id))
            .await
    }

    /// Returns the decrypted WebP bytes of the pack's cover.
    ///
    /// # Errors
    ///
    /// See [`StickerPackService::get_asset`].
    pub async fn cover_image(
        &self,
        pack_id: String,
        pack_key: String,
    ) -> Result<Vec<u8>, StickerKitError> {
        self.image(&pack_id, &pack_key, StickerRef::Cover).await
    }

    /// Returns a sticker as a `data:image/webp;base64,` URI.
    ///
    /// # Errors
    ///
    /// See [`StickerPackService::get_asset`].
    pub async fn sticker_data_uri(
        &self,
        pack_id: String,
        pack_key: String,
        sticker_id: u32,
    ) -> Result<String, StickerKitError> {
        self.service
            .asset_data_uri(&pack_id, &pack_key, StickerRef::Id(sticker_id))
            .await
    }

    /// Returns the emoji of a sticker.
    ///
    /// # Errors
    ///
    /// See [`StickerPackService::get_emoji`].
    pub async fn emoji(
        &self,
        pack_id: String,
        pack_key: String,
        sticker_id: u32,
    ) -> Result<String, StickerKitError> {
        self.service
            .get_emoji(&pack_id, &pack_key, sticker_id)
            .await
    }
}

impl StickerPackClient {
    async fn image(
        &self,
        pack_id: &str,
        pack_key: &str,
        sticker: StickerRef,
    ) -> Result<Vec<u8>, StickerKitError> {
        let bytes = self.service.raw_asset(pack_id, pack_key, sticker).await?;
        Ok(bytes.to_vec())
    }
}
