use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StickerKitError;

/// MIME prefix of sticker images rendered as data URIs.
pub const DATA_URI_PREFIX: &str = "data:image/webp;base64,";

/// Selects an image within a pack: a numeric sticker id or the pack's cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StickerRef {
    /// A sticker by id.
    Id(u32),
    /// The pack's designated cover image.
    Cover,
}

impl fmt::Display for StickerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Cover => f.write_str("cover"),
        }
    }
}

impl FromStr for StickerRef {
    type Err = StickerKitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cover") {
            return Ok(Self::Cover);
        }
        s.parse::<u32>()
            .map(Self::Id)
            .map_err(|_| StickerKitError::InvalidInput {
                attribute: "sticker_id".to_string(),
                reason: format!("`{s}` is neither a sticker id nor `cover`"),
            })
    }
}

impl From<u32> for StickerRef {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

/// Output encoding of a sticker image.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize,
)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AssetFormat {
    /// Raw decrypted image bytes (WebP).
    #[default]
    Raw,
    /// A `data:image/webp;base64,...` string, usable as an `<img src>`.
    DataUri,
}

/// A decrypted sticker image in the requested [`AssetFormat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    /// Shared view of the cached image bytes.
    Raw(Arc<[u8]>),
    /// The image as a data URI.
    DataUri(String),
}

impl Asset {
    /// Returns the raw bytes, if this is a [`Asset::Raw`].
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::DataUri(_) => None,
        }
    }

    /// Returns the data URI, if this is a [`Asset::DataUri`].
    #[must_use]
    pub fn as_data_uri(&self) -> Option<&str> {
        match self {
            Self::Raw(_) => None,
            Self::DataUri(uri) => Some(uri),
        }
    }
}
