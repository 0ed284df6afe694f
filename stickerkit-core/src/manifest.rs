//! Sticker pack manifest decoding.
//!
//! A decrypted manifest is a protobuf `Pack` message:
//!
//! ```text
//! message Pack {
//!   optional string  title    = 1;
//!   optional string  author   = 2;
//!   optional Sticker cover    = 3;
//!   repeated Sticker stickers = 4;
//! }
//!
//! message Sticker {
//!   optional uint32 id    = 1;
//!   optional string emoji = 2;
//! }
//! ```
//!
//! Unknown fields are skipped and absent fields take their default value.

use prost::Message;
use serde::{Deserialize, Serialize};

use crate::error::{StickerKitError, StickerKitResult};

/// A single sticker entry of a pack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Sticker {
    /// Sticker id, unique within its pack.
    pub id: u32,
    /// The emoji the sticker stands for. May be empty.
    pub emoji: String,
}

/// A decoded sticker pack manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Manifest {
    /// Pack title.
    pub title: String,
    /// Pack author.
    pub author: String,
    /// The sticker used as the pack's cover image.
    pub cover: Sticker,
    /// All stickers, in manifest order.
    pub stickers: Vec<Sticker>,
}

impl Manifest {
    /// Decodes a decrypted `Pack` message.
    ///
    /// # Errors
    ///
    /// Returns [`StickerKitError::ManifestDecode`] on truncated input, wire type mismatches or
    /// invalid UTF-8 in string fields.
    pub fn decode(plaintext: &[u8]) -> StickerKitResult<Self> {
        let pack = PackProto::decode(plaintext).map_err(|err| StickerKitError::ManifestDecode {
            reason: err.to_string(),
        })?;
        Ok(pack.into())
    }

    /// Finds a sticker by id. Linear in the number of stickers.
    #[must_use]
    pub fn sticker(&self, id: u32) -> Option<&Sticker> {
        self.stickers.iter().find(|sticker| sticker.id == id)
    }

    /// The ids of all stickers, in manifest order.
    pub fn sticker_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.stickers.iter().map(|sticker| sticker.id)
    }
}

#[derive(Clone, PartialEq, Message)]
struct StickerProto {
    #[prost(uint32, tag = "1")]
    id: u32,
    #[prost(string, tag = "2")]
    emoji: String,
}

#[derive(Clone, PartialEq, Message)]
struct PackProto {
    #[prost(string, tag = "1")]
    title: String,
    #[prost(string, tag = "2")]
    author: String,
    #[prost(message, optional, tag = "3")]
    cover: Option<StickerProto>,
    #[prost(message, repeated, tag = "4")]
    stickers: Vec<StickerProto>,
}

impl From<StickerProto> for Sticker {
    fn from(value: StickerProto) -> Self {
        Self {
            id: value.id,
            emoji: value.emoji,
        }
    }
}

impl From<PackProto> for Manifest {
    fn from(value: PackProto) -> Self {
        Self {
            title: value.title,
            author: value.author,
            cover: value.cover.map(Sticker::from).unwrap_or_default(),
            stickers: value.stickers.into_iter().map(Sticker::from).collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use prost::Message;

    use super::{Manifest, PackProto, StickerProto};

    /// Encodes a manifest into `Pack` wire bytes.
    pub fn encode(manifest: &Manifest) -> Vec<u8> {
        let to_proto = |sticker: &super::Sticker| StickerProto {
            id: sticker.id,
            emoji: sticker.emoji.clone(),
        };
        PackProto {
            title: manifest.title.clone(),
            author: manifest.author.clone(),
            cover: Some(to_proto(&manifest.cover)),
            stickers: manifest.stickers.iter().map(to_proto).collect(),
        }
        .encode_to_vec()
    }
}
