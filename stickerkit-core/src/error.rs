use std::fmt;

use thiserror::Error;

/// Error outputs from `StickerKit`
///
/// Every pipeline stage wraps the error of the stage below it in [`StickerKitError::Stage`],
/// so the message reads outermost-first (`manifest decode failed: MAC verification failed`)
/// while [`StickerKitError::kind`] still reports the root cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum StickerKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input: {attribute}: {reason}")]
    InvalidInput {
        /// The offending argument.
        attribute: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The pack key is not a well-formed hex encoding of the expected length
    #[error("invalid pack key: {reason}")]
    KeyDerivation {
        /// Why the key was rejected. Never contains key material.
        reason: String,
    },
    /// The container MAC did not match; the data was tampered with or the key is wrong
    #[error("MAC verification failed")]
    Integrity,
    /// The container is structurally invalid (too short, bad padding)
    #[error("malformed container: {reason}")]
    MalformedContainer {
        /// Description of the structural problem.
        reason: String,
    },
    /// The decrypted manifest does not follow the pack schema
    #[error("invalid manifest: {reason}")]
    ManifestDecode {
        /// Description of the schema violation.
        reason: String,
    },
    /// The manifest is valid but has no sticker with the requested id
    #[error("Sticker pack {pack_id} has no sticker with ID {sticker_id}.")]
    StickerNotFound {
        /// The pack that was searched.
        pack_id: String,
        /// The sticker id that was not found.
        sticker_id: u32,
    },
    /// Network connection error with details
    #[error("network_error: {error} (url: {url}, status: {status:?})")]
    NetworkError {
        /// The requested URL.
        url: String,
        /// The HTTP status, if a response was received.
        status: Option<u16>,
        /// Error details.
        error: String,
    },
    /// The computation was stopped before it finished, e.g. by a runtime shutdown
    #[error("computation interrupted: {reason}")]
    Interrupted {
        /// What stopped the computation.
        reason: String,
    },
    /// Context wrapper naming the pipeline stage that failed
    #[error("{stage} failed: {source}")]
    Stage {
        /// The stage that observed the failure.
        stage: Stage,
        /// The underlying error.
        source: Box<StickerKitError>,
    },
}

/// Pipeline stages used to annotate errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Fetching the encrypted manifest.
    ManifestFetch,
    /// Opening and decoding the manifest.
    ManifestDecode,
    /// Fetching an encrypted sticker image.
    AssetFetch,
    /// Opening a sticker image container.
    AssetDecrypt,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ManifestFetch => "manifest fetch",
            Self::ManifestDecode => "manifest decode",
            Self::AssetFetch => "asset fetch",
            Self::AssetDecrypt => "asset decrypt",
        };
        f.write_str(name)
    }
}

/// The root cause of a [`StickerKitError`], with stage context stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`StickerKitError::InvalidInput`].
    InvalidInput,
    /// See [`StickerKitError::KeyDerivation`].
    KeyDerivation,
    /// See [`StickerKitError::Integrity`].
    Integrity,
    /// See [`StickerKitError::MalformedContainer`].
    MalformedContainer,
    /// See [`StickerKitError::ManifestDecode`].
    ManifestDecode,
    /// See [`StickerKitError::StickerNotFound`].
    StickerNotFound,
    /// See [`StickerKitError::NetworkError`].
    Transport,
    /// See [`StickerKitError::Interrupted`].
    Interrupted,
}

impl StickerKitError {
    /// Wraps `self` with the name of the stage that observed it.
    #[must_use]
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping all stage wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut current = self;
        while let Self::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// Returns the kind of the root cause.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Stage { source, .. } => source.kind(),
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::KeyDerivation { .. } => ErrorKind::KeyDerivation,
            Self::Integrity => ErrorKind::Integrity,
            Self::MalformedContainer { .. } => ErrorKind::MalformedContainer,
            Self::ManifestDecode { .. } => ErrorKind::ManifestDecode,
            Self::StickerNotFound { .. } => ErrorKind::StickerNotFound,
            Self::NetworkError { .. } => ErrorKind::Transport,
            Self::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Only transport failures without a response, rate limiting, server errors and
    /// interrupted computations qualify. Note that cached failures are returned as-is; a retry
    /// needs a fresh client.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Stage { source, .. } => source.is_retryable(),
            Self::NetworkError { status: None, .. } | Self::Interrupted { .. } => true,
            Self::NetworkError {
                status: Some(status),
                ..
            } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result alias used throughout the crate.
pub type StickerKitResult<T, E = StickerKitError> = std::result::Result<T, E>;
