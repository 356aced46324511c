use thiserror::Error;

use crate::format::FormatTag;

pub type Result<T> = std::result::Result<T, DecryptError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecryptError {
    /// The extension is not one of the known containers; treat the file as plain audio.
    #[error("unsupported format: {0:?}")]
    UnsupportedFormat(String),

    #[error("invalid magic header for {format:?}")]
    InvalidMagic { format: FormatTag },

    /// A length field points past the end of the buffer.
    #[error("truncated container: need {needed} bytes at offset {offset}, {available} available")]
    TruncatedContainer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("cipher input of {len} bytes is not a multiple of the block size")]
    MalformedCipherInput { len: usize },

    #[error("invalid key length: {0}")]
    InvalidKeyLength(usize),

    #[error("failed to derive the content key")]
    KeyDerivationFailed,

    #[error("failed to parse embedded metadata: {0}")]
    MetadataParseFailed(String),

    #[error("failed to extract cover image: {0}")]
    CoverExtractionFailed(String),
}

impl DecryptError {
    /// Whether a retry with a longer prefix could succeed.
    pub fn is_truncation(&self) -> bool {
        matches!(self, DecryptError::TruncatedContainer { .. })
    }
}
