use serde::{Serialize, Serializer};

use crate::format::FormatTag;
use crate::sniff::{AudioInfo, Codec};

/// Title, artists, album and cover recovered from a container.
///
/// Every field is optional; a container without metadata is not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub title: Option<String>,
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub cover: Option<Vec<u8>>,
}

impl EmbeddedMetadata {
    pub fn artist(&self) -> Option<String> {
        (!self.artists.is_empty()).then(|| self.artists.join(", "))
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.artists.is_empty()
            && self.album.is_none()
            && self.cover.is_none()
    }
}

/// Plaintext audio from a full decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedAudio {
    pub data: Vec<u8>,
    pub info: AudioInfo,
    pub metadata: EmbeddedMetadata,
}

impl DecryptedAudio {
    pub fn codec(&self) -> Codec {
        self.info.codec
    }

    pub fn mime(&self) -> &'static str {
        self.info.codec.mime()
    }
}

/// Result of a metadata-only pass over a leading byte range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInfo {
    pub format: FormatTag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<Codec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bit_depth: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "cover_len",
        rename = "coverBytes"
    )]
    pub cover: Option<Vec<u8>>,
}

fn cover_len<S: Serializer>(cover: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(cover.as_ref().map_or(0, |c| c.len() as u64))
}

impl ExtractedInfo {
    pub fn new(format: FormatTag, info: Option<AudioInfo>, metadata: EmbeddedMetadata) -> Self {
        ExtractedInfo {
            format,
            codec: info.map(|i| i.codec),
            sample_rate: info.and_then(|i| i.sample_rate),
            channels: info.and_then(|i| i.channels),
            bit_depth: info.and_then(|i| i.bit_depth),
            artist: metadata.artist(),
            title: metadata.title,
            album: metadata.album,
            cover: metadata.cover,
        }
    }

    pub fn from_decrypted(format: FormatTag, audio: DecryptedAudio) -> Self {
        ExtractedInfo::new(format, Some(audio.info), audio.metadata)
    }
}
