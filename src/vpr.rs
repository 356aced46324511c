//! VPR: `KWMA` magic, 0x400 byte header, repeating 16 byte XOR key.
//!
//! The container does not describe its payload, so the codec is always MPEG.

use log::debug;

use crate::audio::{DecryptedAudio, EmbeddedMetadata, ExtractedInfo};
use crate::bytes::{self, Cursor};
use crate::error::Result;
use crate::format::FormatTag;
use crate::sniff::{self, Codec};

const MAGIC: &[u8; 4] = b"KWMA";
const HEADER_LEN: usize = 0x400;
const KEY: [u8; 16] = [
    0x25, 0xDF, 0xE8, 0xA6, 0x75, 0x1E, 0x75, 0x0E, 0x2F, 0x80, 0xF3, 0x2D, 0xB8, 0xB6, 0xE3, 0x11,
];

pub fn decrypt(buffer: &[u8]) -> Result<DecryptedAudio> {
    bytes::check_magic(buffer, MAGIC, FormatTag::Vpr)?;
    let mut cursor = Cursor::new(buffer);
    cursor.skip(HEADER_LEN)?;

    let mut data = cursor.rest().to_vec();
    for (b, k) in data.iter_mut().zip(KEY.iter().cycle()) {
        *b ^= k;
    }
    debug!("vpr: {} payload bytes", data.len());

    Ok(DecryptedAudio {
        info: sniff::describe(Codec::Mpeg, &data),
        data,
        metadata: EmbeddedMetadata::default(),
    })
}

pub fn extract(prefix: &[u8]) -> Result<ExtractedInfo> {
    decrypt(prefix).map(|audio| ExtractedInfo::from_decrypted(FormatTag::Vpr, audio))
}
