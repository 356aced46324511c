//! KGM / KGMA: 4 byte magic, 0x3C byte header, then a repeating 4 byte XOR key.

use log::debug;

use crate::audio::{DecryptedAudio, EmbeddedMetadata, ExtractedInfo};
use crate::bytes::{self, Cursor};
use crate::error::{DecryptError, Result};
use crate::format::FormatTag;
use crate::sniff::{self, Codec};

const KGM_MAGIC: [u8; 4] = [0x7C, 0xD5, 0x32, 0xEB];
const KGMA_MAGIC: [u8; 4] = [0x05, 0x28, 0xBC, 0x96];
const HEADER_LEN: usize = 0x3C;
const KEY: [u8; 4] = [0x4C, 0x50, 0x65, 0x6A];

fn validate(buffer: &[u8]) -> Result<()> {
    match bytes::check_magic(buffer, &KGM_MAGIC, FormatTag::Kgm) {
        Err(DecryptError::InvalidMagic { .. }) => {
            bytes::check_magic(buffer, &KGMA_MAGIC, FormatTag::Kgm)
        }
        other => other,
    }
}

pub fn decrypt(buffer: &[u8]) -> Result<DecryptedAudio> {
    validate(buffer)?;
    let mut cursor = Cursor::new(buffer);
    cursor.skip(HEADER_LEN)?;

    let mut data = cursor.rest().to_vec();
    for (b, k) in data.iter_mut().zip(KEY.iter().cycle()) {
        *b ^= k;
    }
    debug!("kgm: {} payload bytes", data.len());

    let codec = if sniff::is_flac(&data) {
        Codec::Flac
    } else {
        Codec::Mpeg
    };
    Ok(DecryptedAudio {
        info: sniff::describe(codec, &data),
        data,
        metadata: EmbeddedMetadata::default(),
    })
}

pub fn extract(prefix: &[u8]) -> Result<ExtractedInfo> {
    decrypt(prefix).map(|audio| ExtractedInfo::from_decrypted(FormatTag::Kgm, audio))
}
