//! Single entry points dispatching on [`FormatTag`].

use log::debug;

use crate::audio::{DecryptedAudio, EmbeddedMetadata, ExtractedInfo};
use crate::error::{DecryptError, Result};
use crate::format::{self, FormatTag};
use crate::sniff;
use crate::{kgm, ncm, qmc, vpr};

/// Recommended leading range for [`extract`]; enough for NCM covers in practice.
pub const DEFAULT_PREFIX_LEN: usize = 2 * 1024 * 1024;

fn unsupported(filename: &str) -> DecryptError {
    let ext = std::path::Path::new(filename)
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    DecryptError::UnsupportedFormat(ext)
}

/// Decrypt a whole file, picking the scheme from its name.
pub fn decrypt(filename: &str, buffer: &[u8]) -> Result<DecryptedAudio> {
    let format = format::detect(filename);
    debug!("decrypting {filename:?} as {format:?}");
    match format {
        FormatTag::Normal => Err(unsupported(filename)),
        format => decrypt_as(format, buffer),
    }
}

pub fn decrypt_as(format: FormatTag, buffer: &[u8]) -> Result<DecryptedAudio> {
    match format {
        FormatTag::Ncm => ncm::decrypt(buffer),
        FormatTag::Qmc => Ok(qmc::decrypt(buffer)),
        FormatTag::Mflac | FormatTag::Mgg => Ok(qmc::decrypt_mflac(buffer)),
        FormatTag::Kgm => kgm::decrypt(buffer),
        FormatTag::Vpr => vpr::decrypt(buffer),
        FormatTag::Normal => Err(DecryptError::UnsupportedFormat(String::new())),
    }
}

/// Format, codec and metadata from a leading range of a file.
///
/// Cover and metadata that do not fit in `prefix` are left out. A key or
/// header that does not fit is reported as [`DecryptError::TruncatedContainer`];
/// retrying with a longer prefix is up to the caller.
pub fn extract(filename: &str, prefix: &[u8]) -> Result<ExtractedInfo> {
    let format = format::detect(filename);
    debug!("extracting {filename:?} as {format:?} from {} bytes", prefix.len());
    match format {
        FormatTag::Normal => Err(unsupported(filename)),
        format => extract_as(format, prefix),
    }
}

pub fn extract_as(format: FormatTag, prefix: &[u8]) -> Result<ExtractedInfo> {
    match format {
        FormatTag::Ncm => ncm::extract(prefix),
        FormatTag::Qmc | FormatTag::Mflac | FormatTag::Mgg => Ok(qmc::extract(format, prefix)),
        FormatTag::Kgm => kgm::extract(prefix),
        FormatTag::Vpr => vpr::extract(prefix),
        FormatTag::Normal => Err(DecryptError::UnsupportedFormat(String::new())),
    }
}

/// Describe an unencrypted file; the fallback after `UnsupportedFormat`.
pub fn extract_plain(prefix: &[u8]) -> ExtractedInfo {
    ExtractedInfo::new(
        FormatTag::Normal,
        Some(sniff::sniff(prefix)),
        EmbeddedMetadata::default(),
    )
}
