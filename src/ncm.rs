//! NCM container.
//!
//! ```text
//! "CTENFDAM" | 2 bytes gap
//! u32le len | key blob    (xor 0x64, AES-ECB core key, "neteasecloudmusic" + RC4 key)
//! u32le len | meta blob   (xor 0x63, 22 byte prefix, base64, AES-ECB meta key, "music:" + JSON)
//! 9 bytes CRC/gap
//! u32le len | cover image
//! payload                 (xor NCM positional keystream)
//! ```

use base64::Engine;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::aes;
use crate::audio::{DecryptedAudio, EmbeddedMetadata, ExtractedInfo};
use crate::bytes::{self, Cursor};
use crate::error::{DecryptError, Result};
use crate::format::FormatTag;
use crate::rc4::NcmKeystream;
use crate::sniff::{self, AudioInfo, Codec};

const MAGIC: &[u8; 8] = b"CTENFDAM";
const MAGIC_GAP: usize = 2;

const CODE_KEY: [u8; 16] = [
    0x68, 0x7A, 0x48, 0x52, 0x41, 0x6D, 0x73, 0x6F, 0x35, 0x6B, 0x49, 0x6E, 0x62, 0x61, 0x78, 0x57,
];
const META_KEY: [u8; 16] = [
    0x23, 0x31, 0x34, 0x6C, 0x6A, 0x6B, 0x5F, 0x21, 0x5C, 0x5D, 0x26, 0x30, 0x55, 0x3C, 0x27, 0x28,
];

const KEY_XOR: u8 = 0x64;
const META_XOR: u8 = 0x63;
const KEY_PREFIX: &[u8] = b"neteasecloudmusic";
// "163 key(Don't modify):"
const META_PREFIX_LEN: usize = 22;
const MUSIC_PREFIX: &[u8] = b"music:";
const DJ_PREFIX: &[u8] = b"dj:";
const CRC_GAP: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Whole file: every length field must fit.
    Full,
    /// Leading range only: fields running off the end are dropped.
    Prefix,
}

struct Header {
    keystream: NcmKeystream,
    metadata: EmbeddedMetadata,
    audio_offset: Option<usize>,
}

/// JSON record inside the metadata blob.
#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(default)]
pub struct NcmMeta {
    pub format: Option<String>,

    #[serde(rename = "musicName")]
    pub music_name: Option<String>,

    /// Usually `[[name, id], ...]`.
    pub artist: Vec<Value>,

    pub album: Option<String>,

    pub bitrate: Option<i64>,

    pub duration: Option<i64>,

    #[serde(rename = "transNames")]
    pub trans_names: Option<Vec<String>>,

    #[serde(rename = "albumPic")]
    pub album_pic: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DjMeta {
    #[serde(rename = "mainMusic")]
    main_music: NcmMeta,
}

impl NcmMeta {
    pub fn artist_names(&self) -> Vec<String> {
        self.artist
            .iter()
            .filter_map(|entry| match entry {
                Value::Array(pair) => pair.first(),
                other => Some(other),
            })
            .filter_map(|name| match name {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    fn into_metadata(self) -> EmbeddedMetadata {
        EmbeddedMetadata {
            artists: self.artist_names(),
            title: self.music_name.filter(|s| !s.is_empty()),
            album: self.album.filter(|s| !s.is_empty()),
            cover: None,
        }
    }
}

fn tolerate<T>(result: Result<T>, mode: Mode) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if mode == Mode::Prefix && e.is_truncation() => Ok(None),
        Err(e) => Err(e),
    }
}

fn magic_header(cursor: &mut Cursor) -> Result<()> {
    bytes::check_magic(cursor.rest(), MAGIC, FormatTag::Ncm)?;
    cursor.skip(MAGIC.len() + MAGIC_GAP)
}

fn cr4key(cursor: &mut Cursor) -> Result<NcmKeystream> {
    let blob = cursor.segment()?;
    debug!("ncm: key blob of {} bytes", blob.len());

    let mut key_data = Zeroizing::new(blob.to_vec());
    key_data.iter_mut().for_each(|b| *b ^= KEY_XOR);

    let decrypted = Zeroizing::new(aes::decrypt_ecb(&key_data, &CODE_KEY)?);
    let key = decrypted
        .strip_prefix(KEY_PREFIX)
        .filter(|key| !key.is_empty())
        .ok_or(DecryptError::KeyDerivationFailed)?;

    NcmKeystream::from_key(key)
}

/// Decode a metadata blob as stored in the container (still XORed).
pub fn meta_data(blob: &[u8]) -> Result<NcmMeta> {
    let fail = |e: &dyn std::fmt::Display| DecryptError::MetadataParseFailed(e.to_string());

    let unmasked: Vec<u8> = blob.iter().map(|b| b ^ META_XOR).collect();
    let encoded = unmasked
        .get(META_PREFIX_LEN..)
        .ok_or_else(|| fail(&"blob shorter than its prefix"))?;
    let decoded = base64::prelude::BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| fail(&e))?;
    let plain = aes::decrypt_ecb(&decoded, &META_KEY).map_err(|e| fail(&e))?;

    if let Some(json) = plain.strip_prefix(MUSIC_PREFIX) {
        serde_json::from_slice(json).map_err(|e| fail(&e))
    } else if let Some(json) = plain.strip_prefix(DJ_PREFIX) {
        serde_json::from_slice::<DjMeta>(json)
            .map(|dj| dj.main_music)
            .map_err(|e| fail(&e))
    } else {
        Err(fail(&"unknown metadata prefix"))
    }
}

fn album_image(cursor: &mut Cursor) -> Result<Option<Vec<u8>>> {
    let image = cursor.segment()?;
    if image.is_empty() {
        return Ok(None);
    }
    if sniff::image_mime(image).is_none() {
        debug!("ncm: cover of {} bytes has an unknown image type", image.len());
    }
    Ok(Some(image.to_vec()))
}

fn parse(buf: &[u8], mode: Mode) -> Result<Header> {
    let mut cursor = Cursor::new(buf);

    magic_header(&mut cursor)?;
    let mut header = Header {
        keystream: cr4key(&mut cursor)?,
        metadata: EmbeddedMetadata::default(),
        audio_offset: None,
    };

    let Some(meta_blob) = tolerate(cursor.segment(), mode)? else {
        warn!(
            "ncm: {}",
            DecryptError::MetadataParseFailed("metadata runs past the supplied range".into())
        );
        return Ok(header);
    };
    if !meta_blob.is_empty() {
        match meta_data(meta_blob) {
            Ok(meta) => {
                debug!("ncm: metadata format {:?}", meta.format);
                header.metadata = meta.into_metadata();
            }
            Err(e) => warn!("ncm: {e}"),
        }
    }

    if tolerate(cursor.skip(CRC_GAP), mode)?.is_none() {
        return Ok(header);
    }

    match tolerate(album_image(&mut cursor), mode)? {
        Some(cover) => header.metadata.cover = cover,
        None => {
            warn!(
                "ncm: {}",
                DecryptError::CoverExtractionFailed("cover runs past the supplied range".into())
            );
            return Ok(header);
        }
    }

    header.audio_offset = Some(cursor.position());
    Ok(header)
}

fn music_data(payload: &[u8], keystream: &NcmKeystream) -> (Vec<u8>, AudioInfo) {
    let mut data = payload.to_vec();
    keystream.apply(&mut data);

    let codec = if sniff::is_flac(&data) {
        Codec::Flac
    } else {
        Codec::Mpeg
    };
    let info = sniff::describe(codec, &data);
    (data, info)
}

pub fn decrypt(buffer: &[u8]) -> Result<DecryptedAudio> {
    let header = parse(buffer, Mode::Full)?;
    let payload = header
        .audio_offset
        .and_then(|offset| buffer.get(offset..))
        .unwrap_or_default();
    debug!("ncm: {} payload bytes", payload.len());

    let (data, info) = music_data(payload, &header.keystream);
    Ok(DecryptedAudio {
        data,
        info,
        metadata: header.metadata,
    })
}

/// Metadata and cover from a leading range of the file.
pub fn extract_metadata(prefix: &[u8]) -> Result<EmbeddedMetadata> {
    parse(prefix, Mode::Prefix).map(|header| header.metadata)
}

pub fn extract(prefix: &[u8]) -> Result<ExtractedInfo> {
    let header = parse(prefix, Mode::Prefix)?;
    let info = header
        .audio_offset
        .and_then(|offset| prefix.get(offset..))
        .filter(|payload| !payload.is_empty())
        .map(|payload| music_data(payload, &header.keystream).1);

    Ok(ExtractedInfo::new(FormatTag::Ncm, info, header.metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::aes::Aes128;
    use block_modes::block_padding::Pkcs7;
    use block_modes::{BlockMode, Ecb};

    type Aes128Ecb = Ecb<Aes128, Pkcs7>;

    fn aes_encode(plain: &[u8], key: [u8; 16]) -> Vec<u8> {
        Aes128Ecb::new_from_slices(&key, &[]).unwrap().encrypt_vec(plain)
    }

    fn segment(out: &mut Vec<u8>, data: &[u8]) {
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(data);
    }

    fn meta_blob(prefix: &str, json: &str) -> Vec<u8> {
        let plain = [prefix.as_bytes(), json.as_bytes()].concat();
        let encoded = base64::prelude::BASE64_STANDARD.encode(aes_encode(&plain, META_KEY));
        let mut blob = b"163 key(Don't modify):".to_vec();
        blob.extend_from_slice(encoded.as_bytes());
        blob.iter().map(|b| b ^ META_XOR).collect()
    }

    fn build(rc4_key: &[u8], meta: &[u8], cover: &[u8], plain: &[u8]) -> Vec<u8> {
        let mut out = b"CTENFDAM\x00\x00".to_vec();

        let key_plain = [KEY_PREFIX, rc4_key].concat();
        let key_blob: Vec<u8> = aes_encode(&key_plain, CODE_KEY)
            .iter()
            .map(|b| b ^ KEY_XOR)
            .collect();
        segment(&mut out, &key_blob);
        segment(&mut out, meta);
        out.extend_from_slice(&[0u8; CRC_GAP]);
        segment(&mut out, cover);

        let mut payload = plain.to_vec();
        NcmKeystream::from_key(rc4_key).unwrap().apply(&mut payload);
        out.extend_from_slice(&payload);
        out
    }

    const JSON: &str = r#"{"musicName":"晴天","artist":[["周杰伦",6452]],"album":"叶惠美","format":"flac","bitrate":999000,"albumPic":"https://example.invalid/a.jpg"}"#;

    #[test]
    fn decrypts_with_metadata_and_cover() {
        let mut plain = crate::sniff::tests::flac_header(44100, 2, 16);
        plain.extend_from_slice(&[0x5A; 1000]);
        let cover = [0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];
        let file = build(b"123456789012345E", &meta_blob("music:", JSON), &cover, &plain);

        let audio = decrypt(&file).unwrap();
        assert_eq!(audio.data, plain);
        assert_eq!(audio.codec(), Codec::Flac);
        assert_eq!(audio.mime(), "audio/flac");
        assert_eq!(audio.info.sample_rate, Some(44100));
        assert_eq!(audio.metadata.title.as_deref(), Some("晴天"));
        assert_eq!(audio.metadata.artists, vec!["周杰伦".to_string()]);
        assert_eq!(audio.metadata.album.as_deref(), Some("叶惠美"));
        assert_eq!(audio.metadata.cover.as_deref(), Some(&cover[..]));
    }

    #[test]
    fn broken_metadata_is_not_fatal() {
        let mut meta = meta_blob("music:", JSON);
        meta[30] ^= 0xFF;
        let file = build(b"key", &meta, &[], b"\xFF\xFB\x90\x44rest");

        let audio = decrypt(&file).unwrap();
        assert_eq!(audio.data, b"\xFF\xFB\x90\x44rest");
        assert_eq!(audio.codec(), Codec::Mpeg);
        assert_eq!(audio.info.sample_rate, Some(44100));
        assert!(audio.metadata.is_empty());
    }

    #[test]
    fn parses_artist_shapes() {
        let meta: NcmMeta = serde_json::from_str(
            r#"{"musicName":"x","artist":[["A",1],"B",[2,3],[],null],"album":""}"#,
        )
        .unwrap();
        assert_eq!(meta.artist_names(), vec!["A", "B", "2"]);
        let meta = meta.into_metadata();
        assert_eq!(meta.album, None);
        assert_eq!(meta.artist().as_deref(), Some("A, B, 2"));
    }

    #[test]
    fn reads_dj_metadata() {
        let dj = format!(r#"{{"programName":"p","mainMusic":{JSON}}}"#);
        let meta = meta_data(&meta_blob("dj:", &dj)).unwrap();
        assert_eq!(meta.music_name.as_deref(), Some("晴天"));
        assert_eq!(meta.bitrate, Some(999000));
    }

    #[test]
    fn rejects_unknown_metadata_prefix() {
        assert!(matches!(
            meta_data(&meta_blob("film:", JSON)),
            Err(DecryptError::MetadataParseFailed(_))
        ));
        assert!(matches!(
            meta_data(&[META_XOR; 4]),
            Err(DecryptError::MetadataParseFailed(_))
        ));
    }

    #[test]
    fn key_without_prefix_fails_derivation() {
        let mut out = b"CTENFDAM\x00\x00".to_vec();
        let blob: Vec<u8> = aes_encode(b"somebody else's key", CODE_KEY)
            .iter()
            .map(|b| b ^ KEY_XOR)
            .collect();
        segment(&mut out, &blob);
        assert_eq!(decrypt(&out).err(), Some(DecryptError::KeyDerivationFailed));
    }

    #[test]
    fn key_blob_off_block_size_is_malformed() {
        let mut out = b"CTENFDAM\x00\x00".to_vec();
        segment(&mut out, &[0u8; 20]);
        assert_eq!(
            decrypt(&out).err(),
            Some(DecryptError::MalformedCipherInput { len: 20 })
        );
    }

    #[test]
    fn prefix_extraction_drops_cut_off_cover() {
        let cover = vec![0xFF; 4096];
        let file = build(b"k", &meta_blob("music:", JSON), &cover, b"fLaC....");
        let cover_start = file.len() - 8 - cover.len();

        let prefix = &file[..cover_start + 100];
        let meta = extract_metadata(prefix).unwrap();
        assert_eq!(meta.title.as_deref(), Some("晴天"));
        assert_eq!(meta.cover, None);

        let info = extract(prefix).unwrap();
        assert_eq!(info.codec, None);
        assert_eq!(info.artist.as_deref(), Some("周杰伦"));

        assert!(decrypt(prefix).unwrap_err().is_truncation());
    }

    #[test]
    fn prefix_extraction_sniffs_payload() {
        let file = build(b"k", &[], &[], b"fLaC....");
        let info = extract(&file).unwrap();
        assert_eq!(info.format, FormatTag::Ncm);
        assert_eq!(info.codec, Some(Codec::Flac));
        assert_eq!(info.title, None);
    }

    #[test]
    fn prefix_extraction_still_needs_the_key() {
        let file = build(b"k", &[], &[], b"");
        assert!(extract(&file[..20]).unwrap_err().is_truncation());
        assert_eq!(
            extract(b"CTENFDAX\x00\x00").unwrap_err(),
            DecryptError::InvalidMagic {
                format: FormatTag::Ncm
            }
        );
    }
}
