//! Classify decrypted audio by its leading bytes and pull out the few stream
//! facts that are cheap to read without decoding.
//!
//! Nothing here fails: a prefix that is too short or unrecognised yields
//! MPEG audio with no further fields.

use serde::Serialize;

use crate::bytes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Mpeg,
    Flac,
    Ogg,
}

impl Codec {
    pub fn mime(self) -> &'static str {
        match self {
            Codec::Mpeg => "audio/mpeg",
            Codec::Flac => "audio/flac",
            Codec::Ogg => "audio/ogg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Codec::Mpeg => "mp3",
            Codec::Flac => "flac",
            Codec::Ogg => "ogg",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MpegVersion {
    #[serde(rename = "1")]
    V1,
    #[serde(rename = "2")]
    V2,
    #[serde(rename = "2.5")]
    V2_5,
}

/// Bits 7-6 of the fourth header byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

impl ChannelMode {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }

    pub fn channels(self) -> u8 {
        match self {
            ChannelMode::Mono => 1,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MpegFrame {
    pub version: MpegVersion,
    /// 1, 2 or 3.
    pub layer: u8,
    pub sample_rate: u32,
    pub channel_mode: ChannelMode,
}

impl MpegFrame {
    pub fn channels(&self) -> u8 {
        self.channel_mode.channels()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioInfo {
    pub codec: Codec,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
    pub bit_depth: Option<u8>,
    pub mpeg: Option<MpegFrame>,
}

impl AudioInfo {
    fn bare(codec: Codec) -> Self {
        AudioInfo {
            codec,
            sample_rate: None,
            channels: None,
            bit_depth: None,
            mpeg: None,
        }
    }
}

const FLAC_MAGIC: &[u8; 4] = b"fLaC";
const OGG_MAGIC: &[u8; 4] = b"OggS";
const STREAMINFO: u8 = 0;
const STREAMINFO_LEN: usize = 34;

pub fn is_flac(prefix: &[u8]) -> bool {
    prefix.starts_with(FLAC_MAGIC)
}

/// Classify `prefix` and describe it.
pub fn sniff(prefix: &[u8]) -> AudioInfo {
    let codec = if is_flac(prefix) {
        Codec::Flac
    } else if prefix.starts_with(OGG_MAGIC) {
        Codec::Ogg
    } else {
        Codec::Mpeg
    };
    describe(codec, prefix)
}

/// Read stream facts for an already decided codec.
pub fn describe(codec: Codec, prefix: &[u8]) -> AudioInfo {
    match codec {
        Codec::Flac => flac_streaminfo(prefix),
        Codec::Mpeg => mpeg_info(prefix),
        Codec::Ogg => vorbis_info(prefix),
    }
}

fn flac_streaminfo(prefix: &[u8]) -> AudioInfo {
    let mut info = AudioInfo::bare(Codec::Flac);
    if !is_flac(prefix) {
        return info;
    }

    let mut pos = FLAC_MAGIC.len();
    while let (Some(&header), Ok(len)) = (prefix.get(pos), bytes::u24_be(prefix, pos + 1)) {
        let is_last = header & 0x80 != 0;
        let block_type = header & 0x7F;
        let body = pos + 4;

        if block_type == STREAMINFO {
            if let Ok(block) = bytes::field(prefix, body, STREAMINFO_LEN) {
                // Bytes 10..14: 20 bits rate, 3 bits channels - 1, 5 bits depth - 1.
                let rate = (block[10] as u32) << 12
                    | (block[11] as u32) << 4
                    | (block[12] as u32) >> 4;
                let channels = ((block[12] >> 1) & 0x07) + 1;
                let depth = (((block[12] & 0x01) << 4) | (block[13] >> 4)) + 1;
                info.sample_rate = (rate != 0).then_some(rate);
                info.channels = Some(channels);
                info.bit_depth = Some(depth);
            }
            break;
        }
        if is_last {
            break;
        }
        pos = body + len as usize;
    }

    info
}

const MPEG_SAMPLE_RATES: [[u32; 3]; 3] = [
    [44100, 48000, 32000],
    [22050, 24000, 16000],
    [11025, 12000, 8000],
];

/// Skip a leading ID3v2 tag; its size is a 28-bit syncsafe integer.
fn id3v2_len(prefix: &[u8]) -> usize {
    match bytes::field(prefix, 0, 10) {
        Ok(h) if h.starts_with(b"ID3") => {
            let size = h[6..10]
                .iter()
                .fold(0usize, |acc, b| (acc << 7) | (*b & 0x7F) as usize);
            let footer = if h[5] & 0x10 != 0 { 10 } else { 0 };
            10 + size + footer
        }
        _ => 0,
    }
}

pub fn parse_mpeg_frame(header: [u8; 4]) -> Option<MpegFrame> {
    let [b0, b1, b2, b3] = header;
    if b0 != 0xFF || b1 & 0xE0 != 0xE0 {
        return None;
    }

    let (version, row) = match (b1 >> 3) & 0x03 {
        0 => (MpegVersion::V2_5, 2),
        2 => (MpegVersion::V2, 1),
        3 => (MpegVersion::V1, 0),
        _ => return None,
    };
    let layer = match (b1 >> 1) & 0x03 {
        1 => 3,
        2 => 2,
        3 => 1,
        _ => return None,
    };
    let sample_rate = *MPEG_SAMPLE_RATES[row].get(((b2 >> 2) & 0x03) as usize)?;
    let channel_mode = ChannelMode::from_bits(b3 >> 6);

    Some(MpegFrame {
        version,
        layer,
        sample_rate,
        channel_mode,
    })
}

fn mpeg_info(prefix: &[u8]) -> AudioInfo {
    let mut info = AudioInfo::bare(Codec::Mpeg);
    let frame = bytes::array::<4>(prefix, id3v2_len(prefix))
        .ok()
        .and_then(parse_mpeg_frame);
    if let Some(frame) = frame {
        info.sample_rate = Some(frame.sample_rate);
        info.channels = Some(frame.channels());
        info.mpeg = Some(frame);
    }
    info
}

/// First Ogg page, first packet: the Vorbis identification header.
fn vorbis_info(prefix: &[u8]) -> AudioInfo {
    let mut info = AudioInfo::bare(Codec::Ogg);
    let Some(&segments) = prefix.get(26) else {
        return info;
    };
    let packet = 27 + segments as usize;
    let Ok(ident) = bytes::field(prefix, packet, 16) else {
        return info;
    };
    if ident[0] == 0x01 && &ident[1..7] == b"vorbis" {
        info.channels = Some(ident[11]);
        info.sample_rate = bytes::u32_le(ident, 12).ok().filter(|rate| *rate != 0);
    }
    info
}

/// MIME type of an embedded cover image.
pub fn image_mime(cover: &[u8]) -> Option<&'static str> {
    if cover.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if cover.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else {
        None
    }
}
