#![allow(dead_code)]

use aes::Aes128;
use base64::Engine;
use block_modes::block_padding::Pkcs7;
use block_modes::{BlockMode, Ecb};
use music_unboxing::rc4::NcmKeystream;

type Aes128Ecb = Ecb<Aes128, Pkcs7>;

pub const CODE_KEY: [u8; 16] = *b"hzHRAmso5kInbaxW";
pub const META_KEY: [u8; 16] = *b"#14ljk_!\\]&0U<'(";

pub fn aes_encode(plain: &[u8], key: &[u8; 16]) -> Vec<u8> {
    Aes128Ecb::new_from_slices(key, &[]).unwrap().encrypt_vec(plain)
}

fn segment(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(data);
}

/// Metadata blob as stored on disk, for a `music:` JSON record.
pub fn ncm_meta(json: &str) -> Vec<u8> {
    let plain = [b"music:".as_slice(), json.as_bytes()].concat();
    let encoded = base64::prelude::BASE64_STANDARD.encode(aes_encode(&plain, &META_KEY));
    [b"163 key(Don't modify):".as_slice(), encoded.as_bytes()]
        .concat()
        .iter()
        .map(|b| b ^ 0x63)
        .collect()
}

/// A complete NCM file. Returns the file and the offset where audio starts.
pub fn ncm_file(rc4_key: &[u8], meta: &[u8], cover: &[u8], plain: &[u8]) -> (Vec<u8>, usize) {
    let mut out = b"CTENFDAM".to_vec();
    out.extend_from_slice(&[0x01, 0x70]);

    let key_plain = [b"neteasecloudmusic".as_slice(), rc4_key].concat();
    let key_blob: Vec<u8> = aes_encode(&key_plain, &CODE_KEY)
        .iter()
        .map(|b| b ^ 0x64)
        .collect();
    segment(&mut out, &key_blob);
    segment(&mut out, meta);
    out.extend_from_slice(&[0u8; 9]);
    segment(&mut out, cover);

    let audio_offset = out.len();
    let mut payload = plain.to_vec();
    NcmKeystream::from_key(rc4_key).unwrap().apply(&mut payload);
    out.extend_from_slice(&payload);
    (out, audio_offset)
}

pub fn xor_container(header: &[u8], header_len: usize, key: &[u8], plain: &[u8]) -> Vec<u8> {
    let mut out = header.to_vec();
    out.resize(header_len, 0);
    out.extend(plain.iter().zip(key.iter().cycle()).map(|(p, k)| p ^ k));
    out
}

pub fn next_u64(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

pub fn random_bytes(state: &mut u64, len: usize) -> Vec<u8> {
    (0..len).map(|_| (next_u64(state) >> 56) as u8).collect()
}

/// MPEG-1 Layer III, 44.1 kHz, joint stereo, then filler.
pub fn mp3_payload(len: usize) -> Vec<u8> {
    let mut out = vec![0xFF, 0xFB, 0x90, 0x44];
    out.extend((0..len.saturating_sub(4)).map(|i| (i * 7) as u8));
    out
}
