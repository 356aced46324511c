//! Decryption of vendor-locked music containers: NCM, the QMC family,
//! MFLAC/MGG, KGM/KGMA and VPR.
//!
//! Everything here is a synchronous, pure transformation over in-memory
//! buffers. Fetching the bytes (whole file or a leading range) is up to the
//! caller.
//!
//! ```no_run
//! let buffer = std::fs::read("song.ncm").unwrap();
//! let audio = music_unboxing::decrypt("song.ncm", &buffer).unwrap();
//! println!("{} {} bytes", audio.mime(), audio.data.len());
//! ```

pub mod aes;
pub mod audio;
pub mod bytes;
pub mod engine;
pub mod error;
pub mod format;
pub mod kgm;
pub mod ncm;
pub mod qmc;
pub mod rc4;
pub mod sniff;
pub mod vpr;

pub use audio::{DecryptedAudio, EmbeddedMetadata, ExtractedInfo};
pub use engine::{decrypt, extract, extract_plain, DEFAULT_PREFIX_LEN};
pub use error::{DecryptError, Result};
pub use format::{detect, FormatTag};
pub use sniff::{AudioInfo, ChannelMode, Codec};
