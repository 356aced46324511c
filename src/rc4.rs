//! RC4 key scheduling and the NCM positional keystream.
//!
//! NCM does not run the textbook RC4 generator. Output byte `n` is computed
//! directly from the permutation table and `(n + 1) mod 256`, with no running
//! `i`/`j` state, so any offset of the payload can be decrypted on its own.
//! Seeking into a partially fetched file relies on this.

use zeroize::Zeroize;

use crate::error::{DecryptError, Result};

/// RC4 S-box after key scheduling. Wiped on drop.
pub struct Rc4Table {
    trunk: [u8; 256],
}

impl Rc4Table {
    pub fn get(&self, index: u8) -> u8 {
        self.trunk[index as usize]
    }
}

impl Drop for Rc4Table {
    fn drop(&mut self) {
        self.trunk.zeroize();
    }
}

/// Standard RC4 key-scheduling algorithm.
pub fn schedule(key: &[u8]) -> Result<Rc4Table> {
    if key.is_empty() {
        return Err(DecryptError::InvalidKeyLength(0));
    }

    let mut trunk = [0u8; 256];
    for (i, v) in trunk.iter_mut().enumerate() {
        *v = i as u8;
    }

    let mut j = 0u8;
    for i in 0..256 {
        j = j.wrapping_add(trunk[i]).wrapping_add(key[i % key.len()]);
        trunk.swap(i, j as usize);
    }
    Ok(Rc4Table { trunk })
}

/// Keystream byte for absolute payload position `n`.
pub fn ncm_keystream_byte(table: &Rc4Table, n: usize) -> u8 {
    let j = (n as u8).wrapping_add(1);
    let a = table.get(j);
    let b = table.get(a.wrapping_add(j));
    table.get(a.wrapping_add(b))
}

/// The 256-byte period of the NCM keystream, precomputed from a table.
pub struct NcmKeystream {
    stream: [u8; 256],
}

impl NcmKeystream {
    pub fn new(table: &Rc4Table) -> Self {
        let mut stream = [0u8; 256];
        for (n, k) in stream.iter_mut().enumerate() {
            *k = ncm_keystream_byte(table, n);
        }
        NcmKeystream { stream }
    }

    pub fn from_key(key: &[u8]) -> Result<Self> {
        schedule(key).map(|table| NcmKeystream::new(&table))
    }

    /// XOR `buf` in place, treating `buf[0]` as payload position `offset`.
    pub fn apply_at(&self, offset: usize, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b ^= self.stream[offset.wrapping_add(i) & 0xff];
        }
    }

    pub fn apply(&self, buf: &mut [u8]) {
        self.apply_at(0, buf)
    }
}

impl Drop for NcmKeystream {
    fn drop(&mut self) {
        self.stream.zeroize();
    }
}
