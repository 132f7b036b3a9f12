//! Byte encoding used by the chain for hashing deploys.
//!
//! Integers are little-endian; strings and byte vectors carry a `u32` length
//! prefix; big unsigned integers (U256/U512) are one length byte followed by
//! the minimal little-endian representation.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Length of every digest on the chain (deploy hash, body hash, account hash).
pub const DIGEST_LENGTH: usize = 32;

pub fn blake2b_256(data: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Append-only byte buffer with the chain's primitive encodings.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Raw bytes with no length prefix (fixed-size fields such as digests).
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Length-prefixed byte vector.
    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.u32(bytes.len() as u32);
        self.raw(bytes)
    }

    pub fn string(&mut self, value: &str) -> &mut Self {
        self.bytes(value.as_bytes())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode an unsigned integer in the U256/U512 wire form.
pub fn encode_big_uint(value: u128) -> Vec<u8> {
    let le = value.to_le_bytes();
    let len = le.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    let mut out = Vec::with_capacity(len + 1);
    out.push(len as u8);
    out.extend_from_slice(&le[..len]);
    out
}

/// Decode the U256/U512 wire form, rejecting values that do not fit in `u128`.
pub fn decode_big_uint(bytes: &[u8]) -> Option<u128> {
    let (&len, rest) = bytes.split_first()?;
    let len = len as usize;
    if rest.len() < len {
        return None;
    }
    let digits = &rest[..len];
    // Leading (high) zero bytes are tolerated; anything beyond 16 significant bytes is not.
    let significant = digits.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    if significant > 16 {
        return None;
    }
    let mut le = [0u8; 16];
    le[..significant].copy_from_slice(&digits[..significant]);
    Some(u128::from_le_bytes(le))
}
