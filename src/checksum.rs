//! The xxHash32 checksums used throughout the frame format.
//!
//! All of them use seed 0: the header checksum keeps only the second byte of the hash,
//! block checksums cover the bytes exactly as they appear in the stream, and the content
//! checksum covers the decompressed content of one frame.

use std::hash::Hasher;
use twox_hash::XxHash32;

const SEED: u32 = 0;

/// xxHash32 of `data`.
pub fn checksum(data: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(SEED);
    hasher.write(data);
    hasher.finish() as u32
}

/// The one-byte header checksum: bits 8..16 of the hash over everything between the magic number
/// and the checksum byte itself.
pub fn header_checksum(descriptor: &[u8]) -> u8 {
    (checksum(descriptor) >> 8) as u8
}

/// Incrementally computes the content checksum of a frame.
#[derive(Clone)]
pub struct ContentHasher(XxHash32);

impl ContentHasher {
    /// An empty hasher, seeded like every other checksum in a frame.
    pub fn new() -> Self {
        ContentHasher(XxHash32::with_seed(SEED))
    }

    /// Feed the next piece of content.
    pub fn write(&mut self, data: &[u8]) {
        self.0.write(data);
    }

    /// The checksum of everything written so far. Does not reset the hasher.
    pub fn finish(&self) -> u32 {
        self.0.finish() as u32
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}
