#![allow(dead_code)]

use rand::{Rng, RngCore, SeedableRng, rngs::StdRng};

/// Deterministic test payload: random bytes interleaved with long repetitive runs,
/// so that some blocks compress well and some not at all.
pub fn test_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = vec![0u8; len];
    for chunk in data.chunks_mut(1 << 10) {
        if rng.gen::<bool>() {
            rng.fill_bytes(chunk);
        } else {
            for (i, b) in chunk.iter_mut().enumerate() {
                *b = 0xDEADBEEFu32.to_le_bytes()[i % 4];
            }
        }
    }
    data
}

/// Sizes around the interesting boundaries of a block size.
pub fn sizes_around(block_size: usize) -> Vec<usize> {
    vec![0, 1, 1 << 10, (1 << 10) + 1, block_size - 1, block_size, block_size + 1, 2 * block_size + 17]
}
