#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_frame_stream::framed::LZ4FrameReader;
use std::io::{self, Read};

fuzz_target!(|data: &[u8]| {
    let compressed = match reference_compress(data) {
        Ok(compressed) => compressed,
        Err(_) => return,
    };
    let mut decompressed = Vec::new();
    LZ4FrameReader::new(&compressed[..])
        .expect("Failed to create reader")
        .into_read()
        .read_to_end(&mut decompressed)
        .expect("Failed to decompress data compressed by the C implementation");
    assert!(data == decompressed.as_slice(), "Decompression result did not match the original input");
});

// liblz4 chains blocks by default, which we do not read
fn reference_compress(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = lz4::EncoderBuilder::new()
        .level(4)
        .block_mode(lz4::BlockMode::Independent)
        .checksum(lz4::ContentChecksum::ChecksumEnabled)
        .build(Vec::new())?;
    io::copy(&mut &data[..], &mut encoder)?;
    let (output, result) = encoder.finish();
    result.map(|()| output)
}
