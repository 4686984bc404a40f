#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_frame_stream::framed::{decompress_frame, BlockSize, CompressionSettings};
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // the first byte picks the options and the write chunk size
    let (options, payload) = match data.split_first() {
        Some((&options, payload)) => (options, payload),
        None => return,
    };
    let mut settings = CompressionSettings::default();
    settings
        .block_size(BlockSize::ALL[(options & 3) as usize])
        .block_checksums(options & 4 != 0)
        .content_checksum(options & 8 != 0)
        .content_size(if options & 16 != 0 { Some(payload.len() as u64) } else { None });

    let chunk = (options as usize >> 5) * 997 + 1;
    let mut writer = settings.writer(Vec::new());
    for piece in payload.chunks(chunk) {
        writer.write_all(piece).expect("Could not compress input data");
    }
    let frame = writer.finish().expect("Could not finish the frame");

    let roundtripped = decompress_frame(&frame[..]).expect("Could not read decompressed data");
    assert!(roundtripped == payload);
});
