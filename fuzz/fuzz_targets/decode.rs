#![no_main]
use libfuzzer_sys::fuzz_target;
use lz4_frame_stream::framed::LZ4FrameReader;
use std::io::Read;

fuzz_target!(|data: &[u8]| {
    // garbage input must only ever produce errors
    if let Ok(reader) = LZ4FrameReader::new(data) {
        let mut output = Vec::new();
        let _ = reader.into_read().read_to_end(&mut output);
    }
});
