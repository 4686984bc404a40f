//! Chunk sizes on either side must not change what comes out.

use lz4_frame_stream::framed::{BlockSize, CompressionSettings, LZ4FrameReader};
use proptest::prelude::*;
use std::io::{Read, Write};

fn block_sizes() -> impl Strategy<Value = BlockSize> {
    prop_oneof![Just(BlockSize::Max64KB), Just(BlockSize::Max256KB)]
}

fn payload() -> impl Strategy<Value = Vec<u8>> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..200_000),
        (0..300_000usize, any::<u8>()).prop_map(|(len, byte)| vec![byte; len]),
        prop::collection::vec(0..4u8, 0..150_000),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn chunked_roundtrip(
        data in payload(),
        block_size in block_sizes(),
        write_chunk in 1..70_000usize,
        read_chunk in 1..70_000usize,
        block_checksums in any::<bool>(),
        content_checksum in any::<bool>(),
        declare_size in any::<bool>(),
    ) {
        let mut settings = CompressionSettings::default();
        settings
            .block_size(block_size)
            .block_checksums(block_checksums)
            .content_checksum(content_checksum)
            .content_size(if declare_size { Some(data.len() as u64) } else { None });

        let mut writer = settings.writer(Vec::new());
        for chunk in data.chunks(write_chunk) {
            writer.write_all(chunk).unwrap();
        }
        let frame = writer.finish().unwrap();
        prop_assert_eq!(&frame, &settings.compress_to_vec(&data).unwrap());

        let mut reader = LZ4FrameReader::new(&frame[..]).unwrap().into_read();
        let mut decoded = Vec::new();
        let mut buf = vec![0u8; read_chunk];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            prop_assert!(n <= read_chunk);
            decoded.extend_from_slice(&buf[..n]);
        }
        prop_assert!(decoded == data);
    }
}
