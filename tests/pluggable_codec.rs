//! The frame layer with block codecs other than LZ4.

use lz4_frame_stream::codec::{BlockCompressor, BlockDecompressor, CodecError};
use lz4_frame_stream::framed::{BlockSize, CompressionSettings, DecompressionError, ErrorCategory, LZ4FrameReader};
use std::io::{Read, Write};

/// Byte-oriented run-length coding: pairs of (run length, byte).
#[derive(Default)]
struct RunLength {
    blocks: usize,
}

impl BlockCompressor for RunLength {
    fn compress_block(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), CodecError> {
        self.blocks += 1;
        let mut rest = input;
        while let Some(&byte) = rest.first() {
            let run = rest.iter().take(255).take_while(|&&b| b == byte).count();
            output.push(run as u8);
            output.push(byte);
            rest = &rest[run..];
        }
        Ok(())
    }
}

impl BlockDecompressor for RunLength {
    fn decompress_block(&mut self, input: &[u8], output: &mut Vec<u8>, max_len: usize) -> Result<(), CodecError> {
        self.blocks += 1;
        if input.len() % 2 != 0 {
            return Err(CodecError::Decompress("odd number of bytes".into()));
        }
        let start = output.len();
        for pair in input.chunks(2) {
            if output.len() - start + pair[0] as usize > max_len {
                return Err(CodecError::Decompress("block too large".into()));
            }
            output.extend(std::iter::repeat(pair[1]).take(pair[0] as usize));
        }
        Ok(())
    }
}

fn runs(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i / 1000) as u8).collect()
}

#[test]
fn custom_codec_roundtrip() {
    let data = runs(200_000);
    let mut settings = CompressionSettings::default();
    settings.block_size(BlockSize::Max64KB).block_checksums(true);

    let mut compressor = RunLength::default();
    let mut writer = settings.writer_with_compressor(Vec::new(), &mut compressor);
    writer.write_all(&data).unwrap();
    let frame = writer.finish().unwrap();
    assert_eq!(compressor.blocks, 4);
    assert!(frame.len() < data.len() / 50);

    let mut decompressor = RunLength::default();
    let mut decoded = Vec::new();
    LZ4FrameReader::with_decompressor(&frame[..], &mut decompressor)
        .unwrap()
        .into_read()
        .read_to_end(&mut decoded)
        .unwrap();
    assert!(decoded == data);
    assert_eq!(decompressor.blocks, 4);
}

#[test]
fn stored_blocks_skip_the_decompressor() {
    // alternating bytes double in size under run-length coding
    let data: Vec<u8> = (0..10_000).map(|i| (i % 2) as u8).collect();
    let mut compressor = RunLength::default();
    let mut writer = CompressionSettings::default().writer_with_compressor(Vec::new(), &mut compressor);
    writer.write_all(&data).unwrap();
    let frame = writer.finish().unwrap();
    let size_field = u32::from_le_bytes([frame[7], frame[8], frame[9], frame[10]]);
    assert_eq!(size_field, (1 << 31) | 10_000);

    let mut decompressor = RunLength::default();
    let mut decoded = Vec::new();
    LZ4FrameReader::with_decompressor(&frame[..], &mut decompressor)
        .unwrap()
        .into_read()
        .read_to_end(&mut decoded)
        .unwrap();
    assert!(decoded == data);
    assert_eq!(decompressor.blocks, 0);
}

#[test]
fn codec_failure_is_corruption() {
    let data = runs(5000);
    let mut settings = CompressionSettings::default();
    settings.content_checksum(false);
    let mut writer = settings.writer_with_compressor(Vec::new(), RunLength::default());
    writer.write_all(&data).unwrap();
    let frame = writer.finish().unwrap();

    // the default LZ4 decompressor cannot make sense of run-length data
    let mut reader = LZ4FrameReader::new(&frame[..]).unwrap();
    let mut block = Vec::new();
    let err = reader.decode_block(&mut block).unwrap_err();
    assert!(matches!(err, DecompressionError::CodecError(_)));
    assert_eq!(err.category(), ErrorCategory::Corruption);
}

#[test]
fn decompressed_size_is_capped_at_block_size() {
    // run-length pairs that expand beyond 64 KiB
    let mut frame = CompressionSettings::default().block_size(BlockSize::Max64KB).content_checksum(false).frame_header().to_bytes();
    let block: Vec<u8> = std::iter::repeat(&[255u8, 7][..]).take(300).flatten().copied().collect();
    frame.extend_from_slice(&(block.len() as u32).to_le_bytes());
    frame.extend_from_slice(&block);
    frame.extend_from_slice(&0u32.to_le_bytes());

    let mut reader = LZ4FrameReader::with_decompressor(&frame[..], RunLength::default()).unwrap();
    let mut output = Vec::new();
    assert!(matches!(reader.decode_block(&mut output), Err(DecompressionError::CodecError(_))));
}
