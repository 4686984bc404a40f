mod common;

use common::{sizes_around, test_data};
use lz4_frame_stream::framed::{decompress_frame, BlockSize, CompressionSettings, LZ4FrameReader};
use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use tempfile::tempfile;

fn settings(block_size: BlockSize, flags: u8, len: usize) -> CompressionSettings {
    let mut settings = CompressionSettings::default();
    settings
        .block_size(block_size)
        .block_checksums(flags & 1 != 0)
        .content_checksum(flags & 2 != 0)
        .content_size(if flags & 4 != 0 { Some(len as u64) } else { None });
    settings
}

#[test]
fn every_flag_combination_and_block_size() {
    for &block_size in &BlockSize::ALL {
        let bytes = block_size.bytes();
        let sizes = match block_size {
            BlockSize::Max64KB | BlockSize::Max256KB => sizes_around(bytes),
            _ => vec![0, 1, (1 << 10) + 1, bytes, bytes + 1],
        };
        let largest = test_data(*sizes.iter().max().unwrap(), 78370789134);

        for flags in 0..8 {
            for &len in &sizes {
                let data = &largest[..len];
                let frame = settings(block_size, flags, len).compress_to_vec(data).unwrap();
                let reader = LZ4FrameReader::new(&frame[..]).unwrap();
                assert_eq!(reader.block_size(), Some(block_size));
                assert_eq!(reader.frame_size(), if flags & 4 != 0 { Some(len as u64) } else { None });

                let mut decoded = Vec::new();
                reader.into_read().read_to_end(&mut decoded).unwrap();
                assert!(decoded == data, "block size {:?}, flags {:03b}, {} bytes", block_size, flags, len);
            }
        }
    }
}

#[test]
fn streaming_writer_matches_one_shot() {
    let data = test_data(300_000, 5378);
    let mut settings = CompressionSettings::default();
    settings.block_size(BlockSize::Max64KB).block_checksums(true);

    let mut writer = settings.writer(Vec::new());
    for chunk in data.chunks(4099) {
        writer.write_all(chunk).unwrap();
    }
    let streamed = writer.finish().unwrap();

    let mut copied = Vec::new();
    settings.compress(&data[..], &mut copied).unwrap();

    assert_eq!(streamed, copied);
    assert_eq!(streamed, settings.compress_to_vec(&data).unwrap());
}

#[test]
fn buf_read_interface() {
    let lines: String = (0..5000).map(|i| format!("line number {}\n", i)).collect();
    let mut settings = CompressionSettings::default();
    settings.block_size(BlockSize::Max64KB);
    let frame = settings.compress_to_vec(lines.as_bytes()).unwrap();

    let reader = LZ4FrameReader::new(&frame[..]).unwrap().into_read();
    let decoded: Vec<String> = reader.lines().collect::<io::Result<_>>().unwrap();
    assert_eq!(decoded.len(), 5000);
    assert_eq!(decoded[4321], "line number 4321");
}

#[test]
fn file_to_file() {
    let data = test_data(5 * 1024 * 1024 + 3, 478278);

    let mut plain = tempfile().unwrap();
    plain.write_all(&data).unwrap();
    plain.seek(SeekFrom::Start(0)).unwrap();

    let mut compressed: File = tempfile().unwrap();
    CompressionSettings::default().compress_with_size(&mut plain, &mut compressed).unwrap();
    compressed.seek(SeekFrom::Start(0)).unwrap();

    let reader = LZ4FrameReader::new(&mut compressed).unwrap();
    assert_eq!(reader.frame_size(), Some(data.len() as u64));
    let mut decoded = Vec::new();
    reader.into_read().read_to_end(&mut decoded).unwrap();
    assert!(decoded == data);
}

#[test]
fn io_copy_both_ways() {
    let data = test_data(1 << 20, 1);
    let mut writer = CompressionSettings::default().writer(Vec::new()).auto_finish();
    io::copy(&mut &data[..], &mut writer).unwrap();
    let frame = writer.finish().unwrap();

    let mut decoded = Vec::new();
    io::copy(&mut LZ4FrameReader::new(&frame[..]).unwrap().into_read(), &mut decoded).unwrap();
    assert!(decoded == data);
    assert!(decompress_frame(&frame[..]).unwrap() == data);
}
