//! Streaming reader and writer for the LZ4 frame format.
//!
//! A frame wraps a sequence of independently compressed blocks in a small header
//! that carries the block size and the integrity checks in use. This crate deals
//! with that framing layer only: the actual block compression is a pluggable
//! capability (see [`codec`]), by default provided by `lz4_flex`.
//!
//! ```
//! use lz4_frame_stream::framed::{CompressionSettings, decompress_frame};
//!
//! let compressed = CompressionSettings::default().compress_to_vec(b"hello hello hello hello").unwrap();
//! let plaintext = decompress_frame(&compressed[..]).unwrap();
//! assert_eq!(plaintext, b"hello hello hello hello");
//! ```

#![forbid(unsafe_code)]

pub mod checksum;
pub mod codec;
pub mod framed;

pub use codec::{BlockCompressor, BlockDecompressor, CodecError, Lz4Block};
pub use framed::{
    decompress_frame, BlockSize, CompressionError, CompressionSettings, DecoderState,
    DecompressionError, ErrorCategory, FrameHeader, LZ4FrameIoReader, LZ4FrameReader,
    LZ4FrameWriter,
};
