//! The LZ4 frame format.
//!
//! A stream is any number of skippable frames and LZ4 frames back to back. Writers
//! produce exactly one LZ4 frame; readers accept the whole thing and present the
//! contents of all LZ4 frames as one continuous byte sequence.

mod compress;
mod decompress;
mod header;

/// The four magic bytes at the start of every LZ4 frame.
const MAGIC: u32 = 0x184D2204;
/// Skippable frames use any magic from `0x184D2A50` to `0x184D2A5F`.
const SKIPPABLE_MAGIC_BASE: u32 = 0x184D2A50;
const SKIPPABLE_MAGIC_MASK: u32 = 0xFFFFFFF0;
/// The frame format sets the high bit of every length field to indicate that the data was not compressed.
const INCOMPRESSIBLE: u32 = 1 << 31;


/// The three ways processing a frame can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The underlying reader or writer failed, or the input ended in the middle of a frame.
    Io,
    /// The input is not a frame we can handle (bad magic, reserved bits, wrong length...).
    Format,
    /// The input looks like a frame but a checksum says it was damaged.
    Corruption,
}

pub use compress::*;
pub use decompress::*;
pub use header::{BlockSize, Flags, BlockDescriptor, FrameHeader, ParseError};
