#![allow(non_upper_case_globals)]

use byteorder::{LE, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write, ErrorKind};
use thiserror::Error;
use fehler::{throw, throws};
use bitflags::bitflags;
use tracing::debug;

use super::{MAGIC, SKIPPABLE_MAGIC_BASE, SKIPPABLE_MAGIC_MASK};
use super::decompress::DecompressionError;
use crate::checksum;

bitflags! {
    pub struct Flags: u8 {
        const IndependentBlocks = 0b00100000;
        const BlockChecksums    = 0b00010000;
        const ContentSize       = 0b00001000;
        const ContentChecksum   = 0b00000100;
        const DictionaryId      = 0b00000001;
    }
}

/// The only frame format version there is, already shifted into place.
const VERSION: u8 = 1 << 6;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("block size indicator {0} is reserved")]
    UnimplementedBlocksize(u8),
    #[error("file version {0} not supported")]
    UnsupportedVersion(u8),
    #[error("reserved bits in flags set")]
    ReservedFlagBitsSet,
    #[error("reserved bits in bd set")]
    ReservedBdBitsSet,
    #[error("frames with linked blocks are not supported")]
    DependentBlocksUnsupported,
    #[error("frames that require a dictionary are not supported")]
    DictionaryUnsupported,
}

impl Flags {
    #[throws(ParseError)]
    pub fn parse(i: u8) -> Self {
        let version = i >> 6;
        if version != 1 {
            throw!(ParseError::UnsupportedVersion(version));
        }
        if (i & 0b10) != 0 {
            throw!(ParseError::ReservedFlagBitsSet);
        }

        let flags = Flags::from_bits_truncate(i);
        if !flags.independent_blocks() {
            throw!(ParseError::DependentBlocksUnsupported);
        }
        if flags.dictionary_id() {
            throw!(ParseError::DictionaryUnsupported);
        }
        flags
    }

    /// The FLG byte, version bits included.
    pub fn to_byte(self) -> u8 { VERSION | self.bits() }

    pub fn independent_blocks(&self) -> bool { self.contains(Flags::IndependentBlocks) }
    pub fn block_checksums(&self)    -> bool { self.contains(Flags::BlockChecksums) }
    pub fn content_size(&self)       -> bool { self.contains(Flags::ContentSize) }
    pub fn content_checksum(&self)   -> bool { self.contains(Flags::ContentChecksum) }
    pub fn dictionary_id(&self)      -> bool { self.contains(Flags::DictionaryId) }
}

/// The maximum size of a block inside a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockSize {
    Max64KB,
    Max256KB,
    Max1MB,
    Max4MB,
}

impl BlockSize {
    pub const ALL: [BlockSize; 4] = [BlockSize::Max64KB, BlockSize::Max256KB, BlockSize::Max1MB, BlockSize::Max4MB];

    /// The value stored in bits 4..7 of the BD byte.
    pub fn indicator(self) -> u8 {
        match self {
            BlockSize::Max64KB => 4,
            BlockSize::Max256KB => 5,
            BlockSize::Max1MB => 6,
            BlockSize::Max4MB => 7,
        }
    }

    #[throws(ParseError)]
    pub fn from_indicator(indicator: u8) -> Self {
        match indicator {
            4 => BlockSize::Max64KB,
            5 => BlockSize::Max256KB,
            6 => BlockSize::Max1MB,
            7 => BlockSize::Max4MB,
            other => throw!(ParseError::UnimplementedBlocksize(other)),
        }
    }

    pub fn bytes(self) -> usize {
        1 << (self.indicator() * 2 + 8)
    }
}

impl Default for BlockSize {
    fn default() -> Self { BlockSize::Max4MB }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockDescriptor(pub u8); // ??? or what else could "BD" stand for ???
impl BlockDescriptor {
    pub fn new(block_size: BlockSize) -> Self {
        BlockDescriptor(block_size.indicator() << 4)
    }

    #[throws(ParseError)]
    pub fn parse(i: u8) -> Self {
        if (i & 0b10001111) != 0 {
            throw!(ParseError::ReservedBdBitsSet);
        }
        BlockDescriptor(i)
    }

    #[throws(ParseError)]
    pub fn block_size(&self) -> BlockSize {
        BlockSize::from_indicator((self.0 >> 4) & 0b111)?
    }
}

/// Everything the header of a frame says about the frame.
///
/// Writers build this from their settings, readers parse it from the stream.
/// It never changes for the lifetime of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub flags: Flags,
    pub block_size: BlockSize,
    pub content_size: Option<u64>,
}

impl FrameHeader {
    pub fn new(block_size: BlockSize, block_checksums: bool, content_checksum: bool, content_size: Option<u64>) -> Self {
        let mut flags = Flags::IndependentBlocks;
        if block_checksums {
            flags |= Flags::BlockChecksums;
        }
        if content_checksum {
            flags |= Flags::ContentChecksum;
        }
        if content_size.is_some() {
            flags |= Flags::ContentSize;
        }
        FrameHeader { flags, block_size, content_size }
    }

    pub fn block_checksums(&self) -> bool { self.flags.block_checksums() }
    pub fn content_checksum(&self) -> bool { self.flags.content_checksum() }

    /// The serialized header, magic number and checksum byte included.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(15);
        header.extend_from_slice(&MAGIC.to_le_bytes());
        header.push(self.flags.to_byte());
        header.push(BlockDescriptor::new(self.block_size).0);
        if let Some(content_size) = self.content_size {
            header.extend_from_slice(&content_size.to_le_bytes());
        }
        let hc = checksum::header_checksum(&header[4..]); // skip magic for header checksum
        header.push(hc);
        header
    }

    #[throws(io::Error)]
    pub fn write_to<W: Write>(&self, mut writer: W) {
        writer.write_all(&self.to_bytes())?;
    }

    /// Read the next frame header, skipping over any skippable frames in front of it.
    ///
    /// Returns `None` if the reader is exhausted right where a frame would start.
    #[throws(DecompressionError)]
    pub fn read_from<R: Read>(mut reader: R) -> Option<Self> {
        let magic = loop {
            let magic = match read_magic(&mut reader)? {
                Some(magic) => magic,
                None => return None,
            };
            if magic & SKIPPABLE_MAGIC_MASK != SKIPPABLE_MAGIC_BASE {
                break magic;
            }
            let len = reader.read_u32::<LE>()?;
            let skipped = io::copy(&mut reader.by_ref().take(len.into()), &mut io::sink())?;
            if skipped != u64::from(len) {
                throw!(io::Error::new(ErrorKind::UnexpectedEof, "skippable frame is truncated"));
            }
            debug!(magic, len, "skipped skippable frame");
        };
        if magic != MAGIC {
            throw!(DecompressionError::WrongMagic(magic));
        }

        let flags_byte = reader.read_u8()?;
        let flags = Flags::parse(flags_byte)?;
        let bd_byte = reader.read_u8()?;
        let bd = BlockDescriptor::parse(bd_byte)?;

        let mut descriptor = vec![flags_byte, bd_byte];
        let content_size = if flags.content_size() {
            let i = reader.read_u64::<LE>()?;
            descriptor.write_u64::<LE>(i)?;
            Some(i)
        } else {
            None
        };

        let header_checksum_desired = reader.read_u8()?;
        if header_checksum_desired != checksum::header_checksum(&descriptor) {
            throw!(DecompressionError::HeaderChecksumFail);
        }

        let header = FrameHeader { flags, block_size: bd.block_size()?, content_size };
        debug!(flags = ?header.flags, block_size = ?header.block_size, content_size = ?header.content_size, "parsed frame header");
        Some(header)
    }
}

/// Read a little-endian magic number, or `None` if the reader is already at its end.
/// Running out of data halfway through is still an error.
#[throws(io::Error)]
fn read_magic<R: Read>(reader: &mut R) -> Option<u32> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => throw!(e),
        }
    }
    match filled {
        0 => None,
        4 => Some(u32::from_le_bytes(buf)),
        _ => throw!(io::Error::new(ErrorKind::UnexpectedEof, "stream ended inside a magic number")),
    }
}
