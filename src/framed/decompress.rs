use byteorder::{LE, ReadBytesExt};
use std::io::{self, Read, BufRead, ErrorKind};
use std::cmp;
use std::convert::TryInto;
use thiserror::Error;
use fehler::{throw, throws};
use tracing::{debug, trace};

use super::{ErrorCategory, INCOMPRESSIBLE};
use super::header::{self, BlockSize, FrameHeader};
use crate::checksum::{self, ContentHasher};
use crate::codec::{BlockDecompressor, CodecError, Lz4Block};


/// Errors when decompressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum DecompressionError {
    #[error("error reading from the input you gave me")]
    InputError(#[from] io::Error),
    #[error("the raw block decompression failed (data corruption?)")]
    CodecError(#[from] CodecError),
    #[error("invalid header")]
    HeaderParseError(#[from] header::ParseError),
    #[error("wrong magic number in file header: {0:08x}")]
    WrongMagic(u32),
    #[error("the header checksum was invalid")]
    HeaderChecksumFail,
    #[error("a block checksum was invalid")]
    BlockChecksumFail,
    #[error("the frame checksum was invalid")]
    FrameChecksumFail,
    #[error("the header declared {declared} bytes of content but the frame contained {actual}")]
    ContentSizeMismatch { declared: u64, actual: u64 },
    #[error("stream contains a compressed block with a size so large we can't even compute it (let alone fit the block in memory...)")]
    BlockLengthOverflow,
    #[error("a block decompressed to more data than allowed")]
    BlockSizeOverflow,
}
type Error = DecompressionError; // do it this way for better docs

impl DecompressionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::InputError(_) => ErrorCategory::Io,
            Error::CodecError(_)
            | Error::HeaderChecksumFail
            | Error::BlockChecksumFail
            | Error::FrameChecksumFail => ErrorCategory::Corruption,
            Error::HeaderParseError(_)
            | Error::WrongMagic(_)
            | Error::ContentSizeMismatch { .. }
            | Error::BlockLengthOverflow
            | Error::BlockSizeOverflow => ErrorCategory::Format,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::InputError(e) => e,
            e => io::Error::new(ErrorKind::InvalidData, e),
        }
    }
}

/// Where an [`LZ4FrameReader`] currently is in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecoderState {
    /// Expecting (possibly skippable frames and then) a frame header.
    NeedHeader,
    /// Inside a frame, expecting the next block or the end mark.
    ReadingBlocks,
    /// Saw the end mark; the frame trailer still needs checking.
    EndOfFrame,
    /// The input ended cleanly at a frame boundary. Nothing more will be read.
    ExhaustedStream,
}

/// Bookkeeping for the frame currently being read.
struct Frame {
    header: FrameHeader,
    content_hasher: Option<ContentHasher>,
    bytes_out: u64,
}

/// Wrapper around `LZ4FrameReader` that implements `Read` and `BufRead`.
pub struct LZ4FrameIoReader<R: Read, D: BlockDecompressor = Lz4Block> {
    frame_reader: LZ4FrameReader<R, D>,
    bytes_taken: usize,
    buffer: Vec<u8>,
}
impl<R: Read, D: BlockDecompressor> LZ4FrameIoReader<R, D> {
    pub fn frame_reader(&self) -> &LZ4FrameReader<R, D> { &self.frame_reader }

    /// Give back the underlying reader. Buffered but unread data is lost.
    pub fn into_inner(self) -> R { self.frame_reader.into_inner() }
}
impl<R: Read, D: BlockDecompressor> Read for LZ4FrameIoReader<R, D> {
    #[throws(io::Error)]
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let mybuf = self.fill_buf()?;
        let bytes_to_take = cmp::min(mybuf.len(), buf.len());
        buf[..bytes_to_take].copy_from_slice(&mybuf[..bytes_to_take]);
        self.consume(bytes_to_take);
        bytes_to_take
    }
}
impl<R: Read, D: BlockDecompressor> BufRead for LZ4FrameIoReader<R, D> {
    #[throws(io::Error)]
    fn fill_buf(&mut self) -> &[u8] {
        if self.bytes_taken == self.buffer.len() {
            self.buffer.clear();
            self.frame_reader.decode_block(&mut self.buffer)?;
            self.bytes_taken = 0;
        }
        &self.buffer[self.bytes_taken..]
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_taken += amt;
        assert!(self.bytes_taken <= self.buffer.len(), "You consumed more bytes than I even gave you!");
    }
}

/// Read a stream of LZ4 frames.
///
/// This reader reads the blocks inside a frame one by one. Skippable frames are ignored, and
/// when a frame ends the reader carries on with the next one, if there is any.
pub struct LZ4FrameReader<R: Read, D: BlockDecompressor = Lz4Block> {
    reader: R,
    decompressor: D,
    state: DecoderState,
    frame: Option<Frame>,
    read_buf: Vec<u8>,
    frames_read: u64,
}

impl<R: Read> LZ4FrameReader<R> {
    /// Start reading, parsing the first frame header right away.
    ///
    /// An empty input is fine; it simply contains no data.
    #[throws]
    pub fn new(reader: R) -> Self {
        Self::with_decompressor(reader, Lz4Block::default())?
    }
}

impl<R: Read, D: BlockDecompressor> LZ4FrameReader<R, D> {
    #[throws]
    pub fn with_decompressor(reader: R, decompressor: D) -> Self {
        let mut frame_reader = LZ4FrameReader {
            reader,
            decompressor,
            state: DecoderState::NeedHeader,
            frame: None,
            read_buf: Vec::new(),
            frames_read: 0,
        };
        frame_reader.read_header()?;
        frame_reader
    }

    pub fn state(&self) -> DecoderState { self.state }
    /// The header of the frame being read (or read last).
    pub fn frame_header(&self) -> Option<&FrameHeader> { self.frame.as_ref().map(|f| &f.header) }
    pub fn block_size(&self) -> Option<BlockSize> { self.frame_header().map(|h| h.block_size) }
    pub fn frame_size(&self) -> Option<u64> { self.frame_header().and_then(|h| h.content_size) }
    /// Number of frames read to the end and verified so far.
    pub fn frames_read(&self) -> u64 { self.frames_read }

    pub fn get_ref(&self) -> &R { &self.reader }
    pub fn into_inner(self) -> R { self.reader }

    pub fn into_read(self) -> LZ4FrameIoReader<R, D> {
        LZ4FrameIoReader {
            buffer: Vec::with_capacity(self.block_size().map_or(0, BlockSize::bytes)),
            bytes_taken: 0,
            frame_reader: self,
        }
    }

    /// Decode the next block of content into `output`, moving on to the next frame when necessary.
    ///
    /// Leaves `output` empty once the stream is exhausted.
    #[throws]
    pub fn decode_block(&mut self, output: &mut Vec<u8>) {
        assert!(output.is_empty(), "You must pass an empty buffer to this interface.");

        while output.is_empty() {
            match self.state {
                DecoderState::NeedHeader => self.read_header()?,
                DecoderState::ReadingBlocks => self.read_block(output)?,
                DecoderState::EndOfFrame => self.finish_frame()?,
                DecoderState::ExhaustedStream => return,
            }
        }
    }

    #[throws]
    fn read_header(&mut self) {
        match FrameHeader::read_from(&mut self.reader)? {
            Some(header) => {
                self.frame = Some(Frame {
                    header,
                    content_hasher: if header.content_checksum() { Some(ContentHasher::new()) } else { None },
                    bytes_out: 0,
                });
                self.state = DecoderState::ReadingBlocks;
            }
            None => {
                debug!(frames = self.frames_read, "stream exhausted");
                self.state = DecoderState::ExhaustedStream;
            }
        }
    }

    #[throws]
    fn read_block(&mut self, output: &mut Vec<u8>) {
        let frame = match self.frame.as_mut() {
            Some(frame) => frame,
            None => unreachable!("reading blocks without a frame header"),
        };
        let reader = &mut self.reader;

        let block_length = reader.read_u32::<LE>()?;
        if block_length == 0 {
            self.state = DecoderState::EndOfFrame;
            return;
        }

        let is_compressed = block_length & INCOMPRESSIBLE == 0;
        let block_length: usize = (block_length & !INCOMPRESSIBLE).try_into().or(Err(Error::BlockLengthOverflow))?;

        let block_maxsize = frame.header.block_size.bytes();
        if block_length > block_maxsize {
            throw!(Error::BlockSizeOverflow);
        }

        let buf = &mut self.read_buf;
        buf.resize(block_length, 0);
        reader.read_exact(buf.as_mut_slice())?;

        if frame.header.block_checksums() {
            let checksum = reader.read_u32::<LE>()?;
            if checksum::checksum(&buf[..]) != checksum {
                throw!(Error::BlockChecksumFail);
            }
        }

        if is_compressed {
            self.decompressor.decompress_block(&buf[..], output, block_maxsize)?;
        } else {
            output.extend_from_slice(&buf[..]);
        }

        if output.len() > block_maxsize {
            throw!(Error::BlockSizeOverflow);
        }

        if let Some(hasher) = frame.content_hasher.as_mut() {
            hasher.write(&output[..]);
        }
        frame.bytes_out += output.len() as u64;
        trace!(len = block_length, decoded = output.len(), stored = !is_compressed, "read block");
    }

    #[throws]
    fn finish_frame(&mut self) {
        let frame = match self.frame.as_ref() {
            Some(frame) => frame,
            None => unreachable!("finishing a frame without a frame header"),
        };

        if let Some(hasher) = frame.content_hasher.as_ref() {
            let checksum = self.reader.read_u32::<LE>()?;
            if hasher.finish() != checksum {
                throw!(Error::FrameChecksumFail);
            }
        }
        if let Some(declared) = frame.header.content_size {
            if declared != frame.bytes_out {
                throw!(Error::ContentSizeMismatch { declared, actual: frame.bytes_out });
            }
        }

        debug!(bytes = frame.bytes_out, "finished frame");
        self.frames_read += 1;
        self.state = DecoderState::NeedHeader;
    }
}

/// Convenience wrapper around `LZ4FrameReader` that reads everything into a vector and returns it.
///
/// Unlike going through [`into_read`](LZ4FrameReader::into_read), errors come back as they are
/// instead of wrapped in an `io::Error`.
#[throws]
pub fn decompress_frame<R: Read>(reader: R) -> Vec<u8> {
    let mut frame_reader = LZ4FrameReader::new(reader)?;
    let mut plaintext = Vec::new();
    let mut block = Vec::new();
    loop {
        frame_reader.decode_block(&mut block)?;
        if block.is_empty() {
            break;
        }
        plaintext.extend_from_slice(&block);
        block.clear();
    }
    plaintext
}
