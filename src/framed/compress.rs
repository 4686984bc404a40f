use byteorder::{LE, WriteBytesExt};
use std::cmp;
use std::io::{self, Read, Write, Seek, SeekFrom, ErrorKind};
use std::ops::{Deref, DerefMut};
use thiserror::Error;
use fehler::{throw, throws};
use tracing::{debug, trace, warn};

use super::{ErrorCategory, INCOMPRESSIBLE};
use super::header::{BlockSize, FrameHeader};
use crate::checksum::{self, ContentHasher};
use crate::codec::{BlockCompressor, CodecError, Lz4Block};


/// Errors when compressing an LZ4 frame.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("error reading from the input you gave me")]
    ReadError(io::Error),
    #[error("error writing to the output you gave me")]
    WriteError(#[from] io::Error),
    #[error("the block compressor failed")]
    CodecError(#[from] CodecError),
    #[error("tried to write more than the declared content size of {declared} bytes")]
    ContentSizeExceeded { declared: u64 },
    #[error("declared a content size of {declared} bytes but got {actual}")]
    ContentSizeMismatch { declared: u64, actual: u64 },
    #[error("the frame writer is unusable after an earlier error")]
    Failed,
}
type Error = CompressionError; // do it this way for better docs

impl CompressionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ContentSizeExceeded { .. } | Error::ContentSizeMismatch { .. } => ErrorCategory::Format,
            _ => ErrorCategory::Io,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::ReadError(e) | Error::WriteError(e) => e,
            e if e.category() == ErrorCategory::Format => io::Error::new(ErrorKind::InvalidInput, e),
            e => io::Error::new(ErrorKind::Other, e),
        }
    }
}

/// A builder-style struct that configures compression settings.
/// This is how you compress LZ4 frames.
/// (An LZ4 file usually consists of a single frame.)
///
/// Create it using `Default::default()`.
#[derive(Clone, Debug)]
pub struct CompressionSettings {
    block_checksums: bool,
    content_checksum: bool,
    block_size: BlockSize,
    content_size: Option<u64>,
}
impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            block_checksums: false,
            content_checksum: true,
            block_size: BlockSize::Max4MB,
            content_size: None,
        }
    }
}
impl CompressionSettings {
    /// Block checksums can help detect data corruption in storage and transit.
    /// They do not offer error correction though.
    ///
    /// In most cases, block checksums are not very helpful because you generally want a lower
    /// layer to deal with data corruption more comprehensively.
    ///
    /// Block checksums are disabled by default.
    pub fn block_checksums(&mut self, v: bool) -> &mut Self {
        self.block_checksums = v;
        self
    }

    /// The content checksum (also called frame checksum) is calculated over the contents of the entire frame.
    /// This makes them cheaper than block checksums as their size overhead is constant
    /// as well as marginally more useful, because they can help protect against incorrect decompression.
    ///
    /// Note that the content checksum can only be verified *after* the entire frame has been read
    /// (and returned!), which is the downside of content checksums.
    ///
    /// Frame checksums are enabled by default.
    pub fn content_checksum(&mut self, v: bool) -> &mut Self {
        self.content_checksum = v;
        self
    }

    /// The default block size is 4 MiB.
    ///
    /// Both the writer and any reader keep one block worth of data in memory, so
    /// smaller blocks are friendlier to memory-constrained readers at a small cost in ratio.
    pub fn block_size(&mut self, v: BlockSize) -> &mut Self {
        self.block_size = v;
        self
    }

    /// Declare the exact number of bytes the frame is going to contain.
    ///
    /// The size ends up in the frame header. Writers refuse to write more than that,
    /// and finishing a frame with fewer bytes is an error too.
    ///
    /// By default, no content size is declared.
    pub fn content_size(&mut self, v: Option<u64>) -> &mut Self {
        self.content_size = v;
        self
    }

    /// The header of the frame these settings produce.
    pub fn frame_header(&self) -> FrameHeader {
        FrameHeader::new(self.block_size, self.block_checksums, self.content_checksum, self.content_size)
    }

    /// Start a frame on `writer`, compressing blocks with LZ4.
    pub fn writer<W: Write>(&self, writer: W) -> LZ4FrameWriter<W> {
        self.writer_with_compressor(writer, Lz4Block::default())
    }

    /// Start a frame on `writer`, compressing blocks with the given compressor.
    pub fn writer_with_compressor<W: Write, C: BlockCompressor>(&self, writer: W, compressor: C) -> LZ4FrameWriter<W, C> {
        LZ4FrameWriter::new(writer, compressor, self.frame_header())
    }

    #[throws]
    pub fn compress<R: Read, W: Write>(&self, reader: R, writer: W) {
        self.compress_internal(reader, writer, self.content_size)?;
    }

    #[throws]
    pub fn compress_with_size_unchecked<R: Read, W: Write>(&self, reader: R, writer: W, content_size: u64) {
        self.compress_internal(reader, writer, Some(content_size))?;
    }

    #[throws]
    pub fn compress_with_size<R: Read + Seek, W: Write>(&self, mut reader: R, writer: W) {
        // we want to ignore all bytes before the cursor, which stream_len() would not
        let start = reader.seek(SeekFrom::Current(0)).map_err(Error::ReadError)?;
        let end = reader.seek(SeekFrom::End(0)).map_err(Error::ReadError)?;
        reader.seek(SeekFrom::Start(start)).map_err(Error::ReadError)?;

        // a cursor past the end has nothing left to read
        let length = end.saturating_sub(start);
        self.compress_internal(reader, writer, Some(length))?;
    }

    /// Compress `input` into a single in-memory frame.
    #[throws]
    pub fn compress_to_vec(&self, input: &[u8]) -> Vec<u8> {
        let mut frame = self.writer(Vec::new());
        frame.push(input)?;
        frame.finish()?
    }

    #[throws]
    fn compress_internal<R: Read, W: Write>(&self, mut reader: R, writer: W, content_size: Option<u64>) {
        let mut settings = self.clone();
        settings.content_size(content_size);
        let mut frame = settings.writer(writer);

        let block_size = self.block_size.bytes();
        let mut in_buffer = Vec::with_capacity(block_size);
        loop {
            // We basically want read_exact semantics, except at the end.
            // Sadly read_exact specifies the buffer contents to be undefined
            // on error, so we have to use this construction instead.
            in_buffer.clear();
            reader.by_ref().take(block_size as u64).read_to_end(&mut in_buffer).map_err(Error::ReadError)?;
            if in_buffer.is_empty() {
                break;
            }
            frame.push(&in_buffer)?;
        }
        frame.finish()?;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum WriterState {
    Open,
    Failed,
}

/// Writes a single LZ4 frame to the underlying writer.
///
/// Data is collected until a full block is available, which is then compressed and written out.
/// The frame is only complete once [`finish`](LZ4FrameWriter::finish) has been called; if you
/// would rather have that happen when the writer goes out of scope, use
/// [`auto_finish`](LZ4FrameWriter::auto_finish).
///
/// Any error leaves the writer unusable: it will not touch the underlying writer again and
/// all further calls fail with [`CompressionError::Failed`].
pub struct LZ4FrameWriter<W: Write, C: BlockCompressor = Lz4Block> {
    writer: W,
    compressor: C,
    header: FrameHeader,
    header_written: bool,
    in_buffer: Vec<u8>,
    out_buffer: Vec<u8>,
    content_hasher: Option<ContentHasher>,
    bytes_in: u64,
    state: WriterState,
}

impl<W: Write, C: BlockCompressor> LZ4FrameWriter<W, C> {
    fn new(writer: W, compressor: C, header: FrameHeader) -> Self {
        LZ4FrameWriter {
            writer,
            compressor,
            header,
            header_written: false,
            in_buffer: Vec::with_capacity(header.block_size.bytes()),
            out_buffer: Vec::new(),
            content_hasher: if header.content_checksum() { Some(ContentHasher::new()) } else { None },
            bytes_in: 0,
            state: WriterState::Open,
        }
    }

    pub fn frame_header(&self) -> &FrameHeader { &self.header }

    /// Number of uncompressed bytes accepted so far.
    pub fn bytes_written(&self) -> u64 { self.bytes_in }

    pub fn get_ref(&self) -> &W { &self.writer }

    /// Wrap this writer so that the frame is finished when it is dropped.
    pub fn auto_finish(self) -> AutoFinishWriter<W, C> {
        AutoFinishWriter(Some(self))
    }

    /// Complete the frame: write the last block, the end mark and the content checksum.
    #[throws]
    pub fn finish(mut self) -> W {
        self.guarded(Self::finish_frame)?;
        debug!(bytes = self.bytes_in, "finished frame");
        self.writer
    }

    #[throws]
    fn push(&mut self, data: &[u8]) {
        if self.state != WriterState::Open {
            throw!(Error::Failed);
        }
        if let Some(declared) = self.header.content_size {
            if self.bytes_in + data.len() as u64 > declared {
                throw!(Error::ContentSizeExceeded { declared });
            }
        }
        if !data.is_empty() {
            self.guarded(|this| this.buffer(data))?;
        }
    }

    /// Run `f`, marking the writer as failed if it returns an error.
    #[throws]
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Error>) -> T {
        if self.state != WriterState::Open {
            throw!(Error::Failed);
        }
        match f(self) {
            Ok(v) => v,
            Err(e) => {
                self.state = WriterState::Failed;
                throw!(e);
            }
        }
    }

    #[throws]
    fn buffer(&mut self, mut data: &[u8]) {
        self.write_header()?;

        let block_size = self.header.block_size.bytes();
        while !data.is_empty() {
            let room = block_size - self.in_buffer.len();
            let (now, later) = data.split_at(cmp::min(room, data.len()));
            self.in_buffer.extend_from_slice(now);
            self.bytes_in += now.len() as u64;
            if let Some(x) = self.content_hasher.as_mut() {
                x.write(now);
            }
            if self.in_buffer.len() == block_size {
                self.flush_block()?;
            }
            data = later;
        }
    }

    #[throws]
    fn write_header(&mut self) {
        if !self.header_written {
            self.header.write_to(&mut self.writer)?;
            self.header_written = true;
        }
    }

    /// Compress and write out whatever is buffered. Never writes an empty block.
    #[throws]
    fn flush_block(&mut self) {
        if self.in_buffer.is_empty() {
            return;
        }

        self.out_buffer.clear();
        self.compressor.compress_block(&self.in_buffer, &mut self.out_buffer)?;

        // never let a block grow: if compression did not help, store the block as-is
        let (size_field, block) = if self.out_buffer.len() < self.in_buffer.len() {
            (self.out_buffer.len() as u32, &self.out_buffer[..])
        } else {
            (self.in_buffer.len() as u32 | INCOMPRESSIBLE, &self.in_buffer[..])
        };

        self.writer.write_u32::<LE>(size_field)?;
        self.writer.write_all(block)?;
        if self.header.block_checksums() {
            self.writer.write_u32::<LE>(checksum::checksum(block))?;
        }
        trace!(len = self.in_buffer.len(), written = block.len(), stored = size_field & INCOMPRESSIBLE != 0, "wrote block");

        self.in_buffer.clear();
    }

    #[throws]
    fn finish_frame(&mut self) {
        if let Some(declared) = self.header.content_size {
            if declared != self.bytes_in {
                throw!(Error::ContentSizeMismatch { declared, actual: self.bytes_in });
            }
        }

        self.write_header()?;
        self.flush_block()?;
        self.writer.write_u32::<LE>(0)?;
        if let Some(x) = self.content_hasher.as_ref() {
            self.writer.write_u32::<LE>(x.finish())?;
        }
        self.writer.flush()?;
    }
}

impl<W: Write, C: BlockCompressor> Write for LZ4FrameWriter<W, C> {
    #[throws(io::Error)]
    fn write(&mut self, buf: &[u8]) -> usize {
        self.push(buf)?;
        buf.len()
    }

    /// Flushes the underlying writer. This does *not* end the current block early,
    /// so everything still buffered for the current block stays buffered.
    #[throws(io::Error)]
    fn flush(&mut self) {
        self.guarded(|this| this.writer.flush().map_err(Error::from))?;
    }
}

/// Finishes the wrapped frame when dropped.
///
/// Errors while finishing on drop cannot be reported and are only logged; call
/// [`finish`](AutoFinishWriter::finish) explicitly to see them.
pub struct AutoFinishWriter<W: Write, C: BlockCompressor = Lz4Block>(Option<LZ4FrameWriter<W, C>>);

impl<W: Write, C: BlockCompressor> AutoFinishWriter<W, C> {
    #[throws]
    pub fn finish(mut self) -> W {
        self.0.take().expect("AutoFinishWriter: inner writer missing").finish()?
    }
}

impl<W: Write, C: BlockCompressor> Drop for AutoFinishWriter<W, C> {
    fn drop(&mut self) {
        if let Some(inner) = self.0.take() {
            match inner.finish() {
                Ok(_) | Err(Error::Failed) => {}
                Err(e) => warn!(error = %e, "failed to finish frame on drop"),
            }
        }
    }
}

impl<W: Write, C: BlockCompressor> Deref for AutoFinishWriter<W, C> {
    type Target = LZ4FrameWriter<W, C>;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref().expect("AutoFinishWriter: inner writer missing")
    }
}

impl<W: Write, C: BlockCompressor> DerefMut for AutoFinishWriter<W, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut().expect("AutoFinishWriter: inner writer missing")
    }
}

impl<W: Write, C: BlockCompressor> Write for AutoFinishWriter<W, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.deref_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.deref_mut().flush()
    }
}
