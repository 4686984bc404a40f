//! The block compression capability the frame layer is built on.
//!
//! The frame format does not care how a block gets compressed, as long as each block
//! can be decompressed on its own. [`Lz4Block`] is the LZ4 block codec everybody expects;
//! other implementations are mostly useful for testing the framing in isolation.

use thiserror::Error;

/// Errors produced by a block codec.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("block compression failed: {0}")]
    Compress(String),
    #[error("block decompression failed (data corruption?): {0}")]
    Decompress(String),
}

/// Compresses a single block, independently of all other blocks.
pub trait BlockCompressor {
    /// Append the compressed form of `input` to `output`.
    ///
    /// The result may well be larger than the input. The frame writer notices that
    /// and stores the block uncompressed instead.
    fn compress_block(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), CodecError>;
}

/// Decompresses a single block produced by the matching [`BlockCompressor`].
pub trait BlockDecompressor {
    /// Append the decompressed form of `input` to `output`.
    ///
    /// `max_len` is the largest block the frame allows; anything that would decompress
    /// to more than that is corrupt.
    fn decompress_block(&mut self, input: &[u8], output: &mut Vec<u8>, max_len: usize) -> Result<(), CodecError>;
}

impl<'a, C: BlockCompressor + ?Sized> BlockCompressor for &'a mut C {
    fn compress_block(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), CodecError> {
        (**self).compress_block(input, output)
    }
}

impl<'a, D: BlockDecompressor + ?Sized> BlockDecompressor for &'a mut D {
    fn decompress_block(&mut self, input: &[u8], output: &mut Vec<u8>, max_len: usize) -> Result<(), CodecError> {
        (**self).decompress_block(input, output, max_len)
    }
}

/// The raw LZ4 block format, as implemented by `lz4_flex`.
///
/// Decompression goes through a scratch buffer that is zeroed once and then reused,
/// so small blocks do not pay for clearing the whole block size every time.
#[derive(Clone, Debug, Default)]
pub struct Lz4Block {
    scratch: Vec<u8>,
}

impl BlockCompressor for Lz4Block {
    fn compress_block(&mut self, input: &[u8], output: &mut Vec<u8>) -> Result<(), CodecError> {
        let start = output.len();
        output.resize(start + lz4_flex::block::get_maximum_output_size(input.len()), 0);
        match lz4_flex::block::compress_into(input, &mut output[start..]) {
            Ok(written) => {
                output.truncate(start + written);
                Ok(())
            }
            Err(e) => {
                output.truncate(start);
                Err(CodecError::Compress(e.to_string()))
            }
        }
    }
}

impl BlockDecompressor for Lz4Block {
    fn decompress_block(&mut self, input: &[u8], output: &mut Vec<u8>, max_len: usize) -> Result<(), CodecError> {
        if self.scratch.len() < max_len {
            self.scratch.resize(max_len, 0);
        }
        let written = lz4_flex::block::decompress_into(input, &mut self.scratch[..max_len])
            .map_err(|e| CodecError::Decompress(e.to_string()))?;
        output.extend_from_slice(&self.scratch[..written]);
        Ok(())
    }
}
