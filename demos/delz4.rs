use lz4_frame_stream::LZ4FrameReader;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};

fn main() -> io::Result<()> {
    let mut args = env::args().skip(1);
    let (filename_in, filename_out) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (i, o),
        _ => return Err(io::Error::new(io::ErrorKind::InvalidInput, "usage: delz4 <input> <output>")),
    };
    let file_in = File::open(filename_in)?;
    let file_out = File::create(filename_out)?;
    let mut lz4_reader = LZ4FrameReader::new(file_in)?.into_read();
    let mut buf_writer = BufWriter::with_capacity(32 * 1024, file_out);
    io::copy(&mut lz4_reader, &mut buf_writer)?;
    buf_writer.flush()
}
