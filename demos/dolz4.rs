use fehler::{throw, throws};
use lz4_frame_stream::framed::CompressionSettings;
use std::fs::File;
use std::{env, io};

#[throws(io::Error)]
fn main() {
    let mut args = env::args().skip(1);
    let (filename_in, filename_out) = match (args.next(), args.next()) {
        (Some(i), Some(o)) => (i, o),
        _ => throw!(io::Error::new(io::ErrorKind::InvalidInput, "usage: dolz4 <input> <output>")),
    };
    let file_in = File::open(filename_in)?;
    let file_out = File::create(filename_out)?;

    CompressionSettings::default()
        .content_checksum(true)
        .compress_with_size(file_in, io::BufWriter::new(file_out))?;
}
