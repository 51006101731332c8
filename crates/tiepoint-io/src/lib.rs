//! tiepoint-io - raster I/O
//!
//! PNG decoding of source imagery and PNG encoding of map tiles.

pub mod error;
pub mod png;

pub use error::{IoError, IoResult};
pub use png::{decode_png, encode_png, read_png, write_png};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tiepoint_core::Raster;

/// Read a PNG image from a file path.
pub fn read_image<P: AsRef<Path>>(path: P) -> IoResult<Raster> {
    let file = File::open(path)?;
    read_png(BufReader::new(file))
}

/// Write a raster to a file path as PNG.
pub fn write_image<P: AsRef<Path>>(raster: &Raster, path: P) -> IoResult<()> {
    let file = File::create(path)?;
    write_png(raster, BufWriter::new(file))
}
