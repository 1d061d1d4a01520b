//! Opening input files, with transparent gzip decompression.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use flate2::read::GzDecoder;

/// Open `path` for reading, decompressing it when the extension is `.gz`
pub fn open_source(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    let reader: Box<dyn Read + Send> = if is_gzip(path) {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(reader)
}

pub fn is_gzip(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "gz")
}
