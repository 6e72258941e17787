use flate2::read::GzDecoder;
use hdd_core::error::Result;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Open a data file, transparently decompressing `.gz` files.
pub(crate) fn open_reader(path: &Path) -> Result<Box<dyn Read>> {
    let file = BufReader::new(File::open(path)?);
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}
