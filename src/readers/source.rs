use crate::error::Result;
use crate::utils::Settings;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Where the bytes of one ingestion come from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A local CSV file
    Path(PathBuf),
    /// An already-received upload held in memory
    Memory(Vec<u8>),
}

impl DataSource {
    pub fn path(path: impl AsRef<Path>) -> Self {
        DataSource::Path(path.as_ref().to_path_buf())
    }

    pub fn describe(&self) -> String {
        match self {
            DataSource::Path(path) => path.display().to_string(),
            DataSource::Memory(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    /// Open the source for reading. The returned reader owns the file handle or mapping.
    pub fn open(self, settings: &Settings) -> Result<Box<dyn Read + Send>> {
        match self {
            DataSource::Path(path) => {
                let file = File::open(&path)?;
                if settings.use_mmap && file.metadata()?.len() > 0 {
                    // SAFETY: the mapping is read-only and only lives as long as the
                    // returned reader; concurrent truncation of the file is not supported.
                    let mmap = unsafe { Mmap::map(&file)? };
                    Ok(Box::new(Cursor::new(mmap)))
                } else {
                    Ok(Box::new(BufReader::with_capacity(
                        settings.buffer_capacity,
                        file,
                    )))
                }
            }
            DataSource::Memory(bytes) => Ok(Box::new(Cursor::new(bytes))),
        }
    }
}
