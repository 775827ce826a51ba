//! Memory-mapped file readers.
//!

use crate::histogram::{HistogramRecord, RECORD_SIZE};
use crate::{Error, Result};
use memmap2::Mmap;
use phytopet_listmode::ListModeStream;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A memory-mapped file reader.
///
/// Uses memmap2 to efficiently access file contents without
/// loading the entire file into memory.
pub struct MappedFileReader {
    mmap: Mmap,
    path: PathBuf,
}

impl MappedFileReader {
    /// Opens a file for memory-mapped reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        // SAFETY: The file is opened read-only and we assume it is not modified concurrently.
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self {
            mmap,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Returns the file contents as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap[..]
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Returns true if the file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    /// Path of the mapped file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reader for PhytoPET list-mode acquisition files.
pub struct ListModeFileReader {
    reader: MappedFileReader,
}

impl ListModeFileReader {
    /// Opens a list-mode file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or memory-mapped.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        log::debug!(
            "mapped list-mode file {} ({} bytes)",
            reader.path().display(),
            reader.len()
        );
        Ok(Self { reader })
    }

    /// Returns the file size in bytes.
    #[must_use]
    pub fn file_size(&self) -> usize {
        self.reader.len()
    }

    /// Raw stream bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.reader.as_bytes()
    }

    /// Record stream over the mapped bytes.
    #[must_use]
    pub fn stream(&self) -> ListModeStream<&[u8]> {
        ListModeStream::new(self.reader.as_bytes())
    }
}

/// Read-only view of a histogram file.
pub struct HistogramFileReader {
    reader: MappedFileReader,
}

impl HistogramFileReader {
    /// Opens a histogram file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be mapped or is not a whole
    /// number of records.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = MappedFileReader::open(path)?;
        if !(reader.len() as u64).is_multiple_of(RECORD_SIZE) {
            return Err(Error::InvalidFormat(format!(
                "histogram size {} is not a multiple of {RECORD_SIZE} (file: {})",
                reader.len(),
                reader.path().display()
            )));
        }
        Ok(Self { reader })
    }

    /// Number of records in the file.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.reader.len() as u64 / RECORD_SIZE
    }

    /// Record at `index`, if present.
    #[must_use]
    pub fn record(&self, index: u64) -> Option<HistogramRecord> {
        let start = usize::try_from(index.checked_mul(RECORD_SIZE)?).ok()?;
        let bytes = self
            .reader
            .as_bytes()
            .get(start..start + RECORD_SIZE as usize)?;
        Some(HistogramRecord::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Iterates over all records in file order.
    pub fn records(&self) -> impl Iterator<Item = HistogramRecord> + '_ {
        self.reader
            .as_bytes()
            .chunks_exact(RECORD_SIZE as usize)
            .filter_map(|chunk| chunk.try_into().ok())
            .map(HistogramRecord::from_le_bytes)
    }

    /// Iterates over records with a non-zero weight, with their indices.
    pub fn filled_records(&self) -> impl Iterator<Item = (u64, HistogramRecord)> + '_ {
        (0u64..)
            .zip(self.records())
            .filter(|(_, record)| record.weight != 0.0)
    }
}
