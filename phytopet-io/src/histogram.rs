//! CASToR histogram file storage.
//!
//! The file is a flat array of fixed-size little-endian records:
//!
//! ```text
//! offset  size  field
//! 0       4     reserved (u32, always 0)
//! 4       4     weight (f32)
//! 8       4     crystal_id1 (u32)
//! 12      4     crystal_id2 (u32)
//! ```
//!
//! A crystal pair `(id1, id2)` owns record `id1 + id2 * 12`.

use crate::{Error, Result};
use phytopet_core::record_index;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Size of one histogram record in bytes.
pub const RECORD_SIZE: u64 = 16;

const WEIGHT_OFFSET: u64 = 4;
const ZERO_CHUNK_RECORDS: usize = 4096;

/// One histogram bin.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistogramRecord {
    pub reserved: u32,
    pub weight: f32,
    pub crystal_id1: u32,
    pub crystal_id2: u32,
}

impl HistogramRecord {
    /// Decodes a record from its on-disk bytes.
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; RECORD_SIZE as usize]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Self {
            reserved: u32::from_le_bytes(word(0)),
            weight: f32::from_le_bytes(word(4)),
            crystal_id1: u32::from_le_bytes(word(8)),
            crystal_id2: u32::from_le_bytes(word(12)),
        }
    }

    /// Encodes the record as stored on disk.
    #[must_use]
    pub fn to_le_bytes(&self) -> [u8; RECORD_SIZE as usize] {
        let mut bytes = [0u8; RECORD_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.reserved.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.weight.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.crystal_id1.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.crystal_id2.to_le_bytes());
        bytes
    }
}

/// Random-access histogram file opened for read-modify-write.
#[derive(Debug)]
pub struct HistogramStore {
    file: File,
    record_count: u64,
}

impl HistogramStore {
    /// Creates (or truncates) a zero-filled histogram of `record_count`
    /// records and opens it for accumulation.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written or reopened.
    pub fn create<P: AsRef<Path>>(path: P, record_count: u64) -> Result<Self> {
        initialize(path.as_ref(), record_count)?;
        Self::open(path)
    }

    /// Opens an existing histogram file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its length is not a
    /// whole number of records.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();
        if !len.is_multiple_of(RECORD_SIZE) {
            return Err(Error::InvalidFormat(format!(
                "histogram size {len} is not a multiple of {RECORD_SIZE} (file: {})",
                path.as_ref().display()
            )));
        }
        Ok(Self {
            file,
            record_count: len / RECORD_SIZE,
        })
    }

    /// Number of records in the file.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    /// Adds `weight` to the bin owned by `(id1, id2)` and stamps the crystal
    /// ids into it. Returns the new bin weight.
    ///
    /// # Errors
    /// Returns [`Error::PairOutOfRange`] if the pair addresses a record past the
    /// end of the file, or an I/O error.
    pub fn accumulate(&mut self, id1: u32, id2: u32, weight: f32) -> Result<f32> {
        let index = record_index(id1, id2);
        if index >= self.record_count {
            return Err(Error::PairOutOfRange {
                id1,
                id2,
                index,
                capacity: self.record_count,
            });
        }
        let offset = index * RECORD_SIZE + WEIGHT_OFFSET;

        let mut current = [0u8; 4];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut current)?;
        let total = f32::from_le_bytes(current) + weight;

        let mut tail = [0u8; 12];
        tail[0..4].copy_from_slice(&total.to_le_bytes());
        tail[4..8].copy_from_slice(&id1.to_le_bytes());
        tail[8..12].copy_from_slice(&id2.to_le_bytes());
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&tail)?;
        Ok(total)
    }

    /// Reads the record at `index`.
    ///
    /// # Errors
    /// Returns [`Error::RecordOutOfRange`] for an index past the end, or an I/O
    /// error.
    pub fn read_record(&mut self, index: u64) -> Result<HistogramRecord> {
        if index >= self.record_count {
            return Err(Error::RecordOutOfRange {
                index,
                capacity: self.record_count,
            });
        }
        let mut bytes = [0u8; RECORD_SIZE as usize];
        self.file.seek(SeekFrom::Start(index * RECORD_SIZE))?;
        self.file.read_exact(&mut bytes)?;
        Ok(HistogramRecord::from_le_bytes(bytes))
    }

    /// Flushes pending writes to disk.
    ///
    /// # Errors
    /// Returns an error if syncing the file fails.
    pub fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn initialize(path: &Path, record_count: u64) -> Result<()> {
    let zeros = [0u8; RECORD_SIZE as usize * ZERO_CHUNK_RECORDS];
    let mut writer = BufWriter::new(File::create(path)?);
    let mut remaining = record_count * RECORD_SIZE;
    while remaining > 0 {
        let n = usize::try_from(remaining).map_or(zeros.len(), |r| r.min(zeros.len()));
        writer.write_all(&zeros[..n])?;
        remaining -= n as u64;
    }
    writer.flush()?;
    log::debug!(
        "initialized {} with {record_count} zero records",
        path.display()
    );
    Ok(())
}
