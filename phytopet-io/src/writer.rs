//! Text export of decoded list-mode records.

use crate::Result;
use phytopet_core::{Event, MAX_HITS};
use phytopet_listmode::RotationState;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV header for event export. Hit columns are padded to four hits.
pub const EVENT_CSV_HEADER: &str = "mask,slots,rotation_index,vertical_index,\
x0,y0,e0,x1,y1,e1,x2,y2,e2,x3,y3,e3,elapsed_ms";

/// Writes decoded events as CSV, one row per event.
pub struct EventCsvWriter<W: Write> {
    writer: W,
    rows: u64,
}

impl EventCsvWriter<BufWriter<File>> {
    /// Creates a CSV file and writes the header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(BufWriter::new(File::create(path)?))
    }
}

impl<W: Write> EventCsvWriter<W> {
    /// Wraps a writer and emits the header.
    ///
    /// # Errors
    /// Returns an error if writing the header fails.
    pub fn new(mut writer: W) -> Result<Self> {
        writeln!(writer, "{EVENT_CSV_HEADER}")?;
        Ok(Self { writer, rows: 0 })
    }

    /// Writes one event, tagged with the gantry position it was recorded at.
    ///
    /// # Errors
    /// Returns an error if the write fails.
    pub fn write_event(&mut self, event: &Event, rotation: RotationState) -> Result<()> {
        let slots = event
            .coincidence
            .module_ids
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(";");
        write!(
            self.writer,
            "{:#06x},{slots},{},{}",
            event.coincidence.mask, rotation.rotation_index, rotation.vertical_index
        )?;
        for i in 0..MAX_HITS {
            match event.hits.get(i) {
                Some(hit) => write!(self.writer, ",{},{},{}", hit.x, hit.y, hit.energy)?,
                None => write!(self.writer, ",,,")?,
            }
        }
        writeln!(self.writer, ",{}", event.elapsed_ms)?;
        self.rows += 1;
        Ok(())
    }

    /// Rows written so far, excluding the header.
    #[must_use]
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    ///
    /// # Errors
    /// Returns an error if the flush fails.
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phytopet_core::{Coincidence, RawHit};
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_events_csv() {
        let mut writer = EventCsvWriter::new(Vec::new()).unwrap();
        let pair = Event::new(
            Coincidence::new(0x0F0F, vec![1, 3]),
            vec![RawHit::new(1, 2, 500), RawHit::new(3, 4, 520)],
            12,
        );
        let rotation = RotationState {
            rotation_index: 2,
            ..RotationState::default()
        };
        writer.write_event(&pair, rotation).unwrap();
        assert_eq!(writer.rows(), 1);

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], EVENT_CSV_HEADER);
        assert_eq!(lines[1], "0x0f0f,1;3,2,0,1,2,500,3,4,520,,,,,,,12");
        assert_eq!(lines[1].split(',').count(), lines[0].split(',').count());
    }

    #[test]
    fn test_create_file() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = EventCsvWriter::create(file.path()).unwrap();
        writer.flush().unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("mask,slots,"));
        assert_eq!(content.lines().count(), 1);
    }
}
