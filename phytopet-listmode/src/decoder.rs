//! Field-level decoder for the list-mode byte stream.
//!
//! All multi-byte fields are big-endian. Records are variable length, so the
//! decoder only knows how to read individual fields; [`crate::ListModeStream`]
//! strings them together into records.

use crate::coincidence::{decode_coincidence_bytes, COINCIDENCE_RECORD_SIZE};
use crate::{Error, Result};
use phytopet_core::{Coincidence, RawHit, HIT_RECORD_SIZE};
use std::fmt;
use std::io::{ErrorKind, Read};

/// Size in bytes of an event timestamp.
pub const TIMESTAMP_SIZE: usize = 8;

/// Size in bytes of an angle or height field.
pub const POSITION_FIELD_SIZE: usize = 2;

/// The field being decoded, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    Coincidence,
    Hit,
    Timestamp,
    Angle,
    Height,
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordField::Coincidence => "coincidence header",
            RecordField::Hit => "hit data",
            RecordField::Timestamp => "timestamp",
            RecordField::Angle => "angle field",
            RecordField::Height => "height field",
        };
        f.write_str(name)
    }
}

/// Sequential decoder over any byte source.
#[derive(Debug)]
pub struct ListModeDecoder<R> {
    reader: R,
    position: u64,
}

impl<R: Read> ListModeDecoder<R> {
    /// Wraps a byte source.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            position: 0,
        }
    }

    /// Number of bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the next coincidence header.
    ///
    /// Returns `Ok(None)` when fewer than two bytes remain, which marks the
    /// normal end of the stream.
    ///
    /// # Errors
    /// Returns an error if the underlying reader fails.
    pub fn decode_coincidence(&mut self) -> Result<Option<Coincidence>> {
        let mut bytes = [0u8; COINCIDENCE_RECORD_SIZE];
        let filled = self.fill(&mut bytes)?;
        if filled < COINCIDENCE_RECORD_SIZE {
            if filled > 0 {
                log::debug!("ignoring {filled} trailing byte(s) at end of stream");
            }
            return Ok(None);
        }
        Ok(Some(decode_coincidence_bytes(bytes)))
    }

    /// Reads one 6-byte hit.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] if the stream ends inside the hit.
    pub fn decode_raw_hit(&mut self) -> Result<RawHit> {
        let bytes: [u8; HIT_RECORD_SIZE] = self.read_field(RecordField::Hit)?;
        Ok(RawHit::from_be_bytes(bytes))
    }

    /// Reads a 64-bit timestamp in clock ticks.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] if the stream ends inside the timestamp.
    pub fn decode_timestamp(&mut self) -> Result<u64> {
        let bytes: [u8; TIMESTAMP_SIZE] = self.read_field(RecordField::Timestamp)?;
        Ok(u64::from_be_bytes(bytes))
    }

    /// Reads the gantry angle (degrees) of a continuous-mode marker.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] if the stream ends inside the field.
    pub fn decode_angle(&mut self) -> Result<i16> {
        let bytes: [u8; POSITION_FIELD_SIZE] = self.read_field(RecordField::Angle)?;
        Ok(i16::from_be_bytes(bytes))
    }

    /// Reads the stage height (mm) of a continuous-mode marker.
    ///
    /// # Errors
    /// Returns [`Error::UnexpectedEnd`] if the stream ends inside the field.
    pub fn decode_height(&mut self) -> Result<i16> {
        let bytes: [u8; POSITION_FIELD_SIZE] = self.read_field(RecordField::Height)?;
        Ok(i16::from_be_bytes(bytes))
    }

    fn read_field<const N: usize>(&mut self, field: RecordField) -> Result<[u8; N]> {
        let offset = self.position;
        let mut bytes = [0u8; N];
        if self.fill(&mut bytes)? < N {
            return Err(Error::UnexpectedEnd { field, offset });
        }
        Ok(bytes)
    }

    /// Reads until `buf` is full or the source is exhausted.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_event_fields() {
        let data = [
            0x0F, 0x0F, // coincidence
            0x00, 0x05, 0x00, 0x07, 0x01, 0xFF, // hit
            0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0xFF, // timestamp
        ];
        let mut decoder = ListModeDecoder::new(Cursor::new(data));

        let coincidence = decoder.decode_coincidence().unwrap().unwrap();
        assert_eq!(coincidence.mask, 0x0F0F);
        assert_eq!(coincidence.module_ids, vec![0, 2]);

        let hit = decoder.decode_raw_hit().unwrap();
        assert_eq!(hit, RawHit::new(5, 7, 511));

        assert_eq!(decoder.decode_timestamp().unwrap(), 0x0000_0001_0000_00FF);
        assert_eq!(decoder.position(), 16);
        assert!(decoder.decode_coincidence().unwrap().is_none());
    }

    #[test]
    fn test_timestamp_high_bytes() {
        let data = [0xFF, 0x80, 0x00, 0x00, 0x00, 0x00, 0x80, 0x01];
        let mut decoder = ListModeDecoder::new(Cursor::new(data));
        assert_eq!(decoder.decode_timestamp().unwrap(), 0xFF80_0000_0000_8001);
    }

    #[test]
    fn test_signed_position_fields() {
        let data = [0x00, 0x3C, 0xFF, 0xA0];
        let mut decoder = ListModeDecoder::new(Cursor::new(data));
        assert_eq!(decoder.decode_angle().unwrap(), 60);
        assert_eq!(decoder.decode_height().unwrap(), -96);
    }

    #[test]
    fn test_end_of_stream_on_header_is_not_an_error() {
        let mut decoder = ListModeDecoder::new(Cursor::new(Vec::<u8>::new()));
        assert!(decoder.decode_coincidence().unwrap().is_none());

        let mut decoder = ListModeDecoder::new(Cursor::new(vec![0xF0]));
        assert!(decoder.decode_coincidence().unwrap().is_none());
    }

    #[test]
    fn test_truncated_hit() {
        let mut decoder = ListModeDecoder::new(Cursor::new(vec![0x0F, 0x0F, 0x00, 0x01]));
        decoder.decode_coincidence().unwrap();
        let err = decoder.decode_raw_hit().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEnd {
                field: RecordField::Hit,
                offset: 2
            }
        ));
    }
}
