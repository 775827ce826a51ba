//! Record-level view of a list-mode stream.

use crate::clock::RunClock;
use crate::decoder::ListModeDecoder;
use crate::rotation::{RotationState, RotationTracker, Sentinel};
use crate::Result;
use phytopet_core::Event;
use std::io::Read;

/// One record of the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ListModeRecord {
    /// A position marker; carries the state after applying it.
    Position(RotationState),
    /// A detector event.
    Event(Event),
}

/// Decodes records in order, applying position markers as they appear.
#[derive(Debug)]
pub struct ListModeStream<R> {
    decoder: ListModeDecoder<R>,
    tracker: RotationTracker,
    clock: RunClock,
    events_read: u64,
    markers_read: u64,
    failed: bool,
}

impl<R: Read> ListModeStream<R> {
    /// Creates a stream with the default 4 ns clock.
    pub fn new(reader: R) -> Self {
        Self::with_clock(reader, RunClock::default())
    }

    /// Creates a stream with a custom clock.
    pub fn with_clock(reader: R, clock: RunClock) -> Self {
        Self {
            decoder: ListModeDecoder::new(reader),
            tracker: RotationTracker::new(),
            clock,
            events_read: 0,
            markers_read: 0,
            failed: false,
        }
    }

    /// Position in effect for the next event.
    #[must_use]
    pub fn rotation(&self) -> RotationState {
        self.tracker.state()
    }

    /// Event records decoded so far.
    #[must_use]
    pub fn events_read(&self) -> u64 {
        self.events_read
    }

    /// Position markers decoded so far.
    #[must_use]
    pub fn markers_read(&self) -> u64 {
        self.markers_read
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.decoder.position()
    }

    /// Decodes the next record, or `None` at the end of the stream.
    ///
    /// # Errors
    /// Returns marker protocol violations, truncated records and I/O errors.
    pub fn next_record(&mut self) -> Result<Option<ListModeRecord>> {
        let Some(coincidence) = self.decoder.decode_coincidence()? else {
            return Ok(None);
        };

        if let Some(sentinel) = Sentinel::from_mask(coincidence.mask) {
            let state = self.tracker.handle(sentinel, &mut self.decoder)?;
            self.markers_read += 1;
            return Ok(Some(ListModeRecord::Position(state)));
        }

        let mut hits = Vec::with_capacity(coincidence.hit_count());
        for _ in 0..coincidence.hit_count() {
            hits.push(self.decoder.decode_raw_hit()?);
        }
        let timestamp = self.decoder.decode_timestamp()?;
        let elapsed_ms = self.clock.elapsed_ms(timestamp);

        self.events_read += 1;
        Ok(Some(ListModeRecord::Event(Event::new(
            coincidence,
            hits,
            elapsed_ms,
        ))))
    }
}

impl<R: Read> Iterator for ListModeStream<R> {
    type Item = Result<ListModeRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let record = self.next_record().transpose();
        if matches!(record, Some(Err(_))) {
            self.failed = true;
        }
        record
    }
}
