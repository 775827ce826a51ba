//! List-mode to histogram conversion.

use crate::config::{ConversionConfig, DEFAULT_PROGRESS_INTERVAL};
use crate::histogram::HistogramStore;
use crate::reader::ListModeFileReader;
use crate::{Error, Result};
use phytopet_core::{
    crystal_index, max_castor_id, DecayCorrection, Event, EventFilter, FilterStatistics,
};
use phytopet_listmode::{ListModeRecord, ListModeStream, RotationState, RunClock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

/// Summary of one conversion run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionStats {
    /// Event records decoded.
    pub events_read: u64,
    /// Events accumulated into the histogram.
    pub events_written: u64,
    /// Position marker records decoded.
    pub markers_read: u64,
    /// Filter outcomes.
    pub filter: FilterStatistics,
    /// Accumulated events per rotation index.
    pub written_per_rotation: BTreeMap<i32, u64>,
    /// Elapsed run time of the last decoded event.
    pub last_elapsed_ms: u64,
    /// Input bytes consumed.
    pub bytes_read: u64,
    /// The input ended inside a record.
    pub truncated: bool,
}

impl ConversionStats {
    /// Writes the statistics as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// Filters events and accumulates their decay-corrected weights.
#[derive(Debug, Clone)]
pub struct HistogramConverter {
    filter: EventFilter,
    decay: DecayCorrection,
    clock: RunClock,
    progress_interval: u64,
}

impl Default for HistogramConverter {
    fn default() -> Self {
        Self::new(EventFilter::default(), DecayCorrection::default())
    }
}

impl HistogramConverter {
    #[must_use]
    pub fn new(filter: EventFilter, decay: DecayCorrection) -> Self {
        Self {
            filter,
            decay,
            clock: RunClock::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Builds a converter from run settings.
    ///
    /// # Errors
    /// Returns an error if the filter or decay settings are invalid.
    pub fn from_config(config: &ConversionConfig) -> Result<Self> {
        Ok(Self::new(config.event_filter()?, config.decay()?)
            .with_clock(RunClock::new(config.clock_tick_ns))
            .with_progress_interval(config.progress_interval))
    }

    #[must_use]
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    /// Events between progress log lines; 0 disables them.
    #[must_use]
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Converts a list-mode stream into `store`.
    ///
    /// A stream that ends inside a record is logged and treated as the end
    /// of the run.
    ///
    /// # Errors
    /// Returns marker violations, crystal index errors, out-of-range
    /// histogram records and I/O errors.
    pub fn convert<R: Read>(&self, input: R, store: &mut HistogramStore) -> Result<ConversionStats> {
        let started = Instant::now();
        let mut stream = ListModeStream::with_clock(input, self.clock);
        let mut stats = ConversionStats::default();

        loop {
            let record = match stream.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(phytopet_listmode::Error::UnexpectedEnd { field, offset }) => {
                    log::warn!("input ends inside {field} at byte {offset}; stopping");
                    stats.truncated = true;
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let ListModeRecord::Event(event) = record else {
                continue;
            };
            stats.events_read += 1;
            stats.last_elapsed_ms = event.elapsed_ms;

            let outcome = self.filter.evaluate(&event);
            stats.filter.record(outcome);
            if outcome.is_ok() {
                let rotation = stream.rotation();
                self.accumulate_event(&event, rotation, store)?;
                stats.events_written += 1;
                *stats
                    .written_per_rotation
                    .entry(rotation.rotation_index)
                    .or_default() += 1;
            }

            if self.progress_interval > 0 && stats.events_read % self.progress_interval == 0 {
                log::info!(
                    "{} events read, {} written, run time {:.3} s",
                    stats.events_read,
                    stats.events_written,
                    ms_to_seconds(stats.last_elapsed_ms)
                );
            }
        }

        stats.markers_read = stream.markers_read();
        stats.bytes_read = stream.position();
        log::info!(
            "conversion done: {} events read, {} written, {} markers, {:.2?} wall time",
            stats.events_read,
            stats.events_written,
            stats.markers_read,
            started.elapsed()
        );
        Ok(stats)
    }

    /// Maps an accepted pair to crystal indices and adds its weight.
    ///
    /// # Errors
    /// Returns an error if the event has fewer than two hits, a crystal index
    /// is invalid, or the pair falls outside the histogram.
    pub fn accumulate_event(
        &self,
        event: &Event,
        rotation: RotationState,
        store: &mut HistogramStore,
    ) -> Result<()> {
        let mut hits = event.module_hits();
        let (Some((m1, h1)), Some((m2, h2))) = (hits.next(), hits.next()) else {
            return Err(Error::InvalidFormat(format!(
                "event with {} hits cannot be histogrammed",
                event.hit_count()
            )));
        };
        let id1 = crystal_index(h1, m1, rotation.rotation_index, rotation.vertical_index)?;
        let id2 = crystal_index(h2, m2, rotation.rotation_index, rotation.vertical_index)?;
        store.accumulate(id1, id2, self.decay.weight(event.elapsed_ms))?;
        Ok(())
    }
}

/// Runs a complete conversion described by `config`.
///
/// # Errors
/// Returns configuration errors, a missing input file, and any conversion
/// error.
pub fn run_conversion(config: &ConversionConfig) -> Result<ConversionStats> {
    config.validate()?;
    let converter = HistogramConverter::from_config(config)?;
    let input = ListModeFileReader::open(&config.input)?;

    let records = max_castor_id(config.max_vertical_index);
    log::info!(
        "converting {} ({} bytes) into {} ({records} records)",
        config.input.display(),
        input.file_size(),
        config.output.display()
    );
    let mut store = HistogramStore::create(&config.output, records)?;
    let stats = converter.convert(input.as_bytes(), &mut store)?;
    store.flush()?;
    Ok(stats)
}

#[allow(clippy::cast_precision_loss)]
fn ms_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use phytopet_core::{Coincidence, RawHit};
    use tempfile::NamedTempFile;

    fn pair_event(slots: Vec<u8>, hits: Vec<RawHit>) -> Event {
        Event::new(Coincidence::new(0, slots), hits, 0)
    }

    #[test]
    fn test_accumulate_event() {
        let file = NamedTempFile::new().unwrap();
        let mut store = HistogramStore::create(file.path(), max_castor_id(0)).unwrap();
        let converter = HistogramConverter::default();

        let event = pair_event(
            vec![0, 2],
            vec![RawHit::new(1, 0, 511), RawHit::new(1, 0, 511)],
        );
        converter
            .accumulate_event(&event, RotationState::default(), &mut store)
            .unwrap();

        // id1 = 1, id2 = 1 + 6 * 35 = 211
        let record = store.read_record(1 + 211 * 12).unwrap();
        assert_eq!((record.crystal_id1, record.crystal_id2), (1, 211));
        assert!((record.weight - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_accumulate_event_needs_pair() {
        let file = NamedTempFile::new().unwrap();
        let mut store = HistogramStore::create(file.path(), 16).unwrap();
        let event = pair_event(vec![1], vec![RawHit::default()]);

        let err = HistogramConverter::default()
            .accumulate_event(&event, RotationState::default(), &mut store)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFormat(_)));
    }

    #[test]
    fn test_pair_past_histogram_end() {
        let file = NamedTempFile::new().unwrap();
        let mut store = HistogramStore::create(file.path(), max_castor_id(0)).unwrap();
        let event = pair_event(
            vec![0, 2],
            vec![RawHit::new(0, 0, 511), RawHit::new(34, 34, 511)],
        );

        let err = HistogramConverter::default()
            .accumulate_event(&event, RotationState::default(), &mut store)
            .unwrap_err();
        assert!(matches!(err, Error::PairOutOfRange { .. }));
    }

    #[test]
    fn test_stats_json() {
        let mut stats = ConversionStats {
            events_read: 3,
            events_written: 2,
            last_elapsed_ms: 1500,
            ..ConversionStats::default()
        };
        stats.filter.accepted = 2;
        stats.filter.rejected_energy = 1;
        stats.written_per_rotation.insert(-1, 2);

        let file = NamedTempFile::new().unwrap();
        stats.write_json(file.path()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        assert_eq!(value["events_read"], 3);
        assert_eq!(value["events_written"], 2);
        assert_eq!(value["filter"]["rejected_energy"], 1);
        assert_eq!(value["written_per_rotation"]["-1"], 2);
        assert_eq!(value["truncated"], false);
    }
}
