//! phytopet-io: File I/O and the conversion pipeline for PhytoPET.
//!
//! This crate reads list-mode acquisitions through memory-mapped files
//! via memmap2 and writes CASToR histogram files.
//!
//! # Key Components
//!
//! - [`HistogramStore`] - Read-modify-write histogram file
//! - [`HistogramFileReader`] - Mapped read-only histogram view
//! - [`HistogramConverter`] - Filter, map and accumulate list-mode events
//! - [`ConversionConfig`] - JSON-loadable run settings
//! - [`EventCsvWriter`] - Text export of decoded events

pub mod config;
mod error;
pub mod histogram;
pub mod pipeline;
mod reader;
mod writer;

pub use config::ConversionConfig;
pub use error::{Error, Result};
pub use histogram::{HistogramRecord, HistogramStore, RECORD_SIZE};
pub use pipeline::{run_conversion, ConversionStats, HistogramConverter};
pub use reader::{HistogramFileReader, ListModeFileReader, MappedFileReader};
pub use writer::{EventCsvWriter, EVENT_CSV_HEADER};
