//! phytopet-core: Core types for PhytoPET list-mode processing.
//!
//! This crate holds the detector data model, the fixed scanner geometry
//! used to address histogram bins, coincidence acceptance rules and the
//! decay weighting applied to accepted events.
//!

pub mod decay;
pub mod error;
pub mod event;
pub mod filter;
pub mod geometry;
pub mod hit;

pub use decay::{DecayCorrection, F18_HALF_LIFE_MINUTES};
pub use error::{Error, Result};
pub use event::{Coincidence, Event, MAX_HITS};
pub use filter::{EnergyWindow, EventFilter, FilterStatistics, Rejection, SpatialWindow};
pub use geometry::{crystal_index, max_castor_id, record_index};
pub use hit::{RawHit, HIT_RECORD_SIZE};
