//! phytopet-listmode: PhytoPET list-mode stream decoding.
//!
//! The scanner writes a flat big-endian byte stream of variable-length
//! records:
//!
//! ```text
//! event:       mask(2)  hit(6) * n_hits  timestamp(8)
//! stepped:     0xAAAA   0xAAAA
//! continuous:  0xBBBB   0xBBBB   angle(2)  height(2)
//! ```
//!
//! # Key Components
//!
//! - [`ListModeDecoder`] - Field decoder over any `Read`
//! - [`coincidence`] - Nibble layout of the coincidence header
//! - [`RotationTracker`] - Gantry position state driven by marker records
//! - [`ListModeStream`] - Record iterator tying the above together

pub mod clock;
pub mod coincidence;
pub mod decoder;
mod error;
pub mod rotation;
mod stream;

pub use clock::RunClock;
pub use coincidence::decode_coincidence_bytes;
pub use decoder::{ListModeDecoder, RecordField};
pub use error::{Error, Result};
pub use rotation::{RotationMode, RotationState, RotationTracker, Sentinel};
pub use stream::{ListModeRecord, ListModeStream};
