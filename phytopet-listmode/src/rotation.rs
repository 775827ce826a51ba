//! Gantry rotation and stage height tracking.
//!
//! Position changes are announced in the stream by a marker mask that is
//! written twice in a row:
//!
//! - `0xAAAA 0xAAAA` (stepped mode) advances one rotation step.
//! - `0xBBBB 0xBBBB angle height` (continuous mode) sets the absolute angle (degrees)
//!   and stage height (mm) as big-endian `i16`.
//!
//! A marker without its repeat means the stream is out of sync and cannot be
//! trusted any further.

use crate::decoder::ListModeDecoder;
use crate::{Error, Result};
use std::fmt;
use std::io::Read;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Marker mask of a stepped rotation record.
pub const STEPPED_MARKER: u16 = 0xAAAA;
/// Marker mask of a continuous position record.
pub const CONTINUOUS_MARKER: u16 = 0xBBBB;
/// Gantry angle covered by one rotation index.
pub const ROTATION_STEP_DEGREES: i32 = 30;
/// Stage travel covered by one vertical index.
pub const VERTICAL_STEP_MM: i32 = 48;

/// Kind of position marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Sentinel {
    /// `0xAAAA` rotation step.
    Stepped,
    /// `0xBBBB` absolute angle/height.
    Continuous,
}

impl Sentinel {
    /// Classifies a coincidence mask.
    #[must_use]
    pub fn from_mask(mask: u16) -> Option<Self> {
        match mask {
            STEPPED_MARKER => Some(Sentinel::Stepped),
            CONTINUOUS_MARKER => Some(Sentinel::Continuous),
            _ => None,
        }
    }

    /// The mask value of this marker.
    #[must_use]
    pub fn marker(self) -> u16 {
        match self {
            Sentinel::Stepped => STEPPED_MARKER,
            Sentinel::Continuous => CONTINUOUS_MARKER,
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentinel::Stepped => write!(f, "stepped rotation ({STEPPED_MARKER:#06x})"),
            Sentinel::Continuous => write!(f, "continuous position ({CONTINUOUS_MARKER:#06x})"),
        }
    }
}

/// How the gantry position is being reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RotationMode {
    /// No marker seen yet.
    #[default]
    Unset,
    /// Incremental rotation steps.
    Stepped,
    /// Absolute angle and height readings.
    Continuous,
}

/// Current gantry position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotationState {
    /// Rotation step index.
    pub rotation_index: i32,
    /// Vertical stage step index.
    pub vertical_index: i32,
    /// Reporting mode.
    pub mode: RotationMode,
}

/// Owns the rotation state and applies position markers to it.
#[derive(Debug, Clone, Default)]
pub struct RotationTracker {
    state: RotationState,
}

impl RotationTracker {
    /// Creates a tracker at rotation 0, height 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current position.
    #[must_use]
    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Consumes the rest of a marker record whose first mask has already been read.
    ///
    /// # Errors
    /// Returns [`Error::MalformedSentinel`] if the repeat mask differs,
    /// [`Error::TruncatedSentinel`] if the stream ends first, or a decoding
    /// error for a truncated angle/height.
    pub fn handle<R: Read>(
        &mut self,
        sentinel: Sentinel,
        decoder: &mut ListModeDecoder<R>,
    ) -> Result<RotationState> {
        let offset = decoder.position();
        let repeat = decoder
            .decode_coincidence()?
            .ok_or(Error::TruncatedSentinel(sentinel))?;

        if repeat.mask != sentinel.marker() {
            return Err(Error::MalformedSentinel {
                sentinel,
                expected: sentinel.marker(),
                found: repeat.mask,
                offset,
            });
        }

        match sentinel {
            Sentinel::Stepped => self.step(),
            Sentinel::Continuous => {
                let angle = decoder.decode_angle()?;
                let height = decoder.decode_height()?;
                self.set_position(angle, height);
            }
        }
        Ok(self.state)
    }

    /// Advances one rotation step.
    pub fn step(&mut self) {
        self.enter_mode(RotationMode::Stepped);
        self.state.rotation_index += 1;
        log::debug!("rotation step -> index {}", self.state.rotation_index);
    }

    /// Sets the absolute position from an angle (degrees) and height (mm).
    pub fn set_position(&mut self, angle: i16, height: i16) {
        self.enter_mode(RotationMode::Continuous);
        self.state.rotation_index = i32::from(angle) / ROTATION_STEP_DEGREES;
        self.state.vertical_index = i32::from(height) / VERTICAL_STEP_MM;
        log::info!(
            "position angle={angle} (rotation {}) height={height} (vertical {})",
            self.state.rotation_index,
            self.state.vertical_index
        );
    }

    fn enter_mode(&mut self, mode: RotationMode) {
        if self.state.mode != mode {
            log::debug!("rotation mode {:?} -> {mode:?}", self.state.mode);
            self.state.mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run_marker(data: &[u8]) -> (RotationTracker, Result<RotationState>) {
        let mut decoder = ListModeDecoder::new(Cursor::new(data.to_vec()));
        let first = decoder.decode_coincidence().unwrap().unwrap();
        let sentinel = Sentinel::from_mask(first.mask).unwrap();
        let mut tracker = RotationTracker::new();
        let result = tracker.handle(sentinel, &mut decoder);
        (tracker, result)
    }

    #[test]
    fn test_sentinel_from_mask() {
        assert_eq!(Sentinel::from_mask(0xAAAA), Some(Sentinel::Stepped));
        assert_eq!(Sentinel::from_mask(0xBBBB), Some(Sentinel::Continuous));
        assert_eq!(Sentinel::from_mask(0x0F0F), None);
    }

    #[test]
    fn test_stepped_marker_increments_rotation() {
        let (tracker, result) = run_marker(&[0xAA, 0xAA, 0xAA, 0xAA]);
        let state = result.unwrap();
        assert_eq!(state.rotation_index, 1);
        assert_eq!(state.vertical_index, 0);
        assert_eq!(state.mode, RotationMode::Stepped);
        assert_eq!(tracker.state(), state);
    }

    #[test]
    fn test_continuous_marker_sets_position() {
        let (_, result) = run_marker(&[0xBB, 0xBB, 0xBB, 0xBB, 0x00, 60, 0x00, 96]);
        let state = result.unwrap();
        assert_eq!(state.rotation_index, 2);
        assert_eq!(state.vertical_index, 2);
        assert_eq!(state.mode, RotationMode::Continuous);
    }

    #[test]
    fn test_continuous_division_truncates() {
        let mut tracker = RotationTracker::new();
        tracker.set_position(89, 47);
        assert_eq!(tracker.state().rotation_index, 2);
        assert_eq!(tracker.state().vertical_index, 0);
        tracker.set_position(-45, -50);
        assert_eq!(tracker.state().rotation_index, -1);
        assert_eq!(tracker.state().vertical_index, -1);
    }

    #[test]
    fn test_modes_can_alternate() {
        let mut tracker = RotationTracker::new();
        tracker.set_position(30, 48);
        tracker.step();
        assert_eq!(tracker.state().rotation_index, 2);
        assert_eq!(tracker.state().vertical_index, 1);
        assert_eq!(tracker.state().mode, RotationMode::Stepped);
    }

    #[test]
    fn test_unrepeated_stepped_marker() {
        let (tracker, result) = run_marker(&[0xAA, 0xAA, 0x0F, 0x0F]);
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedSentinel {
                sentinel: Sentinel::Stepped,
                found: 0x0F0F,
                offset: 2,
                ..
            }
        ));
        assert_eq!(err.sentinel(), Some(Sentinel::Stepped));
        assert_eq!(tracker.state(), RotationState::default());
    }

    #[test]
    fn test_mismatched_markers() {
        let (_, result) = run_marker(&[0xBB, 0xBB, 0xAA, 0xAA]);
        assert_eq!(result.unwrap_err().sentinel(), Some(Sentinel::Continuous));
    }

    #[test]
    fn test_truncated_marker() {
        let (_, result) = run_marker(&[0xAA, 0xAA]);
        assert!(matches!(
            result,
            Err(Error::TruncatedSentinel(Sentinel::Stepped))
        ));

        let (_, result) = run_marker(&[0xBB, 0xBB, 0xBB, 0xBB, 0x00]);
        assert!(matches!(result, Err(Error::UnexpectedEnd { .. })));
    }
}
