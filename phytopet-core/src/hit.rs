//! Raw detector hit as emitted by a single module.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Size in bytes of one encoded hit (x, y, energy as big-endian u16).
pub const HIT_RECORD_SIZE: usize = 6;

/// A single module hit: in-module crystal coordinates and deposited energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawHit {
    /// Crystal column within the module.
    pub x: u16,
    /// Crystal row within the module.
    pub y: u16,
    /// Deposited energy in keV.
    pub energy: u16,
}

impl RawHit {
    /// Creates a new hit.
    #[inline]
    #[must_use]
    pub fn new(x: u16, y: u16, energy: u16) -> Self {
        Self { x, y, energy }
    }

    /// Decodes a hit from its 6-byte big-endian wire form.
    #[inline]
    #[must_use]
    pub fn from_be_bytes(bytes: [u8; HIT_RECORD_SIZE]) -> Self {
        Self {
            x: u16::from_be_bytes([bytes[0], bytes[1]]),
            y: u16::from_be_bytes([bytes[2], bytes[3]]),
            energy: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Encodes the hit into its 6-byte big-endian wire form.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; HIT_RECORD_SIZE] {
        let [x0, x1] = self.x.to_be_bytes();
        let [y0, y1] = self.y.to_be_bytes();
        let [e0, e1] = self.energy.to_be_bytes();
        [x0, x1, y0, y1, e0, e1]
    }

    /// Absolute column distance to another hit.
    #[inline]
    #[must_use]
    pub fn dx(&self, other: &Self) -> u16 {
        self.x.abs_diff(other.x)
    }

    /// Absolute row distance to another hit.
    #[inline]
    #[must_use]
    pub fn dy(&self, other: &Self) -> u16 {
        self.y.abs_diff(other.y)
    }
}
