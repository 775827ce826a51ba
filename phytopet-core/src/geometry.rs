//! Scanner geometry and crystal addressing.
//!
//! The PhytoPET ring holds four physical modules in fixed slots. The gantry
//! rotates through `NUM_ANGULAR_POSITIONS` steps and the stage moves
//! vertically, so each physical module sweeps three virtual detector positions
//! per ring and one ring per vertical step. A crystal index flattens
//! in-module coordinates, virtual detector and vertical step into one address:
//!
//! ```text
//! detector_id = module_id * NUM_ANGULAR_POSITIONS + rotation_index
//! index = x
//!       + y * NUM_DETECTORS_PER_RING * NUM_CRYSTALS_1D
//!       + detector_id * NUM_CRYSTALS_1D
//!       + vertical_index * NUM_DETECTORS_PER_RING * NUM_CRYSTALS_PER_MODULE
//! ```
//!
//! The layout is shared with the reconstruction software, so the arithmetic
//! must stay bit-for-bit identical.

use crate::hit::RawHit;
use crate::{Error, Result};

/// Crystals along one edge of a module.
pub const NUM_CRYSTALS_1D: u32 = 35;
/// Virtual detector positions per ring.
pub const NUM_DETECTORS_PER_RING: u32 = 12;
/// Crystals in one module.
pub const NUM_CRYSTALS_PER_MODULE: u32 = NUM_CRYSTALS_1D * NUM_CRYSTALS_1D;
/// Gantry rotation steps covered by a single physical module.
pub const NUM_ANGULAR_POSITIONS: u32 = 3;
/// Physical module slots in the ring.
pub const NUM_MODULE_SLOTS: u8 = 4;

/// Virtual detector number of a module slot at a given rotation step.
#[inline]
#[must_use]
pub fn detector_id(module_id: u8, rotation_index: i32) -> i64 {
    let module = i64::from(module_id);
    module + module * (i64::from(NUM_ANGULAR_POSITIONS) - 1) + i64::from(rotation_index)
}

/// Flat crystal index of a hit.
///
/// # Errors
/// Returns [`Error::InvalidModuleSlot`] for a slot outside the ring and
/// [`Error::InvalidCrystalIndex`] when the address does not fit in a `u32`
/// (for example after a negative rotation or height reading).
pub fn crystal_index(
    hit: &RawHit,
    module_id: u8,
    rotation_index: i32,
    vertical_index: i32,
) -> Result<u32> {
    if module_id >= NUM_MODULE_SLOTS {
        return Err(Error::InvalidModuleSlot(module_id));
    }

    let ring_row = i64::from(NUM_DETECTORS_PER_RING * NUM_CRYSTALS_1D);
    let ring_plane = i64::from(NUM_DETECTORS_PER_RING * NUM_CRYSTALS_PER_MODULE);

    let index = i64::from(hit.x)
        + i64::from(hit.y) * ring_row
        + detector_id(module_id, rotation_index) * i64::from(NUM_CRYSTALS_1D)
        + i64::from(vertical_index) * ring_plane;

    u32::try_from(index).map_err(|_| Error::InvalidCrystalIndex {
        x: hit.x,
        y: hit.y,
        module_id,
        rotation_index,
        vertical_index,
        index,
    })
}

/// Number of histogram records needed for `max_vertical_index + 1` stage heights.
#[inline]
#[must_use]
pub fn max_castor_id(max_vertical_index: u32) -> u64 {
    u64::from(NUM_DETECTORS_PER_RING)
        * u64::from(NUM_CRYSTALS_PER_MODULE)
        * (1 + u64::from(max_vertical_index))
}

/// Histogram record index of a crystal pair.
#[inline]
#[must_use]
pub fn record_index(id1: u32, id2: u32) -> u64 {
    u64::from(id1) + u64::from(id2) * u64::from(NUM_DETECTORS_PER_RING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_detector_id() {
        assert_eq!(detector_id(0, 0), 0);
        assert_eq!(detector_id(1, 0), 3);
        assert_eq!(detector_id(2, 1), 7);
        assert_eq!(detector_id(3, 2), 11);
    }

    #[test]
    fn test_known_indices() {
        let origin = RawHit::new(0, 0, 511);
        assert_eq!(crystal_index(&origin, 0, 0, 0).unwrap(), 0);

        // x + y*420 + det*35 + v*14700
        let hit = RawHit::new(4, 2, 511);
        assert_eq!(crystal_index(&hit, 2, 1, 0).unwrap(), 4 + 840 + 7 * 35);
        assert_eq!(
            crystal_index(&hit, 2, 1, 3).unwrap(),
            4 + 840 + 7 * 35 + 3 * 14_700
        );
    }

    #[test]
    fn test_deterministic() {
        let hit = RawHit::new(17, 9, 480);
        let first = crystal_index(&hit, 3, 2, 1).unwrap();
        for _ in 0..10 {
            assert_eq!(crystal_index(&hit, 3, 2, 1).unwrap(), first);
        }
    }

    #[test]
    fn test_injective_over_detector_domain() {
        let mut seen = HashSet::new();
        let mut count = 0usize;
        for v in 0..3 {
            for module in 0..NUM_MODULE_SLOTS {
                for rotation in 0..NUM_ANGULAR_POSITIONS as i32 {
                    for y in 0..NUM_CRYSTALS_1D as u16 {
                        for x in 0..NUM_CRYSTALS_1D as u16 {
                            let id = crystal_index(&RawHit::new(x, y, 0), module, rotation, v)
                                .unwrap();
                            assert!(seen.insert(id), "collision at {id}");
                            count += 1;
                        }
                    }
                }
            }
        }
        assert_eq!(seen.len(), count);
        // Indices tile [0, max_castor_id) exactly
        assert_eq!(seen.len() as u64, max_castor_id(2));
        assert_eq!(*seen.iter().max().unwrap() as u64, max_castor_id(2) - 1);
    }

    #[test]
    fn test_negative_position_is_rejected() {
        let hit = RawHit::new(0, 0, 0);
        let err = crystal_index(&hit, 0, -1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidCrystalIndex { index: -35, .. }));
        assert!(crystal_index(&hit, 0, 0, -1).is_err());
    }

    #[test]
    fn test_invalid_module_slot() {
        let hit = RawHit::new(0, 0, 0);
        assert_eq!(
            crystal_index(&hit, 4, 0, 0),
            Err(Error::InvalidModuleSlot(4))
        );
    }

    #[test]
    fn test_store_sizing() {
        assert_eq!(max_castor_id(0), 14_700);
        assert_eq!(max_castor_id(1), 29_400);
        assert_eq!(record_index(5, 3), 41);
    }
}
