//! Coincidence and event types.

use crate::hit::RawHit;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of modules that can take part in one coincidence.
pub const MAX_HITS: usize = 4;

/// Coincidence header of a list-mode record.
///
/// `module_ids` lists the module slots (0..=3) that reported a hit, in the
/// order the acquisition firmware encodes them. That order is not numeric
/// and downstream pairing relies on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coincidence {
    /// Raw 16-bit coincidence mask.
    pub mask: u16,
    /// Participating module slots in encoding order.
    pub module_ids: Vec<u8>,
}

impl Coincidence {
    /// Creates a coincidence from a mask and its module list.
    #[must_use]
    pub fn new(mask: u16, module_ids: Vec<u8>) -> Self {
        Self { mask, module_ids }
    }

    /// Number of hits that follow this header in the stream.
    #[inline]
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.module_ids.len()
    }

    /// The first two module slots, if at least two modules fired.
    #[must_use]
    pub fn module_pair(&self) -> Option<(u8, u8)> {
        match self.module_ids.as_slice() {
            [first, second, ..] => Some((*first, *second)),
            _ => None,
        }
    }
}

/// One decoded list-mode event.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Event {
    /// Coincidence header.
    pub coincidence: Coincidence,
    /// One hit per participating module, in header order.
    pub hits: Vec<RawHit>,
    /// Milliseconds since the first timestamp of the run.
    pub elapsed_ms: u64,
}

impl Event {
    /// Creates a new event.
    #[must_use]
    pub fn new(coincidence: Coincidence, hits: Vec<RawHit>, elapsed_ms: u64) -> Self {
        Self {
            coincidence,
            hits,
            elapsed_ms,
        }
    }

    /// Number of hits declared by the coincidence header.
    #[inline]
    #[must_use]
    pub fn hit_count(&self) -> usize {
        self.coincidence.hit_count()
    }

    /// Pairs each hit with the module slot it was read for.
    pub fn module_hits(&self) -> impl Iterator<Item = (u8, &RawHit)> {
        self.coincidence
            .module_ids
            .iter()
            .copied()
            .zip(self.hits.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_pair() {
        assert_eq!(Coincidence::new(0, vec![]).module_pair(), None);
        assert_eq!(Coincidence::new(0, vec![1]).module_pair(), None);
        assert_eq!(Coincidence::new(0, vec![1, 3]).module_pair(), Some((1, 3)));
        assert_eq!(
            Coincidence::new(0, vec![1, 0, 3]).module_pair(),
            Some((1, 0))
        );
    }

    #[test]
    fn test_module_hits_keep_header_order() {
        let event = Event::new(
            Coincidence::new(0x0F0F, vec![0, 2]),
            vec![RawHit::new(1, 2, 500), RawHit::new(3, 4, 510)],
            0,
        );
        let pairs: Vec<_> = event.module_hits().map(|(m, h)| (m, h.x)).collect();
        assert_eq!(pairs, vec![(0, 1), (2, 3)]);
        assert_eq!(event.hit_count(), 2);
    }
}
