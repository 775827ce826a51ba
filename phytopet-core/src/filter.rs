//! Coincidence acceptance: energy window, line-of-response angle and module pairing.

use crate::event::Event;
use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Positron annihilation photon energy in keV.
pub const ANNIHILATION_ENERGY_KEV: f64 = 511.0;

/// Default lower energy bound (keV).
pub const DEFAULT_ENERGY_MIN: u16 = 408;

/// Default upper energy bound (keV).
pub const DEFAULT_ENERGY_MAX: u16 = 818;

/// Slot difference between the two diametrically opposed modules of a pair.
pub const OPPOSED_SLOT_OFFSET: i16 = 2;

/// Inclusive energy acceptance window in keV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnergyWindow {
    /// Lowest accepted energy.
    pub min: u16,
    /// Highest accepted energy.
    pub max: u16,
}

impl Default for EnergyWindow {
    fn default() -> Self {
        Self {
            min: DEFAULT_ENERGY_MIN,
            max: DEFAULT_ENERGY_MAX,
        }
    }
}

impl EnergyWindow {
    /// Creates a window from explicit bounds.
    ///
    /// # Errors
    /// Returns [`Error::InvalidEnergyWindow`] if `min > max`.
    pub fn new(min: u16, max: u16) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidEnergyWindow { min, max });
        }
        Ok(Self { min, max })
    }

    /// Builds a window from optional percentage overrides of the default bounds.
    ///
    /// The lower bound becomes `511 * (1 - lower/100)` and the upper bound
    /// `511 * (1 + upper/100)`, both truncated. The window is checked once
    /// both bounds are known.
    ///
    /// # Errors
    /// Returns an error if an override is not finite or the resulting
    /// window is empty.
    pub fn from_percent(lower: Option<f64>, upper: Option<f64>) -> Result<Self> {
        let min = match lower {
            Some(pct) => percent_bound(1.0 - check_percent(pct)? / 100.0),
            None => DEFAULT_ENERGY_MIN,
        };
        let max = match upper {
            Some(pct) => percent_bound(1.0 + check_percent(pct)? / 100.0),
            None => DEFAULT_ENERGY_MAX,
        };
        Self::new(min, max)
    }

    /// Whether `energy` lies inside the window (bounds included).
    #[inline]
    #[must_use]
    pub fn contains(&self, energy: u16) -> bool {
        (self.min..=self.max).contains(&energy)
    }
}

fn check_percent(percent: f64) -> Result<f64> {
    if percent.is_finite() {
        Ok(percent)
    } else {
        Err(Error::InvalidEnergyPercent(percent))
    }
}

// Float-to-int `as` truncates toward zero and saturates at the u16 range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_bound(factor: f64) -> u16 {
    (ANNIHILATION_ENERGY_KEV * factor) as u16
}

/// Maximum in-module separation of the two hits of an accepted pair.
///
/// Pairs at or beyond either limit describe oblique lines of response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpatialWindow {
    /// Exclusive limit on `|x0 - x1|`.
    pub max_dx: u16,
    /// Exclusive limit on `|y0 - y1|`.
    pub max_dy: u16,
}

impl Default for SpatialWindow {
    fn default() -> Self {
        Self {
            max_dx: 3,
            max_dy: 20,
        }
    }
}

/// Reason an event was not written to the histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not exactly two hits.
    Multiplicity(usize),
    /// At least one hit energy outside the window.
    Energy,
    /// Hits too far apart in the module plane.
    Spatial,
    /// Modules are not a diametrically opposed pair.
    ModulePair,
}

/// Decides which events contribute to the histogram.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    energy: EnergyWindow,
    spatial: Option<SpatialWindow>,
}

impl EventFilter {
    /// Creates a filter; `spatial` enables the line-of-response angle cut.
    #[must_use]
    pub fn new(energy: EnergyWindow, spatial: bool) -> Self {
        Self {
            energy,
            spatial: spatial.then(SpatialWindow::default),
        }
    }

    /// The energy window in use.
    #[must_use]
    pub fn energy_window(&self) -> EnergyWindow {
        self.energy
    }

    /// Whether the spatial cut is active.
    #[must_use]
    pub fn spatial_enabled(&self) -> bool {
        self.spatial.is_some()
    }

    /// Checks an event, reporting the first failed criterion.
    ///
    /// # Errors
    /// Returns the [`Rejection`] reason for events that must be discarded.
    pub fn evaluate(&self, event: &Event) -> std::result::Result<(), Rejection> {
        let hit_count = event.hit_count();
        if hit_count != 2 || event.hits.len() != 2 {
            return Err(Rejection::Multiplicity(hit_count));
        }

        if !event.hits.iter().all(|hit| self.energy.contains(hit.energy)) {
            return Err(Rejection::Energy);
        }

        if let Some(window) = self.spatial {
            let (a, b) = (&event.hits[0], &event.hits[1]);
            if a.dx(b) >= window.max_dx || a.dy(b) >= window.max_dy {
                return Err(Rejection::Spatial);
            }
        }

        match event.coincidence.module_pair() {
            Some((first, second))
                if i16::from(second) - i16::from(first) == OPPOSED_SLOT_OFFSET =>
            {
                Ok(())
            }
            _ => Err(Rejection::ModulePair),
        }
    }

    /// Whether the event should be written.
    #[inline]
    #[must_use]
    pub fn accepts(&self, event: &Event) -> bool {
        self.evaluate(event).is_ok()
    }
}

/// Accept/reject tallies of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterStatistics {
    pub accepted: u64,
    pub rejected_multiplicity: u64,
    pub rejected_energy: u64,
    pub rejected_spatial: u64,
    pub rejected_module_pair: u64,
}

impl FilterStatistics {
    /// Adds one filter outcome.
    pub fn record(&mut self, outcome: std::result::Result<(), Rejection>) {
        match outcome {
            Ok(()) => self.accepted += 1,
            Err(Rejection::Multiplicity(_)) => self.rejected_multiplicity += 1,
            Err(Rejection::Energy) => self.rejected_energy += 1,
            Err(Rejection::Spatial) => self.rejected_spatial += 1,
            Err(Rejection::ModulePair) => self.rejected_module_pair += 1,
        }
    }

    /// Total rejected events.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected_multiplicity
            + self.rejected_energy
            + self.rejected_spatial
            + self.rejected_module_pair
    }
}
