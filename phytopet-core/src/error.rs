//! Error types for phytopet-core.

use thiserror::Error;

/// Result type alias for phytopet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for phytopet operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Hit coordinates and detector position do not map to a valid crystal index.
    #[error(
        "crystal index {index} out of range (x={x}, y={y}, module={module_id}, \
         rotation={rotation_index}, vertical={vertical_index})"
    )]
    InvalidCrystalIndex {
        x: u16,
        y: u16,
        module_id: u8,
        rotation_index: i32,
        vertical_index: i32,
        index: i64,
    },

    /// Module slot code outside the fixed four-slot layout.
    #[error("invalid module slot: {0}")]
    InvalidModuleSlot(u8),

    /// Energy window with a lower bound above its upper bound.
    #[error("invalid energy window: [{min}, {max}] keV")]
    InvalidEnergyWindow { min: u16, max: u16 },

    /// Energy window percentage that is not a finite number.
    #[error("invalid energy window percentage: {0}")]
    InvalidEnergyPercent(f64),

    /// Non-positive or non-finite isotope half-life.
    #[error("invalid half-life: {0} min")]
    InvalidHalfLife(f64),
}
