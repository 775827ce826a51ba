//! Coincidence header bit fields.
//!
//! The two header bytes carry four 4-bit fields, one per module slot. A field
//! reads `0xF` when its module fired. Fields are numbered by the acquisition
//! firmware, not by byte position:
//!
//! ```text
//!   byte 0: [ field0 | field2 ]     byte 1: [ field1 | field3 ]
//!            hi nib    lo nib                 hi nib    lo nib
//! ```
//!
//! The mask is rebuilt as `field0 << 12 | field2 << 8 | field1 << 4 | field3`
//! and module slots are listed in [`SLOT_TABLE`] order.

use phytopet_core::Coincidence;

/// Size in bytes of an encoded coincidence header.
pub const COINCIDENCE_RECORD_SIZE: usize = 2;

/// Field value of a module that reported a hit.
pub const ACTIVE_NIBBLE: u8 = 0xF;

/// One of the four 4-bit fields of a coincidence header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NibbleField {
    Field0,
    Field1,
    Field2,
    Field3,
}

impl NibbleField {
    /// Extracts this field from the raw header bytes.
    #[inline]
    #[must_use]
    pub fn extract(self, bytes: [u8; COINCIDENCE_RECORD_SIZE]) -> u8 {
        match self {
            NibbleField::Field0 => (bytes[0] >> 4) & 0x0F,
            NibbleField::Field1 => (bytes[1] >> 4) & 0x0F,
            NibbleField::Field2 => bytes[0] & 0x0F,
            NibbleField::Field3 => bytes[1] & 0x0F,
        }
    }

    /// Bit position of this field within the rebuilt mask.
    #[inline]
    #[must_use]
    pub fn mask_shift(self) -> u32 {
        match self {
            NibbleField::Field0 => 12,
            NibbleField::Field2 => 8,
            NibbleField::Field1 => 4,
            NibbleField::Field3 => 0,
        }
    }
}

/// Header field to module slot, in the order slots are reported.
pub const SLOT_TABLE: [(NibbleField, u8); 4] = [
    (NibbleField::Field0, 1),
    (NibbleField::Field2, 0),
    (NibbleField::Field1, 3),
    (NibbleField::Field3, 2),
];

/// Decodes a coincidence header from its two raw bytes.
#[must_use]
pub fn decode_coincidence_bytes(bytes: [u8; COINCIDENCE_RECORD_SIZE]) -> Coincidence {
    let mask = SLOT_TABLE.iter().fold(0u16, |mask, (field, _)| {
        mask | (u16::from(field.extract(bytes)) << field.mask_shift())
    });

    let module_ids = SLOT_TABLE
        .iter()
        .filter(|(field, _)| field.extract(bytes) == ACTIVE_NIBBLE)
        .map(|&(_, slot)| slot)
        .collect();

    Coincidence::new(mask, module_ids)
}

/// Encodes the header bytes that report the given module slots as active.
///
/// Inverse of [`decode_coincidence_bytes`] for well-formed headers.
#[must_use]
pub fn encode_module_slots(slots: &[u8]) -> [u8; COINCIDENCE_RECORD_SIZE] {
    let mut bytes = [0u8; COINCIDENCE_RECORD_SIZE];
    for &(field, slot) in &SLOT_TABLE {
        if slots.contains(&slot) {
            match field {
                NibbleField::Field0 => bytes[0] |= ACTIVE_NIBBLE << 4,
                NibbleField::Field1 => bytes[1] |= ACTIVE_NIBBLE << 4,
                NibbleField::Field2 => bytes[0] |= ACTIVE_NIBBLE,
                NibbleField::Field3 => bytes[1] |= ACTIVE_NIBBLE,
            }
        }
    }
    bytes
}
