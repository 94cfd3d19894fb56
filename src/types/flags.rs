//! Flag byte of the CSC Measurement frame

use serde::{Deserialize, Serialize};

/// Wheel revolution data present (count + last event time follow).
pub const WHEEL_REV_DATA_PRESENT: u8 = 0x01;
/// Crank revolution data present (count + last event time follow).
pub const CRANK_REV_DATA_PRESENT: u8 = 0x02;

/// Leading flag byte of a CSC Measurement frame.
///
/// Bit 0 announces the wheel revolution group, bit 1 the crank revolution
/// group. Remaining bits are reserved and ignored on decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CscFlags(pub u8);

impl CscFlags {
    /// Create flags from the raw byte value.
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Check if a specific flag is set using a bitmask.
    pub fn has_flag(&self, flag: u8) -> bool {
        (self.0 & flag) != 0
    }

    /// Whether the wheel revolution group is present.
    pub fn wheel_present(&self) -> bool {
        self.has_flag(WHEEL_REV_DATA_PRESENT)
    }

    /// Whether the crank revolution group is present.
    pub fn crank_present(&self) -> bool {
        self.has_flag(CRANK_REV_DATA_PRESENT)
    }

    /// Get the raw byte value.
    pub fn value(&self) -> u8 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bits_match_csc_profile() {
        assert_eq!(WHEEL_REV_DATA_PRESENT, 0x01);
        assert_eq!(CRANK_REV_DATA_PRESENT, 0x02);
    }

    #[test]
    fn group_presence_queries() {
        assert!(CscFlags::new(0x01).wheel_present());
        assert!(!CscFlags::new(0x01).crank_present());
        assert!(CscFlags::new(0x02).crank_present());
        assert!(!CscFlags::new(0x02).wheel_present());
        assert!(CscFlags::new(0x03).wheel_present());
        assert!(CscFlags::new(0x03).crank_present());
        assert!(!CscFlags::new(0x00).wheel_present());
        assert!(!CscFlags::new(0x00).crank_present());
    }

    #[test]
    fn reserved_bits_do_not_affect_groups() {
        let flags = CscFlags::new(0xFC);
        assert!(!flags.wheel_present());
        assert!(!flags.crank_present());
        assert_eq!(flags.value(), 0xFC);
    }
}
