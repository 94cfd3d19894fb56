//! CSC Measurement frame layout and decoding
//!
//! Defines the binary layout of the CSC Measurement notification and the
//! pure decode path from raw notification bytes to [`CscMeasurement`].
//!
//! ## Frame layout
//!
//! 1. **Flags** (1 byte): bit 0: wheel revolution data present, bit 1:
//!    crank revolution data present
//! 2. **Wheel revolution group** (6 bytes, present iff bit 0): cumulative
//!    revolutions (u32 LE) + last event time (u16 LE, 1/1024 s)
//! 3. **Crank revolution group** (4 bytes, present iff bit 1): cumulative
//!    revolutions (u16 LE) + last event time (u16 LE, 1/1024 s)
//!
//! Groups appear in this order regardless of which are present; absent
//! groups contribute zero bytes. Decoding is stateless and deterministic,
//! with explicit little-endian handling and bounds checks on every read.

use std::sync::Arc;

use crate::types::{
    CrankRevolutionData, CscFlags, CscMeasurement, WheelRevolutionData,
};
use crate::{DecodeError, Result};

/// Byte width of the wheel revolution group.
const WHEEL_GROUP_SIZE: usize = 6;
/// Byte width of the crank revolution group.
const CRANK_GROUP_SIZE: usize = 4;

/// One raw notification payload as delivered by the transport.
///
/// Cheap to clone (zero-copy via `Arc`); owned by the decode call and not
/// retained afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    data: Arc<[u8]>,
}

impl RawFrame {
    /// Create a frame from notification bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data: data.into() }
    }

    /// The raw payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl From<Vec<u8>> for RawFrame {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for RawFrame {
    fn from(data: &[u8]) -> Self {
        Self { data: data.into() }
    }
}

/// Decode a CSC Measurement frame.
///
/// Walks the payload with a cursor in the fixed declared group order.
/// A frame whose flag byte announces no groups decodes to an empty
/// [`CscMeasurement`]; that is valid, not an error. Bytes beyond the
/// declared groups are ignored.
///
/// # Errors
///
/// [`DecodeError::Truncated`] when the payload is empty or ends before a
/// flagged group is complete. No partially populated measurement is ever
/// returned.
pub fn decode(frame: &RawFrame) -> Result<CscMeasurement, DecodeError> {
    let data = frame.bytes();
    if data.is_empty() {
        return Err(DecodeError::Truncated { needed: 1, available: 0 });
    }

    let flags = CscFlags::new(data[0]);
    let mut offset = 1;

    let wheel = if flags.wheel_present() {
        let revolutions = read_u32_le(data, offset)?;
        let last_event_time = read_u16_le(data, offset + 4)?;
        offset += WHEEL_GROUP_SIZE;
        Some(WheelRevolutionData { revolutions, last_event_time })
    } else {
        None
    };

    let crank = if flags.crank_present() {
        let revolutions = read_u16_le(data, offset)?;
        let last_event_time = read_u16_le(data, offset + 2)?;
        Some(CrankRevolutionData { revolutions, last_event_time })
    } else {
        None
    };

    Ok(CscMeasurement { wheel, crank })
}

/// Encode a measurement into frame bytes.
///
/// Inverse of [`decode`] for every representable measurement; used by
/// round-trip tests and by transport mocks producing synthetic
/// notifications.
pub fn encode(measurement: &CscMeasurement) -> Vec<u8> {
    let mut flags = 0u8;
    let mut out = Vec::with_capacity(1 + WHEEL_GROUP_SIZE + CRANK_GROUP_SIZE);
    out.push(0);

    if let Some(wheel) = measurement.wheel {
        flags |= crate::types::WHEEL_REV_DATA_PRESENT;
        out.extend_from_slice(&wheel.revolutions.to_le_bytes());
        out.extend_from_slice(&wheel.last_event_time.to_le_bytes());
    }
    if let Some(crank) = measurement.crank {
        flags |= crate::types::CRANK_REV_DATA_PRESENT;
        out.extend_from_slice(&crank.revolutions.to_le_bytes());
        out.extend_from_slice(&crank.last_event_time.to_le_bytes());
    }

    out[0] = flags;
    out
}

/// Safe byte parsing helpers with bounds checking
fn read_u16_le(data: &[u8], offset: usize) -> Result<u16, DecodeError> {
    if offset + 2 > data.len() {
        return Err(DecodeError::Truncated { needed: offset + 2, available: data.len() });
    }
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, DecodeError> {
    if offset + 4 > data.len() {
        return Err(DecodeError::Truncated { needed: offset + 4, available: data.len() });
    }
    Ok(u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]))
}
