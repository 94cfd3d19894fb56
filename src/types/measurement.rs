//! Decoded CSC Measurement values

use serde::{Deserialize, Serialize};

/// Cumulative wheel revolution data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WheelRevolutionData {
    /// Cumulative wheel revolutions since sensor power-on.
    pub revolutions: u32,
    /// Time of the last wheel event, in 1/1024 s units. Wraps at u16::MAX.
    pub last_event_time: u16,
}

/// Cumulative crank revolution data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrankRevolutionData {
    /// Cumulative crank revolutions since sensor power-on.
    pub revolutions: u16,
    /// Time of the last crank event, in 1/1024 s units. Wraps at u16::MAX.
    pub last_event_time: u16,
}

/// One decoded CSC Measurement notification.
///
/// Each frame is self-describing: a group is `Some` exactly when its flag
/// bit was set in the frame, and `None` otherwise. A sensor that reported
/// zero revolutions is therefore distinguishable from one that did not
/// transmit the group at all. Measurements are replaced wholesale on the
/// next frame, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CscMeasurement {
    /// Wheel revolution group, if transmitted.
    pub wheel: Option<WheelRevolutionData>,
    /// Crank revolution group, if transmitted.
    pub crank: Option<CrankRevolutionData>,
}

impl CscMeasurement {
    /// Whether the frame carried neither group. Valid, not an error.
    pub fn is_empty(&self) -> bool {
        self.wheel.is_none() && self.crank.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_measurement_is_empty() {
        let m = CscMeasurement::default();
        assert!(m.is_empty());
        assert_eq!(m.wheel, None);
        assert_eq!(m.crank, None);
    }

    #[test]
    fn zero_values_are_distinct_from_absence() {
        let m = CscMeasurement {
            wheel: Some(WheelRevolutionData { revolutions: 0, last_event_time: 0 }),
            crank: None,
        };
        assert!(!m.is_empty());
        assert_ne!(m, CscMeasurement::default());
    }
}
