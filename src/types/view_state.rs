//! Projection of snapshots onto presentation states

use serde::{Deserialize, Serialize};

use super::{CscMeasurement, Snapshot};

/// Closed set of presentation states derived from a [`Snapshot`].
///
/// This is the seam to the presentation layer: consumers render one of
/// these and never inspect raw session state. The last good reading stays
/// visible for as long as the snapshot still carries a measurement, which
/// covers teardown phases where the store has not yet cleared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewState {
    /// Nothing to show yet: connecting, idle, or no frame decoded so far.
    Loading,
    /// A measurement is available for display.
    DisplayData(CscMeasurement),
}

impl ViewState {
    /// Project a snapshot onto its presentation state.
    ///
    /// Total and pure: `DisplayData` exactly when the snapshot carries a
    /// measurement, `Loading` otherwise. Deliberately independent of the
    /// lifecycle phase so the projection stays a function of the snapshot
    /// alone.
    pub fn project(snapshot: &Snapshot) -> Self {
        match snapshot.measurement {
            Some(measurement) => ViewState::DisplayData(measurement),
            None => ViewState::Loading,
        }
    }
}

impl From<&Snapshot> for ViewState {
    fn from(snapshot: &Snapshot) -> Self {
        ViewState::project(snapshot)
    }
}
