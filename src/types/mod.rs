//! Core types for CSC session state representation.
//!
//! - [`CscFlags`] is the leading flag byte that declares which optional
//!   groups a frame carries
//! - [`CscMeasurement`] is one decoded notification with explicitly
//!   optional groups ([`WheelRevolutionData`], [`CrankRevolutionData`])
//! - [`LifecyclePhase`] and [`Snapshot`] form the versioned state the
//!   store publishes
//! - [`ViewState`] is the pure projection consumed by presentation code

mod flags;
mod measurement;
mod snapshot;
mod view_state;

pub use flags::{CRANK_REV_DATA_PRESENT, CscFlags, WHEEL_REV_DATA_PRESENT};
pub use measurement::{CrankRevolutionData, CscMeasurement, WheelRevolutionData};
pub use snapshot::{LifecyclePhase, Snapshot};
pub use view_state::ViewState;
