//! Lifecycle phase and versioned state snapshots

use serde::{Deserialize, Serialize};

use super::CscMeasurement;

/// Connection lifecycle phase of the single tracked peer.
///
/// Only `Idle`, `Disconnected` and `Failed` accept a new connect;
/// `Connected` is the only phase in which notification frames are applied
/// to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecyclePhase {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
    /// Connect retries exhausted; requires an explicit new connect.
    Failed(String),
}

impl LifecyclePhase {
    /// Whether a connect command is accepted in this phase.
    pub fn accepts_connect(&self) -> bool {
        matches!(
            self,
            LifecyclePhase::Idle | LifecyclePhase::Disconnected | LifecyclePhase::Failed(_)
        )
    }

    /// Whether a disconnect command is accepted in this phase.
    pub fn accepts_disconnect(&self) -> bool {
        matches!(self, LifecyclePhase::Connecting | LifecyclePhase::Connected)
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Idle => write!(f, "Idle"),
            LifecyclePhase::Connecting => write!(f, "Connecting"),
            LifecyclePhase::Connected => write!(f, "Connected"),
            LifecyclePhase::Disconnecting => write!(f, "Disconnecting"),
            LifecyclePhase::Disconnected => write!(f, "Disconnected"),
            LifecyclePhase::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// Immutable view of the session state at one point in time.
///
/// Snapshots are replaced wholesale on every phase transition or accepted
/// measurement, never mutated in place, so a reader can never observe a
/// partially updated pair. `sequence` is strictly increasing per store
/// instance, starting at 0 for the initial Idle/none snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Publish order version. Strictly increasing, no reuse.
    pub sequence: u64,
    /// Lifecycle phase at publish time.
    pub phase: LifecyclePhase,
    /// Most recent measurement, or `None` before the first decoded frame
    /// and after the store leaves `Connected`.
    pub measurement: Option<CscMeasurement>,
}

impl Snapshot {
    /// The snapshot a store starts from before any update.
    pub fn initial() -> Self {
        Self { sequence: 0, phase: LifecyclePhase::Idle, measurement: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_accepted_only_from_rest_states() {
        assert!(LifecyclePhase::Idle.accepts_connect());
        assert!(LifecyclePhase::Disconnected.accepts_connect());
        assert!(LifecyclePhase::Failed("timeout".into()).accepts_connect());
        assert!(!LifecyclePhase::Connecting.accepts_connect());
        assert!(!LifecyclePhase::Connected.accepts_connect());
        assert!(!LifecyclePhase::Disconnecting.accepts_connect());
    }

    #[test]
    fn disconnect_accepted_only_while_attached() {
        assert!(LifecyclePhase::Connecting.accepts_disconnect());
        assert!(LifecyclePhase::Connected.accepts_disconnect());
        assert!(!LifecyclePhase::Idle.accepts_disconnect());
        assert!(!LifecyclePhase::Disconnecting.accepts_disconnect());
        assert!(!LifecyclePhase::Disconnected.accepts_disconnect());
        assert!(!LifecyclePhase::Failed("timeout".into()).accepts_disconnect());
    }

    #[test]
    fn initial_snapshot_is_idle_and_empty() {
        let snapshot = Snapshot::initial();
        assert_eq!(snapshot.sequence, 0);
        assert_eq!(snapshot.phase, LifecyclePhase::Idle);
        assert_eq!(snapshot.measurement, None);
    }
}
