//! Transport trait for peer connections
//!
//! The transport is the external collaborator that owns the actual radio
//! link. The session core issues connect/disconnect intents into it and
//! reacts to the events it reports; everything radio-specific (GATT,
//! pairing, platform stacks) lives behind this seam.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::csc::RawFrame;
use crate::Result;

/// Address of the single peer a session tracks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Create a peer id from a transport-level address.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The transport-level address string.
    pub fn address(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PeerId {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Bounded retry policy for a connect operation.
///
/// The transport performs the attempts and reports each failure as a
/// [`TransportEvent::FailedToConnect`]; the session state machine counts
/// those against `max_attempts` to decide when the connect has failed for
/// good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum connect attempts before the session gives up.
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl RetryPolicy {
    /// Inter-attempt delay as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay_ms: 100 }
    }
}

/// Options handed to the transport's connect operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectOptions {
    /// Transport-level auto-reconnect. The session state machine always
    /// disables this and owns reconnection policy itself.
    pub auto_reconnect: bool,
    /// Bounded retry policy for this connect.
    pub retry: RetryPolicy,
}

/// Events reported by the transport.
///
/// A closed variant set consumed by the session driver through pattern
/// matching; there are no other external triggers besides explicit
/// connect/disconnect calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The link to `peer` is established and notifications may flow.
    Connected { peer: PeerId },
    /// One connect attempt to `peer` failed. Reported once per attempt.
    FailedToConnect { peer: PeerId, reason: String },
    /// The link to `peer` is gone, whether requested or not.
    Disconnected { peer: PeerId, reason: Option<String> },
    /// One CSC notification payload arrived.
    Notification { frame: RawFrame },
}

/// Trait for peer link transports
///
/// Designed like a pull-based event source: the session driver owns the
/// transport and alternates between awaiting commands and awaiting
/// [`next_event`](Transport::next_event). `connect` and `disconnect`
/// submit the request; terminal outcomes arrive as events, not as the
/// return value.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Submit a connect request for `peer`.
    ///
    /// The transport performs up to `options.retry.max_attempts` attempts,
    /// `options.retry.delay_ms` apart, reporting each failed attempt as a
    /// [`TransportEvent::FailedToConnect`] and success as
    /// [`TransportEvent::Connected`]. An error from this method means the
    /// request could not even be submitted.
    async fn connect(&mut self, peer: &PeerId, options: ConnectOptions) -> Result<()>;

    /// Submit a disconnect request, aborting any in-flight connect
    /// attempts. Completion arrives as [`TransportEvent::Disconnected`].
    async fn disconnect(&mut self) -> Result<()>;

    /// Get the next transport event.
    ///
    /// Returns:
    /// - `Ok(Some(event))` - new event available
    /// - `Ok(None)` - transport closed (normal termination)
    /// - `Err(e)` - transient transport failure
    ///
    /// Must be cancel-safe: the session driver drops and re-creates this
    /// future around every command it processes.
    async fn next_event(&mut self) -> Result<Option<TransportEvent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_retry_policy_matches_connect_contract() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_ms, 100);
        assert_eq!(policy.delay(), Duration::from_millis(100));
    }

    #[test]
    fn connect_options_default_disables_auto_reconnect() {
        let options = ConnectOptions::default();
        assert!(!options.auto_reconnect);
        assert_eq!(options.retry, RetryPolicy::default());
    }

    #[test]
    fn peer_id_display_is_its_address() {
        let peer = PeerId::from("C4:64:E3:9C:12:01");
        assert_eq!(peer.to_string(), "C4:64:E3:9C:12:01");
        assert_eq!(peer.address(), "C4:64:E3:9C:12:01");
    }
}
