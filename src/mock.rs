//! Scriptable in-memory transport for tests
//!
//! [`MockTransport`] implements the [`Transport`] seam without any radio:
//! a paired [`MockController`] scripts connect outcomes, injects
//! notification frames and link events, and records the calls the session
//! driver makes. Integration tests drive whole session lifecycles with it;
//! downstream crates can use it the same way.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::transport::{ConnectOptions, PeerId, Transport, TransportEvent};
use crate::{Result, SessionError};

/// Calls recorded by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect { peer: PeerId, options: ConnectOptions },
    Disconnect,
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    /// Event batches replayed on the next connect call, oldest first.
    connect_scripts: VecDeque<Vec<TransportEvent>>,
    /// Error returned by the next connect submission, if set.
    connect_error: Option<String>,
    /// Acknowledge disconnects with a `Disconnected` event automatically.
    auto_ack_disconnect: bool,
    /// Peer of the most recent connect call, used for auto-acks.
    last_peer: Option<PeerId>,
}

/// Create a connected transport/controller pair.
pub fn mock_transport() -> (MockTransport, MockController) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let state = Arc::new(Mutex::new(MockState { auto_ack_disconnect: true, ..Default::default() }));
    let transport = MockTransport { events: event_rx, event_tx: event_tx.clone(), state: state.clone() };
    (transport, MockController { events: event_tx, state })
}

/// Transport half: handed to [`CscSession::spawn`].
///
/// [`CscSession::spawn`]: crate::CscSession::spawn
pub struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<Mutex<MockState>>,
}

/// Controller half: kept by the test.
#[derive(Clone)]
pub struct MockController {
    events: mpsc::UnboundedSender<TransportEvent>,
    state: Arc<Mutex<MockState>>,
}

impl MockController {
    /// Inject a transport event.
    pub fn emit(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Script the events replayed when the driver next submits a connect.
    /// Multiple scripts queue up and are consumed one per connect call.
    pub fn script_connect(&self, events: Vec<TransportEvent>) {
        self.lock().connect_scripts.push_back(events);
    }

    /// Make the next connect submission itself fail.
    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.lock().connect_error = Some(reason.into());
    }

    /// Toggle automatic `Disconnected` acknowledgment of disconnect calls.
    /// Enabled by default.
    pub fn set_auto_ack_disconnect(&self, enabled: bool) {
        self.lock().auto_ack_disconnect = enabled;
    }

    /// All calls the driver has made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of connect calls made so far.
    pub fn connect_calls(&self) -> usize {
        self.lock().calls.iter().filter(|call| matches!(call, MockCall::Connect { .. })).count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self, peer: &PeerId, options: ConnectOptions) -> Result<()> {
        let script = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.calls.push(MockCall::Connect { peer: peer.clone(), options });
            state.last_peer = Some(peer.clone());
            if let Some(reason) = state.connect_error.take() {
                return Err(SessionError::transport("connect", reason));
            }
            state.connect_scripts.pop_front()
        };
        if let Some(events) = script {
            for event in events {
                let _ = self.event_tx.send(event);
            }
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        let ack = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.calls.push(MockCall::Disconnect);
            state.auto_ack_disconnect.then(|| state.last_peer.clone()).flatten()
        };
        if let Some(peer) = ack {
            let _ = self.event_tx.send(TransportEvent::Disconnected { peer, reason: None });
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        Ok(self.events.recv().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_and_replays_scripts() {
        let (mut transport, controller) = mock_transport();
        let peer = PeerId::from("AA:BB:CC:DD:EE:FF");
        controller.script_connect(vec![TransportEvent::Connected { peer: peer.clone() }]);

        transport.connect(&peer, ConnectOptions::default()).await.unwrap();

        assert_eq!(controller.connect_calls(), 1);
        assert_eq!(
            transport.next_event().await.unwrap(),
            Some(TransportEvent::Connected { peer })
        );
    }

    #[tokio::test]
    async fn disconnect_is_acknowledged_by_default() {
        let (mut transport, controller) = mock_transport();
        let peer = PeerId::from("AA:BB:CC:DD:EE:FF");
        transport.connect(&peer, ConnectOptions::default()).await.unwrap();

        transport.disconnect().await.unwrap();

        assert_eq!(
            transport.next_event().await.unwrap(),
            Some(TransportEvent::Disconnected { peer, reason: None })
        );
        assert_eq!(controller.calls().last(), Some(&MockCall::Disconnect));
    }

    #[tokio::test]
    async fn scripted_submission_failure() {
        let (mut transport, controller) = mock_transport();
        controller.fail_next_connect("adapter off");

        let result =
            transport.connect(&PeerId::from("AA:BB"), ConnectOptions::default()).await;

        assert!(matches!(result, Err(SessionError::Transport { .. })));
    }
}
