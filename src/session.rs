//! Session handle over one peer connection
//!
//! [`CscSession`] is the public face of the session state machine: a
//! handle that accepts connect/disconnect commands, exposes
//! snapshot and view-state streams, and delivers [`SessionEvent`]s the
//! consumer must react to (leaving device-scoped context, surfacing a
//! terminal connect failure, counting dropped frames).
//!
//! The handle and its [`MeasurementStore`] are created together and torn
//! down together: dropping the handle cancels the driver task.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::driver::{Command, SessionDriver};
use crate::store::{MeasurementStore, SnapshotStream};
use crate::transport::{PeerId, RetryPolicy, Transport};
use crate::types::{LifecyclePhase, Snapshot, ViewState};
use crate::{DecodeError, Result, SessionError};

/// Why the session left the connected state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetachReason {
    /// The consumer asked to disconnect.
    Requested,
    /// The transport reported the link gone without a request.
    LinkLost { reason: Option<String> },
}

/// Events delivered to the session consumer.
///
/// `Detached` fires on every transition out of `Connected`, requested or
/// not; consumers use it to leave any device-scoped context rather than
/// polling the phase. `FrameDropped` reports a recoverable decode failure
/// that did not alter the lifecycle phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Connect retries exhausted; terminal until a new explicit connect.
    ConnectFailed { peer: PeerId, reason: String },
    /// The session left `Connected`.
    Detached { peer: PeerId, reason: DetachReason },
    /// A notification frame was dropped without updating the store.
    FrameDropped { error: DecodeError },
}

/// Handle to a running CSC session.
///
/// Owns exactly one peer connection at a time. Commands complete when the
/// transport acknowledges the corresponding terminal state, never
/// immediately.
pub struct CscSession {
    commands: mpsc::UnboundedSender<Command>,
    store: MeasurementStore,
    events: EventHub,
    cancel: CancellationToken,
}

impl CscSession {
    /// Spawn a session over the given transport with the default retry
    /// policy (3 attempts, 100 ms apart).
    pub fn spawn<T: Transport>(transport: T) -> Self {
        Self::spawn_with_retry(transport, RetryPolicy::default())
    }

    /// Spawn a session with an explicit retry policy.
    pub fn spawn_with_retry<T: Transport>(transport: T, retry: RetryPolicy) -> Self {
        let store = MeasurementStore::new();
        let events = EventHub::default();
        let channels = SessionDriver::spawn(transport, store.clone(), events.clone(), retry);
        Self { commands: channels.commands, store, events, cancel: channels.cancel }
    }

    /// Connect to a peer.
    ///
    /// Valid only from `Idle`, `Disconnected` or `Failed`. Suspends until
    /// the transport reports `Connected` or the bounded retries are
    /// exhausted.
    ///
    /// # Errors
    ///
    /// [`SessionError::InvalidCommand`] from any other phase,
    /// [`SessionError::ConnectFailed`] after exhausted retries,
    /// [`SessionError::ConnectAborted`] if a disconnect cancelled the
    /// attempt.
    pub async fn connect(&self, peer: impl Into<PeerId>) -> Result<()> {
        let (done, outcome) = oneshot::channel();
        self.commands
            .send(Command::Connect { peer: peer.into(), done })
            .map_err(|_| SessionError::DriverGone)?;
        outcome.await.map_err(|_| SessionError::DriverGone)?
    }

    /// Disconnect from the current peer.
    ///
    /// Valid from `Connecting` (aborting remaining retries) or
    /// `Connected`. Suspends until the transport acknowledges the
    /// disconnect. Clears the stored measurement as part of leaving
    /// `Connected`.
    pub async fn disconnect(&self) -> Result<()> {
        let (done, outcome) = oneshot::channel();
        self.commands.send(Command::Disconnect { done }).map_err(|_| SessionError::DriverGone)?;
        outcome.await.map_err(|_| SessionError::DriverGone)?
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.store.phase()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Subscribe to snapshots: the current one immediately, then every
    /// subsequent update in publish order.
    pub fn snapshots(&self) -> SnapshotStream {
        self.store.subscribe()
    }

    /// Subscribe to projected view states, the presentation-layer seam.
    pub fn view_states(&self) -> impl Stream<Item = ViewState> + 'static {
        self.snapshots().map(|snapshot| ViewState::project(&snapshot))
    }

    /// Subscribe to session events.
    pub fn events(&self) -> EventStream {
        self.events.subscribe()
    }
}

impl Drop for CscSession {
    fn drop(&mut self) {
        debug!("dropping session handle");
        // Cancel the driver task on drop for clean teardown
        self.cancel.cancel();
    }
}

/// Stream of [`SessionEvent`]s from [`CscSession::events`].
pub struct EventStream {
    inner: UnboundedReceiverStream<SessionEvent>,
}

impl Stream for EventStream {
    type Item = SessionEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Fan-out register for session events.
#[derive(Clone, Default)]
pub(crate) struct EventHub {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<SessionEvent>>>>,
}

impl EventHub {
    pub(crate) fn subscribe(&self) -> EventStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        EventStream { inner: UnboundedReceiverStream::new(rx) }
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<SessionEvent>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn event_hub_fans_out_to_all_subscribers() {
        let hub = EventHub::default();
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        let event = SessionEvent::FrameDropped {
            error: DecodeError::Truncated { needed: 7, available: 3 },
        };
        hub.emit(event.clone());

        assert_eq!(first.next().await.unwrap(), event);
        assert_eq!(second.next().await.unwrap(), event);
    }

    #[tokio::test]
    async fn event_hub_prunes_dropped_subscribers() {
        let hub = EventHub::default();
        let gone = hub.subscribe();
        let mut kept = hub.subscribe();
        drop(gone);

        let event = SessionEvent::FrameDropped {
            error: DecodeError::Truncated { needed: 1, available: 0 },
        };
        hub.emit(event.clone());

        assert_eq!(kept.next().await.unwrap(), event);
        assert_eq!(hub.lock().len(), 1);
    }
}
