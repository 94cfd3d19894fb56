//! Driver task owning the session state machine
//!
//! One driver task is spawned per session. It owns the transport and is
//! the only writer of the [`MeasurementStore`], so commands and transport
//! events are applied in a single consistent total order: notification
//! frames are decoded and applied in arrival order, and no phase
//! transition can interleave with a measurement update.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::csc;
use crate::session::{DetachReason, EventHub, SessionEvent};
use crate::store::MeasurementStore;
use crate::transport::{ConnectOptions, PeerId, RetryPolicy, Transport, TransportEvent};
use crate::types::LifecyclePhase;
use crate::{Result, SessionError};

/// Commands accepted by the driver task.
pub(crate) enum Command {
    Connect { peer: PeerId, done: oneshot::Sender<Result<()>> },
    Disconnect { done: oneshot::Sender<Result<()>> },
}

/// Result of spawning the driver task
pub(crate) struct DriverChannels {
    /// Command sender for the session handle
    pub(crate) commands: mpsc::UnboundedSender<Command>,
    /// Cancellation token for graceful shutdown
    pub(crate) cancel: CancellationToken,
}

/// A connect in flight: the transport is attempting, we count failures.
struct PendingConnect {
    peer: PeerId,
    failed_attempts: u32,
    done: oneshot::Sender<Result<()>>,
}

/// Driver spawns and manages the session state machine task
pub(crate) struct SessionDriver;

impl SessionDriver {
    /// Spawn the driver task for the given transport.
    pub(crate) fn spawn<T>(
        transport: T,
        store: MeasurementStore,
        events: EventHub,
        retry: RetryPolicy,
    ) -> DriverChannels
    where
        T: Transport,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            let mut task = DriverTask {
                transport,
                store,
                events,
                retry,
                pending_connect: None,
                pending_disconnect: None,
                connected_peer: None,
                frames_applied: 0,
                frames_dropped: 0,
            };
            task.run(command_rx, cancel_task).await;
        });

        DriverChannels { commands: command_tx, cancel }
    }
}

struct DriverTask<T: Transport> {
    transport: T,
    store: MeasurementStore,
    events: EventHub,
    retry: RetryPolicy,
    pending_connect: Option<PendingConnect>,
    pending_disconnect: Option<oneshot::Sender<Result<()>>>,
    connected_peer: Option<PeerId>,
    frames_applied: u64,
    frames_dropped: u64,
}

/// What woke the driver loop up.
///
/// The select resolves to one of these first; acting on it happens after
/// the select so command handling may use the transport mutably.
enum Wake {
    Cancelled,
    Command(Option<Command>),
    Event(Result<Option<TransportEvent>>),
}

impl<T: Transport> DriverTask<T> {
    async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        cancel: CancellationToken,
    ) {
        info!("session driver started");
        let mut error_count = 0u32;
        const MAX_ERRORS: u32 = 10;

        loop {
            let wake = tokio::select! {
                _ = cancel.cancelled() => Wake::Cancelled,
                command = commands.recv() => Wake::Command(command),
                event = self.transport.next_event() => Wake::Event(event),
            };

            match wake {
                Wake::Cancelled => {
                    info!("session driver cancelled");
                    break;
                }
                Wake::Command(Some(command)) => self.handle_command(command).await,
                Wake::Command(None) => {
                    debug!("session handle dropped, shutting down");
                    break;
                }
                Wake::Event(Ok(Some(event))) => {
                    error_count = 0;
                    self.handle_event(event);
                }
                Wake::Event(Ok(None)) => {
                    info!("transport closed");
                    self.handle_transport_closed();
                    break;
                }
                Wake::Event(Err(e)) => {
                    error_count += 1;
                    error!("transport error ({}/{}): {}", error_count, MAX_ERRORS, e);
                    if error_count >= MAX_ERRORS {
                        error!("too many transport errors, shutting down");
                        self.handle_transport_closed();
                        break;
                    }
                }
            }
        }

        info!(
            "session driver ended (applied {} frames, dropped {})",
            self.frames_applied, self.frames_dropped
        );
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Connect { peer, done } => self.handle_connect(peer, done).await,
            Command::Disconnect { done } => self.handle_disconnect(done).await,
        }
    }

    async fn handle_connect(&mut self, peer: PeerId, done: oneshot::Sender<Result<()>>) {
        let phase = self.store.phase();
        if !phase.accepts_connect() {
            let _ = done.send(Err(SessionError::invalid_command("connect", phase.to_string())));
            return;
        }

        info!(%peer, "connecting");
        self.store.update_phase(LifecyclePhase::Connecting);
        self.pending_connect =
            Some(PendingConnect { peer: peer.clone(), failed_attempts: 0, done });

        let options = ConnectOptions { auto_reconnect: false, retry: self.retry };
        if let Err(e) = self.transport.connect(&peer, options).await {
            // The request could not even be submitted; no events will follow.
            warn!(%peer, "connect submission failed: {e}");
            self.fail_connect(e.to_string());
        }
    }

    async fn handle_disconnect(&mut self, done: oneshot::Sender<Result<()>>) {
        let phase = self.store.phase();
        if !phase.accepts_disconnect() {
            let _ = done.send(Err(SessionError::invalid_command("disconnect", phase.to_string())));
            return;
        }

        let was_connected = phase == LifecyclePhase::Connected;
        let peer = self
            .connected_peer
            .take()
            .or_else(|| self.pending_connect.as_ref().map(|pending| pending.peer.clone()));

        // Abort any connect still retrying; its caller must not wait for
        // an outcome that will never arrive.
        if let Some(pending) = self.pending_connect.take() {
            debug!(peer = %pending.peer, "aborting connect retries");
            let _ = pending.done.send(Err(SessionError::connect_aborted(pending.peer.to_string())));
        }

        info!("disconnecting");
        self.store.update_phase(LifecyclePhase::Disconnecting);
        if was_connected {
            if let Some(peer) = peer {
                self.events.emit(SessionEvent::Detached { peer, reason: DetachReason::Requested });
            }
        }
        self.pending_disconnect = Some(done);

        if let Err(e) = self.transport.disconnect().await {
            warn!("disconnect submission failed: {e}");
            self.store.update_phase(LifecyclePhase::Disconnected);
            if let Some(done) = self.pending_disconnect.take() {
                let _ = done.send(Err(e));
            }
        }
    }

    fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { peer } => self.handle_connected(peer),
            TransportEvent::FailedToConnect { peer, reason } => {
                self.handle_failed_to_connect(peer, reason);
            }
            TransportEvent::Disconnected { peer, reason } => {
                self.handle_disconnected(peer, reason);
            }
            TransportEvent::Notification { frame } => self.handle_notification(frame),
        }
    }

    fn handle_connected(&mut self, peer: PeerId) {
        match self.pending_connect.take() {
            Some(pending) if pending.peer == peer => {
                info!(%peer, "connected");
                self.store.update_phase(LifecyclePhase::Connected);
                self.connected_peer = Some(peer);
                let _ = pending.done.send(Ok(()));
            }
            Some(pending) => {
                debug!(%peer, expected = %pending.peer, "connected event for unexpected peer");
                self.pending_connect = Some(pending);
            }
            None => debug!(%peer, "stray connected event"),
        }
    }

    fn handle_failed_to_connect(&mut self, peer: PeerId, reason: String) {
        let Some(pending) = self.pending_connect.as_mut() else {
            debug!(%peer, "stray failed-to-connect event");
            return;
        };
        if pending.peer != peer {
            debug!(%peer, expected = %pending.peer, "failed-to-connect for unexpected peer");
            return;
        }

        pending.failed_attempts += 1;
        if pending.failed_attempts < self.retry.max_attempts {
            debug!(
                %peer,
                attempt = pending.failed_attempts,
                max = self.retry.max_attempts,
                "connect attempt failed, transport retrying"
            );
            return;
        }

        warn!(%peer, attempts = pending.failed_attempts, "connect retries exhausted: {reason}");
        self.fail_connect(reason);
    }

    fn handle_disconnected(&mut self, peer: PeerId, reason: Option<String>) {
        if let Some(done) = self.pending_disconnect.take() {
            info!(%peer, "disconnected");
            self.store.update_phase(LifecyclePhase::Disconnected);
            let _ = done.send(Ok(()));
            return;
        }

        match self.connected_peer.take() {
            Some(connected) if connected == peer => {
                info!(%peer, ?reason, "link lost");
                self.store.update_phase(LifecyclePhase::Disconnected);
                self.events.emit(SessionEvent::Detached {
                    peer,
                    reason: DetachReason::LinkLost { reason },
                });
            }
            Some(connected) => {
                debug!(%peer, expected = %connected, "disconnected event for unexpected peer");
                self.connected_peer = Some(connected);
            }
            // Duplicate terminal notifications are no-ops, not errors.
            None => debug!(%peer, "stray disconnected event"),
        }
    }

    fn handle_notification(&mut self, frame: csc::RawFrame) {
        if self.store.phase() != LifecyclePhase::Connected {
            trace!("dropping notification outside Connected");
            return;
        }

        match csc::decode(&frame) {
            Ok(measurement) => {
                trace!(?measurement, "frame decoded");
                self.frames_applied += 1;
                self.store.update_measurement(measurement);
            }
            Err(error) => {
                self.frames_dropped += 1;
                warn!(%error, dropped = self.frames_dropped, "dropping undecodable frame");
                self.events.emit(SessionEvent::FrameDropped { error });
            }
        }
    }

    /// Transport stream ended while the session may still be active.
    fn handle_transport_closed(&mut self) {
        if self.pending_connect.is_some() {
            self.fail_connect("transport closed".to_string());
        }
        if let Some(done) = self.pending_disconnect.take() {
            self.store.update_phase(LifecyclePhase::Disconnected);
            let _ = done.send(Ok(()));
        }
        if let Some(peer) = self.connected_peer.take() {
            self.store.update_phase(LifecyclePhase::Disconnected);
            self.events.emit(SessionEvent::Detached {
                peer,
                reason: DetachReason::LinkLost { reason: Some("transport closed".to_string()) },
            });
        }
    }

    fn fail_connect(&mut self, reason: String) {
        let Some(pending) = self.pending_connect.take() else {
            return;
        };
        self.store.update_phase(LifecyclePhase::Failed(reason.clone()));
        self.events.emit(SessionEvent::ConnectFailed {
            peer: pending.peer.clone(),
            reason: reason.clone(),
        });
        let _ =
            pending.done.send(Err(SessionError::connect_failed(pending.peer.to_string(), reason)));
    }
}
