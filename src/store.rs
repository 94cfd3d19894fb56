//! Snapshot store with lossless multi-subscriber broadcast
//!
//! [`MeasurementStore`] is a single-writer, multi-reader register holding
//! the latest measurement and lifecycle phase as one versioned
//! [`Snapshot`]. Only the session driver mutates it; any number of
//! subscribers observe the same total order of snapshots with no gaps and
//! no duplicates.
//!
//! Each subscriber gets its own unbounded channel seeded with the current
//! snapshot. A latest-wins watch channel would conflate intermediate
//! updates under load, which the sequence-number contract forbids.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::types::{CscMeasurement, LifecyclePhase, Snapshot};

/// Shared register for the session's latest snapshot.
///
/// Cheap to clone; all clones view the same store instance.
#[derive(Clone)]
pub struct MeasurementStore {
    inner: Arc<Mutex<StoreInner>>,
}

struct StoreInner {
    current: Snapshot,
    subscribers: Vec<mpsc::UnboundedSender<Snapshot>>,
}

impl MeasurementStore {
    /// Create a store holding the initial Idle/none snapshot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                current: Snapshot::initial(),
                subscribers: Vec::new(),
            })),
        }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.lock().current.clone()
    }

    /// The current lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.lock().current.phase.clone()
    }

    /// Subscribe to snapshots.
    ///
    /// The stream yields the current snapshot immediately, then every
    /// subsequent publish in order. Subscribers are fully independent;
    /// dropping one only stops its own stream.
    pub fn subscribe(&self) -> SnapshotStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        // Seed with the current snapshot while holding the lock so no
        // publish can slip between the seed and the registration.
        let _ = tx.send(inner.current.clone());
        inner.subscribers.push(tx);
        SnapshotStream { inner: UnboundedReceiverStream::new(rx) }
    }

    /// Store a decoded measurement and publish a new snapshot.
    ///
    /// Accepted only while the phase is `Connected`; otherwise the update
    /// is dropped without touching the snapshot.
    pub(crate) fn update_measurement(&self, measurement: CscMeasurement) {
        let mut inner = self.lock();
        if inner.current.phase != LifecyclePhase::Connected {
            debug!(phase = %inner.current.phase, "dropping measurement update outside Connected");
            return;
        }
        inner.current.measurement = Some(measurement);
        inner.publish();
    }

    /// Store a phase transition and publish a new snapshot.
    ///
    /// Always accepted. Leaving `Connected` returns the measurement slot
    /// to none, so teardown snapshots never carry a reading from the
    /// previous link.
    pub(crate) fn update_phase(&self, phase: LifecyclePhase) {
        let mut inner = self.lock();
        if inner.current.phase == LifecyclePhase::Connected && phase != LifecyclePhase::Connected {
            inner.current.measurement = None;
        }
        inner.current.phase = phase;
        inner.publish();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MeasurementStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    fn publish(&mut self) {
        self.current.sequence += 1;
        let snapshot = &self.current;
        self.subscribers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// Stream of [`Snapshot`]s from [`MeasurementStore::subscribe`].
pub struct SnapshotStream {
    inner: UnboundedReceiverStream<Snapshot>,
}

impl Stream for SnapshotStream {
    type Item = Snapshot;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
