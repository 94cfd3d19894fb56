//! Session core for Bluetooth Cycling Speed and Cadence sensors.
//!
//! Headunit decodes CSC Measurement notification frames and tracks one
//! peer connection through a deterministic lifecycle, exposing a
//! race-free view of "latest known reading + connection status" to
//! consuming layers.
//!
//! # Features
//!
//! - **Frame decoding**: flag-driven variable-layout CSC Measurement
//!   frames, bounds-checked, no sentinel zeros
//! - **Session lifecycle**: bounded connect retries, cancellable from
//!   any point, idempotent under duplicate transport notifications
//! - **Snapshot broadcast**: versioned snapshots to any number of
//!   subscribers, in publish order, gap-free
//! - **Transport-agnostic**: any peer link behind the [`Transport`] seam
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use headunit::mock::mock_transport;
//! use headunit::{CscSession, TransportEvent, ViewState};
//!
//! #[tokio::main]
//! async fn main() -> headunit::Result<()> {
//!     let (transport, controller) = mock_transport();
//!     controller.script_connect(vec![TransportEvent::Connected {
//!         peer: "C4:64:E3:9C:12:01".into(),
//!     }]);
//!
//!     let session = CscSession::spawn(transport);
//!     session.connect("C4:64:E3:9C:12:01").await?;
//!
//!     let mut views = session.view_states();
//!     while let Some(view) = views.next().await {
//!         if let ViewState::DisplayData(measurement) = view {
//!             println!("reading: {measurement:?}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod csc;
mod error;
pub mod types;

// Session architecture
mod driver;
pub mod mock;
mod session;
mod store;
mod transport;

// Core exports
pub use csc::{RawFrame, decode, encode};
pub use error::{DecodeError, Result, SessionError};
pub use session::{CscSession, DetachReason, EventStream, SessionEvent};
pub use store::{MeasurementStore, SnapshotStream};
pub use transport::{ConnectOptions, PeerId, RetryPolicy, Transport, TransportEvent};
pub use types::*;

/// Unified entry point for CSC sessions.
///
/// Thin factory over [`CscSession::spawn`] for the common case.
///
/// # Example
///
/// ```rust,no_run
/// use headunit::Headunit;
/// use headunit::mock::mock_transport;
///
/// #[tokio::main]
/// async fn main() -> headunit::Result<()> {
///     let (transport, _controller) = mock_transport();
///     let session = Headunit::attach(transport);
///     session.connect("C4:64:E3:9C:12:01").await?;
///     Ok(())
/// }
/// ```
pub struct Headunit;

impl Headunit {
    /// Attach a session to a transport with the default retry policy.
    pub fn attach<T: Transport>(transport: T) -> CscSession {
        CscSession::spawn(transport)
    }

    /// Attach a session with an explicit retry policy.
    pub fn attach_with_retry<T: Transport>(transport: T, retry: RetryPolicy) -> CscSession {
        CscSession::spawn_with_retry(transport, retry)
    }
}
