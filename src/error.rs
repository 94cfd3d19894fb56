//! Error types for the CSC session core.
//!
//! Two taxonomies are kept deliberately separate:
//!
//! - [`DecodeError`] covers frame decoding. A decode failure is never fatal
//!   to the session: the frame is dropped, the store is untouched, and the
//!   consumer is notified through a [`SessionEvent::FrameDropped`] event.
//! - [`SessionError`] covers the connection lifecycle and command surface.
//!   Only exhausted connect retries are terminal, and even those are scoped
//!   to the session and recoverable by an explicit reconnect.
//!
//! Errors provide [`SessionError::is_retryable`] to classify whether a
//! failed operation may be re-attempted without operator action.
//!
//! [`SessionEvent::FrameDropped`]: crate::SessionEvent::FrameDropped

use thiserror::Error;

/// Result type alias for session operations.
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Frame decoding failure.
///
/// Truncation is the only way a CSC Measurement frame can fail to decode:
/// the flag byte is self-describing, unknown flag bits are ignored, and
/// trailing bytes are tolerated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("truncated frame: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },
}

/// Main error type for session operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SessionError {
    #[error("failed to connect to {peer}: {reason}")]
    ConnectFailed { peer: String, reason: String },

    #[error("connect to {peer} aborted by disconnect")]
    ConnectAborted { peer: String },

    #[error("{command} not valid while {phase}")]
    InvalidCommand { command: &'static str, phase: String },

    #[error("transport error during {operation}: {reason}")]
    Transport {
        operation: &'static str,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("session driver is gone")]
    DriverGone,
}

impl SessionError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            SessionError::ConnectFailed { .. } => true,
            SessionError::ConnectAborted { .. } => true,
            SessionError::Transport { .. } => true,
            SessionError::InvalidCommand { .. } => false,
            SessionError::Decode(_) => false,
            SessionError::DriverGone => false,
        }
    }

    /// Helper constructor for exhausted connect retries.
    pub fn connect_failed(peer: impl Into<String>, reason: impl Into<String>) -> Self {
        SessionError::ConnectFailed { peer: peer.into(), reason: reason.into() }
    }

    /// Helper constructor for a connect cancelled by an explicit disconnect.
    pub fn connect_aborted(peer: impl Into<String>) -> Self {
        SessionError::ConnectAborted { peer: peer.into() }
    }

    /// Helper constructor for commands issued from an invalid phase.
    pub fn invalid_command(command: &'static str, phase: impl Into<String>) -> Self {
        SessionError::InvalidCommand { command, phase: phase.into() }
    }

    /// Helper constructor for transport-level failures.
    pub fn transport(operation: &'static str, reason: impl Into<String>) -> Self {
        SessionError::Transport { operation, reason: reason.into(), source: None }
    }

    /// Helper constructor for transport-level failures with a source.
    pub fn transport_with_source(
        operation: &'static str,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        SessionError::Transport { operation, reason: reason.into(), source: Some(source) }
    }
}
