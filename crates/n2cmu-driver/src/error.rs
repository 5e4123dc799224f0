//! Driver error taxonomy.

use n2cmu_protocol::{DeviceErrorCode, ProtocolError};
use thiserror::Error;

use crate::engine::SessionState;
use crate::transport::TransportError;

/// Errors surfaced to driver callers.
///
/// Local validation failures (`ProtocolViolation`, `InvalidTopology`,
/// `NotConfigured`, `NotTrained`, `ShapeMismatch`, `IndexOutOfRange`,
/// `InvalidArgument`) are detected before any transport I/O. The remaining
/// variants describe a failed round trip: `Timeout` and `MalformedFrame`
/// are retryable, `DeviceRejected` is not (the same request would fail
/// again), and `Link` ends the session until the next `begin`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DriverError {
    /// Transport-level failure. Fatal to the session.
    #[error("link failure: {0}")]
    Link(String),

    /// No complete response arrived within the configured timeout.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The response frame was corrupt or had an impossible shape.
    #[error("malformed frame: {0}")]
    MalformedFrame(#[from] ProtocolError),

    /// The device returned an ERROR status for a well-formed command.
    #[error("device rejected command: {0}")]
    DeviceRejected(DeviceErrorCode),

    /// The command is not legal in the current session state.
    #[error("{command} is not legal in state {state}")]
    ProtocolViolation {
        /// Session state at the time of the call.
        state: SessionState,
        /// The rejected operation.
        command: &'static str,
    },

    /// A topology with a zero layer count was supplied.
    #[error("topology must have non-zero input, hidden and output counts")]
    InvalidTopology,

    /// The operation needs a configured topology and none has been set.
    #[error("no network topology has been configured")]
    NotConfigured,

    /// Inference was requested before any successful training this session.
    #[error("network has not been trained this session")]
    NotTrained,

    /// A vector argument had the wrong length for the current topology.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch {
        /// Required element count.
        expected: usize,
        /// Supplied element count.
        actual: usize,
    },

    /// A neuron index fell outside the addressed layer.
    #[error("neuron index {index} out of range for layer of {count} neurons")]
    IndexOutOfRange {
        /// The offending index.
        index: u32,
        /// The layer's configured neuron count.
        count: u32,
    },

    /// A caller-supplied argument failed local validation.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<TransportError> for DriverError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => DriverError::Timeout,
            TransportError::Link(msg) => DriverError::Link(msg),
        }
    }
}

impl DriverError {
    /// Whether retrying the same command could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Timeout | DriverError::MalformedFrame(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_conversion() {
        assert_eq!(
            DriverError::from(TransportError::Timeout),
            DriverError::Timeout
        );
        assert!(matches!(
            DriverError::from(TransportError::Link("reset by peer".to_string())),
            DriverError::Link(_)
        ));
    }

    #[test]
    fn test_retryability() {
        assert!(DriverError::Timeout.is_retryable());
        assert!(DriverError::MalformedFrame(ProtocolError::UnknownStatus(9)).is_retryable());
        assert!(!DriverError::DeviceRejected(DeviceErrorCode::BadState).is_retryable());
        assert!(!DriverError::Link("gone".to_string()).is_retryable());
    }
}
