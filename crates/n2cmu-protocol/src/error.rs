//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when encoding or decoding protocol frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame or payload is too short to be valid.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length available.
        actual: usize,
    },

    /// Frame payload exceeds the protocol limit.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum allowed length.
        max: usize,
        /// Actual length.
        actual: usize,
    },

    /// Unknown command opcode.
    #[error("unknown opcode: 0x{0:02X}")]
    UnknownOpcode(u8),

    /// Unknown response status byte.
    #[error("unknown response status: 0x{0:02X}")]
    UnknownStatus(u8),

    /// Frame checksum did not match its contents.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// Payload length does not match what the opcode requires.
    #[error("unexpected payload length: expected {expected} bytes, got {actual}")]
    UnexpectedPayloadLength {
        /// Required payload length.
        expected: usize,
        /// Actual payload length.
        actual: usize,
    },

    /// Payload length is not a whole number of vector elements.
    #[error("payload length {0} is not a multiple of 4")]
    RaggedVector(usize),
}

/// Reason codes reported by the device in ERROR responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceErrorCode {
    /// Opcode not recognized by the device.
    UnknownCommand,
    /// Command not valid in the device's current state.
    BadState,
    /// Topology unusable (e.g. a zero layer count).
    BadTopology,
    /// Neuron index outside the configured layer.
    IndexOutOfRange,
    /// Device busy with a previous long-running command.
    Busy,
    /// Internal device fault.
    Internal,
    /// Unknown reason code.
    Unknown(u8),
}

impl std::fmt::Display for DeviceErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceErrorCode::UnknownCommand => write!(f, "unknown command"),
            DeviceErrorCode::BadState => write!(f, "bad state"),
            DeviceErrorCode::BadTopology => write!(f, "bad topology"),
            DeviceErrorCode::IndexOutOfRange => write!(f, "index out of range"),
            DeviceErrorCode::Busy => write!(f, "device busy"),
            DeviceErrorCode::Internal => write!(f, "internal device fault"),
            DeviceErrorCode::Unknown(code) => write!(f, "unknown reason (0x{:02X})", code),
        }
    }
}

impl From<u8> for DeviceErrorCode {
    fn from(code: u8) -> Self {
        use crate::constants::*;
        match code {
            ERR_CODE_UNKNOWN_CMD => DeviceErrorCode::UnknownCommand,
            ERR_CODE_BAD_STATE => DeviceErrorCode::BadState,
            ERR_CODE_BAD_TOPOLOGY => DeviceErrorCode::BadTopology,
            ERR_CODE_INDEX_OUT_OF_RANGE => DeviceErrorCode::IndexOutOfRange,
            ERR_CODE_BUSY => DeviceErrorCode::Busy,
            ERR_CODE_INTERNAL => DeviceErrorCode::Internal,
            _ => DeviceErrorCode::Unknown(code),
        }
    }
}

impl From<DeviceErrorCode> for u8 {
    fn from(code: DeviceErrorCode) -> Self {
        use crate::constants::*;
        match code {
            DeviceErrorCode::UnknownCommand => ERR_CODE_UNKNOWN_CMD,
            DeviceErrorCode::BadState => ERR_CODE_BAD_STATE,
            DeviceErrorCode::BadTopology => ERR_CODE_BAD_TOPOLOGY,
            DeviceErrorCode::IndexOutOfRange => ERR_CODE_INDEX_OUT_OF_RANGE,
            DeviceErrorCode::Busy => ERR_CODE_BUSY,
            DeviceErrorCode::Internal => ERR_CODE_INTERNAL,
            DeviceErrorCode::Unknown(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::ChecksumMismatch {
            expected: 0x12,
            actual: 0x34,
        };
        assert!(err.to_string().contains("0x12"));
        assert!(err.to_string().contains("0x34"));

        let err = ProtocolError::UnknownOpcode(0x7F);
        assert!(err.to_string().contains("0x7F"));
    }

    #[test]
    fn test_device_error_code_roundtrip() {
        for raw in 0u8..=8 {
            let code = DeviceErrorCode::from(raw);
            assert_eq!(u8::from(code), raw);
        }
    }
}
