//! Responses received from the coprocessor.
//!
//! A response frame carries only an OK/ERROR status plus a payload, so the
//! payload cannot be interpreted on its own. The host decodes each response
//! against the [`ResponseKind`] implied by the command it just issued; the
//! protocol permits exactly one outstanding command, so there is never
//! ambiguity about what a payload means.

use crate::constants::*;
use crate::error::{DeviceErrorCode, ProtocolError};
use crate::frame::{FrameCodec, RawFrame};
use crate::wire::*;

/// The payload shape an OK response is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// No payload (handshake, resets, setters, train).
    Empty,
    /// A single `u32` (count and epoch getters).
    Count,
    /// A single `f32` (scalar field getters).
    Scalar,
    /// An `f32` vector of known length (weight getters, infer output).
    Vector {
        /// Expected element count.
        len: usize,
    },
}

/// Responses received from the coprocessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Command executed; no result payload.
    Ok,

    /// Command rejected by the device.
    Error(DeviceErrorCode),

    /// A count value (layer counts, epoch count).
    Count(u32),

    /// A scalar field value.
    Scalar(f32),

    /// A weight vector or inference output.
    Vector(Vec<f32>),
}

impl Response {
    /// Decode a response frame against the expected payload shape.
    pub fn decode(frame: &RawFrame, kind: ResponseKind) -> Result<Self, ProtocolError> {
        let p = &frame.payload;

        match frame.tag {
            RESP_STATUS_ERR => {
                if p.is_empty() {
                    return Err(ProtocolError::FrameTooShort {
                        expected: 1,
                        actual: 0,
                    });
                }
                Ok(Response::Error(DeviceErrorCode::from(p[0])))
            }

            RESP_STATUS_OK => match kind {
                ResponseKind::Empty => {
                    if !p.is_empty() {
                        return Err(ProtocolError::UnexpectedPayloadLength {
                            expected: 0,
                            actual: p.len(),
                        });
                    }
                    Ok(Response::Ok)
                }
                ResponseKind::Count => {
                    if p.len() != 4 {
                        return Err(ProtocolError::UnexpectedPayloadLength {
                            expected: 4,
                            actual: p.len(),
                        });
                    }
                    Ok(Response::Count(read_u32(p, 0)?))
                }
                ResponseKind::Scalar => {
                    if p.len() != 4 {
                        return Err(ProtocolError::UnexpectedPayloadLength {
                            expected: 4,
                            actual: p.len(),
                        });
                    }
                    Ok(Response::Scalar(read_f32(p, 0)?))
                }
                ResponseKind::Vector { len } => {
                    if p.len() != len * 4 {
                        return Err(ProtocolError::UnexpectedPayloadLength {
                            expected: len * 4,
                            actual: p.len(),
                        });
                    }
                    Ok(Response::Vector(read_f32_vec(p, 0)?))
                }
            },

            status => Err(ProtocolError::UnknownStatus(status)),
        }
    }

    /// Get the status byte for this response.
    pub fn status(&self) -> u8 {
        match self {
            Response::Error(_) => RESP_STATUS_ERR,
            _ => RESP_STATUS_OK,
        }
    }

    /// Encode the response payload (everything after the status byte).
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Response::Ok => Vec::new(),
            Response::Error(code) => vec![u8::from(*code)],
            Response::Count(value) => value.to_le_bytes().to_vec(),
            Response::Scalar(value) => value.to_le_bytes().to_vec(),
            Response::Vector(values) => {
                let mut buf = Vec::with_capacity(values.len() * 4);
                put_f32_vec(&mut buf, values);
                buf
            }
        }
    }

    /// Encode the response as a complete wire frame.
    ///
    /// Used by device-side emulation; the host only decodes responses.
    pub fn to_frame(&self) -> Result<Vec<u8>, ProtocolError> {
        FrameCodec::encode(self.status(), &self.payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: u8, payload: Vec<u8>) -> RawFrame {
        RawFrame { tag, payload }
    }

    #[test]
    fn test_decode_ok_empty() {
        let resp = Response::decode(&frame(RESP_STATUS_OK, vec![]), ResponseKind::Empty).unwrap();
        assert_eq!(resp, Response::Ok);
    }

    #[test]
    fn test_decode_count() {
        let resp =
            Response::decode(&frame(RESP_STATUS_OK, vec![4, 0, 0, 0]), ResponseKind::Count)
                .unwrap();
        assert_eq!(resp, Response::Count(4));
    }

    #[test]
    fn test_decode_scalar() {
        let payload = 0.75f32.to_le_bytes().to_vec();
        let resp = Response::decode(&frame(RESP_STATUS_OK, payload), ResponseKind::Scalar).unwrap();
        assert_eq!(resp, Response::Scalar(0.75));
    }

    #[test]
    fn test_decode_vector_checks_length() {
        let mut payload = Vec::new();
        put_f32_vec(&mut payload, &[0.1, 0.2, 0.3]);

        let resp = Response::decode(
            &frame(RESP_STATUS_OK, payload.clone()),
            ResponseKind::Vector { len: 3 },
        )
        .unwrap();
        assert_eq!(resp, Response::Vector(vec![0.1, 0.2, 0.3]));

        let err = Response::decode(
            &frame(RESP_STATUS_OK, payload),
            ResponseKind::Vector { len: 4 },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedPayloadLength { expected: 16, actual: 12 }
        ));
    }

    #[test]
    fn test_decode_error_reason() {
        let resp = Response::decode(
            &frame(RESP_STATUS_ERR, vec![ERR_CODE_BAD_STATE]),
            ResponseKind::Empty,
        )
        .unwrap();
        assert_eq!(resp, Response::Error(DeviceErrorCode::BadState));
    }

    #[test]
    fn test_decode_error_requires_reason() {
        let err = Response::decode(&frame(RESP_STATUS_ERR, vec![]), ResponseKind::Empty)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooShort { .. }));
    }

    #[test]
    fn test_decode_unknown_status() {
        let err = Response::decode(&frame(0x55, vec![]), ResponseKind::Empty).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownStatus(0x55)));
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let responses = [
            Response::Ok,
            Response::Error(DeviceErrorCode::IndexOutOfRange),
            Response::Count(128),
            Response::Scalar(-2.5),
            Response::Vector(vec![0.5, 1.5]),
        ];
        let kinds = [
            ResponseKind::Empty,
            ResponseKind::Empty,
            ResponseKind::Count,
            ResponseKind::Scalar,
            ResponseKind::Vector { len: 2 },
        ];

        for (resp, kind) in responses.iter().zip(kinds) {
            let raw = RawFrame {
                tag: resp.status(),
                payload: resp.payload(),
            };
            let decoded = Response::decode(&raw, kind).unwrap();
            assert_eq!(&decoded, resp);
        }
    }
}
