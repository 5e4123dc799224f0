//! Frame encoding/decoding utilities.
//!
//! Every frame on the link, in either direction, has the same shape: a tag
//! byte (command opcode or response status), a 2-byte little-endian payload
//! length, the payload, and a trailing checksum.
//!
//! ```text
//! +--------+--------+--------+-------------------+----------+
//! | tag    | len_lo | len_hi | payload[0..len]   | checksum |
//! +--------+--------+--------+-------------------+----------+
//! ```
//!
//! The checksum is the XOR of every preceding frame byte, which detects any
//! single corrupted byte. The link offers no delivery guarantees, so the
//! decoder accumulates bytes until a full frame is buffered and reports
//! corruption as a typed error rather than guessing.

use bytes::{Buf, BufMut, BytesMut};
use log::trace;

use crate::constants::{FRAME_HEADER_SIZE, MAX_PAYLOAD_SIZE};
use crate::error::ProtocolError;

/// A decoded frame before command/response interpretation.
///
/// The tag byte is an opcode for host→device frames and a status byte for
/// device→host frames; the two directions share one frame shape.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFrame {
    /// Opcode or status byte.
    pub tag: u8,
    /// Frame payload.
    pub payload: Vec<u8>,
}

/// XOR checksum over a byte slice.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// A codec for reading and writing protocol frames.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameCodec {
    /// Create a new frame codec.
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_PAYLOAD_SIZE / 4),
        }
    }

    /// Add received data to the buffer.
    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete frame from the buffer.
    ///
    /// Returns `Ok(Some(frame))` if a complete, checksum-valid frame is
    /// available, `Ok(None)` if more data is needed, or an error if the
    /// buffered bytes cannot form a valid frame. A corrupt frame is consumed
    /// from the buffer before the error is returned so the caller can decide
    /// whether to resynchronize or retry.
    pub fn try_decode(&mut self) -> Result<Option<RawFrame>, ProtocolError> {
        if self.buffer.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let len = u16::from_le_bytes([self.buffer[1], self.buffer[2]]) as usize;
        if len > MAX_PAYLOAD_SIZE {
            // The length field itself is untrustworthy; drop everything
            // buffered rather than wait on a frame that will never complete.
            trace!("discarding {} buffered bytes: oversized length field", self.buffer.len());
            self.buffer.clear();
            return Err(ProtocolError::FrameTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: len,
            });
        }

        let total = FRAME_HEADER_SIZE + len + 1;
        if self.buffer.len() < total {
            return Ok(None);
        }

        let expected = checksum(&self.buffer[..FRAME_HEADER_SIZE + len]);
        let actual = self.buffer[FRAME_HEADER_SIZE + len];

        let tag = self.buffer[0];
        self.buffer.advance(FRAME_HEADER_SIZE);
        let payload = self.buffer.split_to(len).to_vec();
        self.buffer.advance(1); // checksum byte

        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        Ok(Some(RawFrame { tag, payload }))
    }

    /// Encode a frame for transmission.
    pub fn encode(tag: u8, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::FrameTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: payload.len(),
            });
        }

        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len() + 1);
        buf.push(tag);
        buf.put_u16_le(payload.len() as u16);
        buf.extend_from_slice(payload);
        buf.push(checksum(&buf));
        Ok(buf)
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut codec = FrameCodec::new();

        let payload = [0x01, 0x02, 0x03];
        let encoded = FrameCodec::encode(0x0B, &payload).unwrap();

        // tag + len + payload + checksum
        assert_eq!(encoded.len(), 3 + payload.len() + 1);
        assert_eq!(encoded[0], 0x0B);
        assert_eq!(encoded[1], payload.len() as u8);
        assert_eq!(encoded[2], 0);

        codec.feed(&encoded);
        let frame = codec.try_decode().unwrap().expect("should decode frame");
        assert_eq!(frame.tag, 0x0B);
        assert_eq!(frame.payload, payload);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_empty_payload() {
        let mut codec = FrameCodec::new();
        let encoded = FrameCodec::encode(0x00, &[]).unwrap();
        assert_eq!(encoded.len(), 4);

        codec.feed(&encoded);
        let frame = codec.try_decode().unwrap().expect("should decode frame");
        assert_eq!(frame.tag, 0x00);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = FrameCodec::new();
        let encoded = FrameCodec::encode(0x05, &[1.0f32.to_le_bytes(), 0.5f32.to_le_bytes()].concat()).unwrap();

        // Feed one byte at a time; no frame until the checksum arrives
        for &byte in &encoded[..encoded.len() - 1] {
            codec.feed(&[byte]);
            assert!(codec.try_decode().unwrap().is_none());
        }

        codec.feed(&encoded[encoded.len() - 1..]);
        let frame = codec.try_decode().unwrap().expect("should decode frame");
        assert_eq!(frame.tag, 0x05);
        assert_eq!(frame.payload.len(), 8);
    }

    #[test]
    fn test_back_to_back_frames() {
        let mut codec = FrameCodec::new();
        let first = FrameCodec::encode(0x12, &[]).unwrap();
        let second = FrameCodec::encode(0x13, &[9]).unwrap();

        codec.feed(&first);
        codec.feed(&second);

        let frame = codec.try_decode().unwrap().expect("first frame");
        assert_eq!(frame.tag, 0x12);

        let frame = codec.try_decode().unwrap().expect("second frame");
        assert_eq!(frame.tag, 0x13);
        assert_eq!(frame.payload, vec![9]);

        assert!(codec.try_decode().unwrap().is_none());
    }

    #[test]
    fn test_corrupted_checksum() {
        let mut codec = FrameCodec::new();
        let mut encoded = FrameCodec::encode(0x02, &[3, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0]).unwrap();
        let last = encoded.len() - 1;
        encoded[last] ^= 0xFF;

        codec.feed(&encoded);
        let err = codec.try_decode().unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));

        // The corrupt frame is consumed; the codec can keep decoding
        assert_eq!(codec.buffered_len(), 0);
        let good = FrameCodec::encode(0x02, &[3, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0]).unwrap();
        codec.feed(&good);
        assert!(codec.try_decode().unwrap().is_some());
    }

    #[test]
    fn test_corrupted_payload_byte() {
        let mut codec = FrameCodec::new();
        let mut encoded = FrameCodec::encode(0x11, &[10, 0, 0, 0]).unwrap();
        encoded[4] ^= 0x40;

        codec.feed(&encoded);
        let err = codec.try_decode().unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_oversized_length_field() {
        let mut codec = FrameCodec::new();
        // Length field claims 0xFFFF bytes
        codec.feed(&[0x00, 0xFF, 0xFF]);
        let err = codec.try_decode().unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLong { .. }));
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_encode_rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD_SIZE + 1];
        let err = FrameCodec::encode(0x0B, &payload).unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLong { .. }));
    }
}
