//! Little-endian field helpers shared by command and response codecs.

use crate::error::ProtocolError;

/// Read a `u32` at the given offset, checking the slice is long enough.
pub(crate) fn read_u32(payload: &[u8], at: usize) -> Result<u32, ProtocolError> {
    let end = at + 4;
    if payload.len() < end {
        return Err(ProtocolError::FrameTooShort {
            expected: end,
            actual: payload.len(),
        });
    }
    Ok(u32::from_le_bytes([
        payload[at],
        payload[at + 1],
        payload[at + 2],
        payload[at + 3],
    ]))
}

/// Read an `f32` at the given offset, checking the slice is long enough.
pub(crate) fn read_f32(payload: &[u8], at: usize) -> Result<f32, ProtocolError> {
    let end = at + 4;
    if payload.len() < end {
        return Err(ProtocolError::FrameTooShort {
            expected: end,
            actual: payload.len(),
        });
    }
    Ok(f32::from_le_bytes([
        payload[at],
        payload[at + 1],
        payload[at + 2],
        payload[at + 3],
    ]))
}

/// Decode the rest of the payload from the given offset as an `f32` vector.
pub(crate) fn read_f32_vec(payload: &[u8], at: usize) -> Result<Vec<f32>, ProtocolError> {
    let tail = &payload[at.min(payload.len())..];
    if tail.len() % 4 != 0 {
        return Err(ProtocolError::RaggedVector(tail.len()));
    }
    Ok(tail
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Append an `f32` vector to a payload buffer.
pub(crate) fn put_f32_vec(buf: &mut Vec<u8>, values: &[f32]) {
    for value in values {
        buf.extend_from_slice(&value.to_le_bytes());
    }
}
