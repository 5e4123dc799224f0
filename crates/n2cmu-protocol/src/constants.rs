//! Protocol constants
//!
//! These constants define the command opcodes, response status bytes, and
//! device error codes used on the N2CMU serial link. The numeric values are
//! fixed by the coprocessor firmware and must not be reassigned.

// ============================================================================
// Command Opcodes (host → device)
// ============================================================================

/// Session handshake. First command on a newly opened link.
pub const CMD_HANDSHAKE: u8 = 0x00;
/// Reset the coprocessor CPU. Network topology memory is preserved.
pub const CMD_CPU_RESET: u8 = 0x01;
/// Create a network from a full topology (input/hidden/output counts).
pub const CMD_NET_CREATE: u8 = 0x02;
/// Reset all weights, biases and gradients to zero.
pub const CMD_NET_RESET: u8 = 0x03;
/// Run training epochs (payload optionally overrides the stored epoch count).
pub const CMD_NET_TRAIN: u8 = 0x04;
/// Run a forward pass over an input vector.
pub const CMD_NET_INFER: u8 = 0x05;
/// Set the input layer neuron count.
pub const CMD_SET_INPUT_COUNT: u8 = 0x06;
/// Set the hidden layer neuron count.
pub const CMD_SET_HIDDEN_COUNT: u8 = 0x07;
/// Set the output layer neuron count.
pub const CMD_SET_OUTPUT_COUNT: u8 = 0x08;
/// Set a hidden neuron's activation.
pub const CMD_SET_HIDDEN_NEURON: u8 = 0x09;
/// Set an output neuron's activation.
pub const CMD_SET_OUTPUT_NEURON: u8 = 0x0A;
/// Set a hidden neuron's incoming weights.
pub const CMD_SET_HIDDEN_WEIGHTS: u8 = 0x0B;
/// Set an output neuron's incoming weights.
pub const CMD_SET_OUTPUT_WEIGHTS: u8 = 0x0C;
/// Set a hidden neuron's bias.
pub const CMD_SET_HIDDEN_BIAS: u8 = 0x0D;
/// Set an output neuron's bias.
pub const CMD_SET_OUTPUT_BIAS: u8 = 0x0E;
/// Set a hidden neuron's gradient.
pub const CMD_SET_HIDDEN_GRAD: u8 = 0x0F;
/// Set an output neuron's gradient.
pub const CMD_SET_OUTPUT_GRAD: u8 = 0x10;
/// Set the stored training epoch count.
pub const CMD_SET_EPOCH_COUNT: u8 = 0x11;
/// Get the input layer neuron count.
pub const CMD_GET_INPUT_COUNT: u8 = 0x12;
/// Get the hidden layer neuron count.
pub const CMD_GET_HIDDEN_COUNT: u8 = 0x13;
/// Get the output layer neuron count.
pub const CMD_GET_OUTPUT_COUNT: u8 = 0x14;
/// Get a hidden neuron's activation.
pub const CMD_GET_HIDDEN_NEURON: u8 = 0x15;
/// Get an output neuron's activation.
pub const CMD_GET_OUTPUT_NEURON: u8 = 0x16;
/// Get a hidden neuron's incoming weights.
pub const CMD_GET_HIDDEN_WEIGHTS: u8 = 0x17;
/// Get an output neuron's incoming weights.
pub const CMD_GET_OUTPUT_WEIGHTS: u8 = 0x18;
/// Get a hidden neuron's bias.
pub const CMD_GET_HIDDEN_BIAS: u8 = 0x19;
/// Get an output neuron's bias.
pub const CMD_GET_OUTPUT_BIAS: u8 = 0x1A;
/// Get a hidden neuron's gradient.
pub const CMD_GET_HIDDEN_GRAD: u8 = 0x1B;
/// Get an output neuron's gradient.
pub const CMD_GET_OUTPUT_GRAD: u8 = 0x1C;
/// Get the stored training epoch count.
pub const CMD_GET_EPOCH_COUNT: u8 = 0x1D;

// ============================================================================
// Response Status Bytes (device → host)
// ============================================================================

/// Command rejected; payload carries a one-byte reason code.
pub const RESP_STATUS_ERR: u8 = 0x00;
/// Command executed successfully; payload carries the result (if any).
pub const RESP_STATUS_OK: u8 = 0x01;

// ============================================================================
// Device Reason Codes (payload of an ERROR response)
// ============================================================================

/// The device did not recognize the opcode.
pub const ERR_CODE_UNKNOWN_CMD: u8 = 0x01;
/// The command is not valid in the device's current state.
pub const ERR_CODE_BAD_STATE: u8 = 0x02;
/// The supplied topology is unusable (e.g. a zero layer count).
pub const ERR_CODE_BAD_TOPOLOGY: u8 = 0x03;
/// A neuron index was outside the configured layer.
pub const ERR_CODE_INDEX_OUT_OF_RANGE: u8 = 0x04;
/// The device is busy with a previous long-running command.
pub const ERR_CODE_BUSY: u8 = 0x05;
/// Internal device fault.
pub const ERR_CODE_INTERNAL: u8 = 0x06;

// ============================================================================
// Frame Limits
// ============================================================================

/// Maximum payload size in a single frame.
pub const MAX_PAYLOAD_SIZE: usize = 4096;

/// Fixed frame bytes before the payload: tag byte + 2-byte length.
pub const FRAME_HEADER_SIZE: usize = 3;
