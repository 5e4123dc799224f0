//! Commands that can be sent to the coprocessor.
//!
//! The flat opcode table distinguishes every (operation, layer, field)
//! combination, but in memory a command is a tagged variant keyed by
//! [`Layer`], [`ScalarField`] and [`NeuronRef`]. `code()` flattens the tags
//! back onto the wire opcodes.

use crate::constants::*;
use crate::error::ProtocolError;
use crate::frame::{FrameCodec, RawFrame};
use crate::types::*;
use crate::wire::*;

/// Commands that can be sent to the coprocessor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Session handshake. First command on a newly opened link.
    Handshake,

    /// Reset the coprocessor CPU. Topology memory survives.
    CpuReset,

    /// Create a network with the given topology.
    NetCreate {
        /// Layer counts for the new network.
        topology: NetworkTopology,
    },

    /// Reset all weights, biases and gradients to zero.
    NetReset,

    /// Run training epochs.
    NetTrain {
        /// Override for the stored epoch count; `None` uses the device's
        /// stored value.
        epochs: Option<u32>,
    },

    /// Run a forward pass.
    NetInfer {
        /// Input vector; length must equal the input layer count.
        input: Vec<f32>,
    },

    /// Set a layer's neuron count.
    SetCount {
        /// The layer to set.
        layer: Layer,
        /// The new count.
        count: u32,
    },

    /// Get a layer's neuron count.
    GetCount {
        /// The layer to query.
        layer: Layer,
    },

    /// Set the stored training epoch count.
    SetEpochCount {
        /// Epochs per subsequent train command.
        epochs: u32,
    },

    /// Get the stored training epoch count.
    GetEpochCount,

    /// Set a per-neuron scalar field.
    SetScalar {
        /// Which field to write.
        field: ScalarField,
        /// The neuron to address.
        neuron: NeuronRef,
        /// The new value.
        value: f32,
    },

    /// Get a per-neuron scalar field.
    GetScalar {
        /// Which field to read.
        field: ScalarField,
        /// The neuron to address.
        neuron: NeuronRef,
    },

    /// Set a neuron's incoming weights.
    SetWeights {
        /// The neuron to address.
        neuron: NeuronRef,
        /// Weight vector; length must equal the preceding layer's count.
        weights: Vec<f32>,
    },

    /// Get a neuron's incoming weights.
    GetWeights {
        /// The neuron to address.
        neuron: NeuronRef,
    },
}

impl Command {
    /// Get the wire opcode for this command.
    pub fn code(&self) -> u8 {
        match self {
            Command::Handshake => CMD_HANDSHAKE,
            Command::CpuReset => CMD_CPU_RESET,
            Command::NetCreate { .. } => CMD_NET_CREATE,
            Command::NetReset => CMD_NET_RESET,
            Command::NetTrain { .. } => CMD_NET_TRAIN,
            Command::NetInfer { .. } => CMD_NET_INFER,

            Command::SetCount { layer, .. } => match layer {
                Layer::Input => CMD_SET_INPUT_COUNT,
                Layer::Hidden => CMD_SET_HIDDEN_COUNT,
                Layer::Output => CMD_SET_OUTPUT_COUNT,
            },
            Command::GetCount { layer } => match layer {
                Layer::Input => CMD_GET_INPUT_COUNT,
                Layer::Hidden => CMD_GET_HIDDEN_COUNT,
                Layer::Output => CMD_GET_OUTPUT_COUNT,
            },

            Command::SetEpochCount { .. } => CMD_SET_EPOCH_COUNT,
            Command::GetEpochCount => CMD_GET_EPOCH_COUNT,

            Command::SetScalar { field, neuron, .. } => match (field, neuron.layer) {
                (ScalarField::Activation, NeuronLayer::Hidden) => CMD_SET_HIDDEN_NEURON,
                (ScalarField::Activation, NeuronLayer::Output) => CMD_SET_OUTPUT_NEURON,
                (ScalarField::Bias, NeuronLayer::Hidden) => CMD_SET_HIDDEN_BIAS,
                (ScalarField::Bias, NeuronLayer::Output) => CMD_SET_OUTPUT_BIAS,
                (ScalarField::Gradient, NeuronLayer::Hidden) => CMD_SET_HIDDEN_GRAD,
                (ScalarField::Gradient, NeuronLayer::Output) => CMD_SET_OUTPUT_GRAD,
            },
            Command::GetScalar { field, neuron } => match (field, neuron.layer) {
                (ScalarField::Activation, NeuronLayer::Hidden) => CMD_GET_HIDDEN_NEURON,
                (ScalarField::Activation, NeuronLayer::Output) => CMD_GET_OUTPUT_NEURON,
                (ScalarField::Bias, NeuronLayer::Hidden) => CMD_GET_HIDDEN_BIAS,
                (ScalarField::Bias, NeuronLayer::Output) => CMD_GET_OUTPUT_BIAS,
                (ScalarField::Gradient, NeuronLayer::Hidden) => CMD_GET_HIDDEN_GRAD,
                (ScalarField::Gradient, NeuronLayer::Output) => CMD_GET_OUTPUT_GRAD,
            },

            Command::SetWeights { neuron, .. } => match neuron.layer {
                NeuronLayer::Hidden => CMD_SET_HIDDEN_WEIGHTS,
                NeuronLayer::Output => CMD_SET_OUTPUT_WEIGHTS,
            },
            Command::GetWeights { neuron } => match neuron.layer {
                NeuronLayer::Hidden => CMD_GET_HIDDEN_WEIGHTS,
                NeuronLayer::Output => CMD_GET_OUTPUT_WEIGHTS,
            },
        }
    }

    /// Encode the command payload (everything after the opcode).
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        match self {
            Command::Handshake | Command::CpuReset | Command::NetReset => {}

            Command::NetCreate { topology } => {
                buf.extend_from_slice(&topology.input_count.to_le_bytes());
                buf.extend_from_slice(&topology.hidden_count.to_le_bytes());
                buf.extend_from_slice(&topology.output_count.to_le_bytes());
            }

            Command::NetTrain { epochs } => {
                if let Some(epochs) = epochs {
                    buf.extend_from_slice(&epochs.to_le_bytes());
                }
            }

            Command::NetInfer { input } => {
                put_f32_vec(&mut buf, input);
            }

            Command::SetCount { count, .. } => {
                buf.extend_from_slice(&count.to_le_bytes());
            }

            Command::GetCount { .. } | Command::GetEpochCount => {}

            Command::SetEpochCount { epochs } => {
                buf.extend_from_slice(&epochs.to_le_bytes());
            }

            Command::SetScalar { neuron, value, .. } => {
                buf.extend_from_slice(&neuron.index.to_le_bytes());
                buf.extend_from_slice(&value.to_le_bytes());
            }

            Command::GetScalar { neuron, .. } => {
                buf.extend_from_slice(&neuron.index.to_le_bytes());
            }

            Command::SetWeights { neuron, weights } => {
                buf.extend_from_slice(&neuron.index.to_le_bytes());
                put_f32_vec(&mut buf, weights);
            }

            Command::GetWeights { neuron } => {
                buf.extend_from_slice(&neuron.index.to_le_bytes());
            }
        }

        buf
    }

    /// Encode the command as a complete wire frame.
    pub fn to_frame(&self) -> Result<Vec<u8>, ProtocolError> {
        FrameCodec::encode(self.code(), &self.payload())
    }

    /// Decode a command from a raw frame.
    ///
    /// Used by device-side emulation; the host only encodes commands.
    pub fn decode(frame: &RawFrame) -> Result<Self, ProtocolError> {
        let p = &frame.payload;

        let exact = |expected: usize| -> Result<(), ProtocolError> {
            if p.len() != expected {
                Err(ProtocolError::UnexpectedPayloadLength {
                    expected,
                    actual: p.len(),
                })
            } else {
                Ok(())
            }
        };

        let scalar_set = |field: ScalarField, layer: NeuronLayer| -> Result<Command, ProtocolError> {
            exact(8)?;
            Ok(Command::SetScalar {
                field,
                neuron: NeuronRef {
                    layer,
                    index: read_u32(p, 0)?,
                },
                value: read_f32(p, 4)?,
            })
        };

        let scalar_get = |field: ScalarField, layer: NeuronLayer| -> Result<Command, ProtocolError> {
            exact(4)?;
            Ok(Command::GetScalar {
                field,
                neuron: NeuronRef {
                    layer,
                    index: read_u32(p, 0)?,
                },
            })
        };

        match frame.tag {
            CMD_HANDSHAKE => {
                exact(0)?;
                Ok(Command::Handshake)
            }
            CMD_CPU_RESET => {
                exact(0)?;
                Ok(Command::CpuReset)
            }
            CMD_NET_CREATE => {
                exact(12)?;
                Ok(Command::NetCreate {
                    topology: NetworkTopology::new(
                        read_u32(p, 0)?,
                        read_u32(p, 4)?,
                        read_u32(p, 8)?,
                    ),
                })
            }
            CMD_NET_RESET => {
                exact(0)?;
                Ok(Command::NetReset)
            }
            CMD_NET_TRAIN => match p.len() {
                0 => Ok(Command::NetTrain { epochs: None }),
                4 => Ok(Command::NetTrain {
                    epochs: Some(read_u32(p, 0)?),
                }),
                actual => Err(ProtocolError::UnexpectedPayloadLength {
                    expected: 4,
                    actual,
                }),
            },
            CMD_NET_INFER => Ok(Command::NetInfer {
                input: read_f32_vec(p, 0)?,
            }),

            CMD_SET_INPUT_COUNT | CMD_SET_HIDDEN_COUNT | CMD_SET_OUTPUT_COUNT => {
                exact(4)?;
                let layer = match frame.tag {
                    CMD_SET_INPUT_COUNT => Layer::Input,
                    CMD_SET_HIDDEN_COUNT => Layer::Hidden,
                    _ => Layer::Output,
                };
                Ok(Command::SetCount {
                    layer,
                    count: read_u32(p, 0)?,
                })
            }
            CMD_GET_INPUT_COUNT | CMD_GET_HIDDEN_COUNT | CMD_GET_OUTPUT_COUNT => {
                exact(0)?;
                let layer = match frame.tag {
                    CMD_GET_INPUT_COUNT => Layer::Input,
                    CMD_GET_HIDDEN_COUNT => Layer::Hidden,
                    _ => Layer::Output,
                };
                Ok(Command::GetCount { layer })
            }

            CMD_SET_EPOCH_COUNT => {
                exact(4)?;
                Ok(Command::SetEpochCount {
                    epochs: read_u32(p, 0)?,
                })
            }
            CMD_GET_EPOCH_COUNT => {
                exact(0)?;
                Ok(Command::GetEpochCount)
            }

            CMD_SET_HIDDEN_NEURON => scalar_set(ScalarField::Activation, NeuronLayer::Hidden),
            CMD_SET_OUTPUT_NEURON => scalar_set(ScalarField::Activation, NeuronLayer::Output),
            CMD_SET_HIDDEN_BIAS => scalar_set(ScalarField::Bias, NeuronLayer::Hidden),
            CMD_SET_OUTPUT_BIAS => scalar_set(ScalarField::Bias, NeuronLayer::Output),
            CMD_SET_HIDDEN_GRAD => scalar_set(ScalarField::Gradient, NeuronLayer::Hidden),
            CMD_SET_OUTPUT_GRAD => scalar_set(ScalarField::Gradient, NeuronLayer::Output),

            CMD_GET_HIDDEN_NEURON => scalar_get(ScalarField::Activation, NeuronLayer::Hidden),
            CMD_GET_OUTPUT_NEURON => scalar_get(ScalarField::Activation, NeuronLayer::Output),
            CMD_GET_HIDDEN_BIAS => scalar_get(ScalarField::Bias, NeuronLayer::Hidden),
            CMD_GET_OUTPUT_BIAS => scalar_get(ScalarField::Bias, NeuronLayer::Output),
            CMD_GET_HIDDEN_GRAD => scalar_get(ScalarField::Gradient, NeuronLayer::Hidden),
            CMD_GET_OUTPUT_GRAD => scalar_get(ScalarField::Gradient, NeuronLayer::Output),

            CMD_SET_HIDDEN_WEIGHTS | CMD_SET_OUTPUT_WEIGHTS => {
                let layer = if frame.tag == CMD_SET_HIDDEN_WEIGHTS {
                    NeuronLayer::Hidden
                } else {
                    NeuronLayer::Output
                };
                Ok(Command::SetWeights {
                    neuron: NeuronRef {
                        layer,
                        index: read_u32(p, 0)?,
                    },
                    weights: read_f32_vec(p, 4)?,
                })
            }
            CMD_GET_HIDDEN_WEIGHTS | CMD_GET_OUTPUT_WEIGHTS => {
                exact(4)?;
                let layer = if frame.tag == CMD_GET_HIDDEN_WEIGHTS {
                    NeuronLayer::Hidden
                } else {
                    NeuronLayer::Output
                };
                Ok(Command::GetWeights {
                    neuron: NeuronRef {
                        layer,
                        index: read_u32(p, 0)?,
                    },
                })
            }

            code => Err(ProtocolError::UnknownOpcode(code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_mapping_is_injective() {
        let commands = [
            Command::Handshake,
            Command::CpuReset,
            Command::NetCreate {
                topology: NetworkTopology::new(1, 1, 1),
            },
            Command::NetReset,
            Command::NetTrain { epochs: None },
            Command::NetInfer { input: vec![] },
            Command::SetCount { layer: Layer::Input, count: 0 },
            Command::SetCount { layer: Layer::Hidden, count: 0 },
            Command::SetCount { layer: Layer::Output, count: 0 },
            Command::SetScalar {
                field: ScalarField::Activation,
                neuron: NeuronRef::hidden(0),
                value: 0.0,
            },
            Command::SetScalar {
                field: ScalarField::Activation,
                neuron: NeuronRef::output(0),
                value: 0.0,
            },
            Command::SetWeights { neuron: NeuronRef::hidden(0), weights: vec![] },
            Command::SetWeights { neuron: NeuronRef::output(0), weights: vec![] },
            Command::SetScalar {
                field: ScalarField::Bias,
                neuron: NeuronRef::hidden(0),
                value: 0.0,
            },
            Command::SetScalar {
                field: ScalarField::Bias,
                neuron: NeuronRef::output(0),
                value: 0.0,
            },
            Command::SetScalar {
                field: ScalarField::Gradient,
                neuron: NeuronRef::hidden(0),
                value: 0.0,
            },
            Command::SetScalar {
                field: ScalarField::Gradient,
                neuron: NeuronRef::output(0),
                value: 0.0,
            },
            Command::SetEpochCount { epochs: 0 },
            Command::GetCount { layer: Layer::Input },
            Command::GetCount { layer: Layer::Hidden },
            Command::GetCount { layer: Layer::Output },
            Command::GetScalar {
                field: ScalarField::Activation,
                neuron: NeuronRef::hidden(0),
            },
            Command::GetScalar {
                field: ScalarField::Activation,
                neuron: NeuronRef::output(0),
            },
            Command::GetWeights { neuron: NeuronRef::hidden(0) },
            Command::GetWeights { neuron: NeuronRef::output(0) },
            Command::GetScalar {
                field: ScalarField::Bias,
                neuron: NeuronRef::hidden(0),
            },
            Command::GetScalar {
                field: ScalarField::Bias,
                neuron: NeuronRef::output(0),
            },
            Command::GetScalar {
                field: ScalarField::Gradient,
                neuron: NeuronRef::hidden(0),
            },
            Command::GetScalar {
                field: ScalarField::Gradient,
                neuron: NeuronRef::output(0),
            },
            Command::GetEpochCount,
        ];

        // All 30 opcodes, each used exactly once, in firmware order
        let codes: Vec<u8> = commands.iter().map(|c| c.code()).collect();
        let mut sorted = codes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 30);
        assert_eq!(*sorted.first().unwrap(), CMD_HANDSHAKE);
        assert_eq!(*sorted.last().unwrap(), CMD_GET_EPOCH_COUNT);
    }

    #[test]
    fn test_net_create_layout() {
        let cmd = Command::NetCreate {
            topology: NetworkTopology::new(3, 4, 1),
        };
        assert_eq!(cmd.code(), CMD_NET_CREATE);
        assert_eq!(
            cmd.payload(),
            vec![3, 0, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0]
        );
    }

    #[test]
    fn test_set_weights_layout() {
        let cmd = Command::SetWeights {
            neuron: NeuronRef::hidden(2),
            weights: vec![1.0, -1.0],
        };
        assert_eq!(cmd.code(), CMD_SET_HIDDEN_WEIGHTS);

        let mut expected = vec![2, 0, 0, 0];
        expected.extend_from_slice(&1.0f32.to_le_bytes());
        expected.extend_from_slice(&(-1.0f32).to_le_bytes());
        assert_eq!(cmd.payload(), expected);
    }

    #[test]
    fn test_train_payload_forms() {
        assert!(Command::NetTrain { epochs: None }.payload().is_empty());
        assert_eq!(
            Command::NetTrain { epochs: Some(100) }.payload(),
            vec![100, 0, 0, 0]
        );
    }

    #[test]
    fn test_command_decode_roundtrip() {
        let commands = [
            Command::Handshake,
            Command::NetCreate {
                topology: NetworkTopology::new(3, 4, 1),
            },
            Command::NetTrain { epochs: Some(50) },
            Command::NetTrain { epochs: None },
            Command::NetInfer {
                input: vec![1.0, 0.0, 1.0],
            },
            Command::SetCount { layer: Layer::Hidden, count: 8 },
            Command::GetCount { layer: Layer::Output },
            Command::SetScalar {
                field: ScalarField::Bias,
                neuron: NeuronRef::output(0),
                value: 0.25,
            },
            Command::GetScalar {
                field: ScalarField::Gradient,
                neuron: NeuronRef::hidden(3),
            },
            Command::SetWeights {
                neuron: NeuronRef::hidden(1),
                weights: vec![0.1, 0.2, 0.3],
            },
            Command::GetWeights { neuron: NeuronRef::output(0) },
            Command::SetEpochCount { epochs: 1000 },
            Command::GetEpochCount,
        ];

        for cmd in commands {
            let frame = RawFrame {
                tag: cmd.code(),
                payload: cmd.payload(),
            };
            let decoded = Command::decode(&frame).expect("decode should succeed");
            assert_eq!(decoded, cmd);
        }
    }

    #[test]
    fn test_decode_rejects_unknown_opcode() {
        let frame = RawFrame {
            tag: 0x7F,
            payload: vec![],
        };
        assert!(matches!(
            Command::decode(&frame),
            Err(ProtocolError::UnknownOpcode(0x7F))
        ));
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let frame = RawFrame {
            tag: CMD_NET_CREATE,
            payload: vec![3, 0, 0, 0],
        };
        assert!(matches!(
            Command::decode(&frame),
            Err(ProtocolError::UnexpectedPayloadLength { expected: 12, .. })
        ));
    }
}
