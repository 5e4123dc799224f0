//! Protocol engine: session state machine and the command/response cycle.
//!
//! One engine instance exclusively owns one open transport and the session
//! state for that connection. Every driver call funnels into
//! [`ProtocolEngine::execute`], which enforces the same discipline for all
//! commands: check legality against the session state, validate addressed
//! indices and shapes against the cached topology, then run one framed
//! round trip with bounded retries. State transitions are committed only on
//! confirmed OK responses, so a failed command leaves the state machine
//! exactly where it was.

use std::fmt;
use std::time::{Duration, Instant};

use n2cmu_protocol::{
    Command, FrameCodec, Layer, NetworkTopology, NeuronRef, ProtocolError, Response, ResponseKind,
    ScalarField,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::error::DriverError;
use crate::transport::Transport;

// ============================================================================
// Session State
// ============================================================================

/// The per-connection protocol state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session; only a handshake is legal.
    Disconnected,
    /// Handshake round trip in flight.
    Handshaking,
    /// Session established, no usable topology yet.
    Ready,
    /// Topology set; training, inference and field access are legal.
    Configured,
    /// At least one training run has completed since configuration.
    Trained,
    /// Inference round trip in flight.
    Inferring,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Handshaking => "handshaking",
            SessionState::Ready => "ready",
            SessionState::Configured => "configured",
            SessionState::Trained => "trained",
            SessionState::Inferring => "inferring",
        };
        write!(f, "{}", name)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunable engine policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How long to wait for a complete response frame.
    pub response_timeout: Duration,
    /// How many times to re-send a command after a timeout or a corrupt
    /// response. Device rejections are never retried.
    pub max_retries: u32,
    /// Whether `infer` requires a successful `train` first. Off by default:
    /// the device will happily run a forward pass over freshly reset
    /// weights.
    pub require_trained: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            response_timeout: Duration::from_secs(1),
            max_retries: 2,
            require_trained: false,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The protocol engine for one coprocessor connection.
pub struct ProtocolEngine<T: Transport> {
    transport: T,
    codec: FrameCodec,
    config: EngineConfig,
    state: SessionState,
    /// Host-side copy of the device's layer counts, kept in sync from every
    /// successful topology command and count getter.
    topology: NetworkTopology,
    /// Whether a train command has succeeded since the last (re)configure.
    trained: bool,
    commands_sent: u64,
    retries_performed: u64,
}

fn unexpected_shape(expected: usize, actual: usize) -> DriverError {
    DriverError::MalformedFrame(ProtocolError::UnexpectedPayloadLength { expected, actual })
}

impl<T: Transport> ProtocolEngine<T> {
    /// Create an engine over an open transport. The session starts
    /// disconnected; call [`handshake`](Self::handshake) to establish it.
    pub fn new(transport: T, config: EngineConfig) -> Self {
        ProtocolEngine {
            transport,
            codec: FrameCodec::new(),
            config,
            state: SessionState::Disconnected,
            topology: NetworkTopology::default(),
            trained: false,
            commands_sent: 0,
            retries_performed: 0,
        }
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get the cached topology.
    pub fn topology(&self) -> NetworkTopology {
        self.topology
    }

    /// Get the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Total command frames sent, including retries.
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    /// Total re-sends performed after timeouts or corrupt responses.
    pub fn retries_performed(&self) -> u64 {
        self.retries_performed
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Perform the session handshake. Must be the first command on a newly
    /// opened transport.
    pub fn handshake(&mut self) -> Result<(), DriverError> {
        if self.state != SessionState::Disconnected {
            return Err(DriverError::ProtocolViolation {
                state: self.state,
                command: "handshake",
            });
        }

        self.state = SessionState::Handshaking;
        match self.execute(Command::Handshake, ResponseKind::Empty) {
            Ok(_) => {
                debug!("handshake complete, session ready");
                self.state = SessionState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Disconnected;
                Err(err)
            }
        }
    }

    /// Reset the coprocessor CPU. The device preserves its topology memory,
    /// so the session state is preserved as well.
    pub fn cpu_reset(&mut self) -> Result<(), DriverError> {
        self.ensure_session("cpu reset")?;
        self.execute(Command::CpuReset, ResponseKind::Empty)?;
        Ok(())
    }

    /// Close the transport and destroy the session state.
    pub fn close(&mut self) {
        if self.state != SessionState::Disconnected {
            debug!("closing session in state {}", self.state);
        }
        self.transport.close();
        self.codec.clear();
        self.state = SessionState::Disconnected;
        self.topology = NetworkTopology::default();
        self.trained = false;
    }

    // ========================================================================
    // Network lifecycle
    // ========================================================================

    /// Create a network with the given topology.
    pub fn net_create(&mut self, topology: NetworkTopology) -> Result<(), DriverError> {
        self.ensure_session("net create")?;
        if !topology.is_complete() {
            return Err(DriverError::InvalidTopology);
        }

        self.execute(Command::NetCreate { topology }, ResponseKind::Empty)?;
        self.topology = topology;
        self.trained = false;
        self.state = SessionState::Configured;
        debug!(
            "network created: {}/{}/{}",
            topology.input_count, topology.hidden_count, topology.output_count
        );
        Ok(())
    }

    /// Reset all weights, biases and gradients to zero.
    pub fn net_reset(&mut self) -> Result<(), DriverError> {
        self.ensure_configured("net reset")?;
        self.execute(Command::NetReset, ResponseKind::Empty)?;
        self.trained = false;
        self.state = SessionState::Configured;
        Ok(())
    }

    /// Run training epochs. `None` uses the epoch count stored on the
    /// device via [`set_epoch_count`](Self::set_epoch_count).
    pub fn train(&mut self, epochs: Option<u32>) -> Result<(), DriverError> {
        self.ensure_configured("train")?;
        if epochs == Some(0) {
            return Err(DriverError::InvalidArgument(
                "epoch count must be non-zero".to_string(),
            ));
        }

        self.execute(Command::NetTrain { epochs }, ResponseKind::Empty)?;
        self.trained = true;
        self.state = SessionState::Trained;
        Ok(())
    }

    /// Run a forward pass and return the output vector.
    pub fn infer(&mut self, input: &[f32]) -> Result<Vec<f32>, DriverError> {
        self.ensure_configured("infer")?;
        if self.config.require_trained && !self.trained {
            return Err(DriverError::NotTrained);
        }

        let expected = self.topology.input_count as usize;
        if input.len() != expected {
            return Err(DriverError::ShapeMismatch {
                expected,
                actual: input.len(),
            });
        }

        let output_len = self.topology.output_count as usize;
        let prev = self.state;
        self.state = SessionState::Inferring;
        let result = self.execute(
            Command::NetInfer {
                input: input.to_vec(),
            },
            ResponseKind::Vector { len: output_len },
        );

        match result {
            Ok(Response::Vector(output)) => {
                self.state = SessionState::Configured;
                Ok(output)
            }
            Ok(resp) => {
                self.restore_after_failure(prev);
                Err(unexpected_shape(output_len * 4, resp.payload().len()))
            }
            Err(err) => {
                self.restore_after_failure(prev);
                Err(err)
            }
        }
    }

    // ========================================================================
    // Field accessors
    // ========================================================================

    /// Set a layer's neuron count.
    pub fn set_count(&mut self, layer: Layer, count: u32) -> Result<(), DriverError> {
        self.ensure_session("set count")?;
        self.execute(Command::SetCount { layer, count }, ResponseKind::Empty)?;
        self.topology.set_count(layer, count);
        if self.state == SessionState::Trained {
            self.state = SessionState::Configured;
            self.trained = false;
        }
        self.reconcile_configured();
        Ok(())
    }

    /// Get a layer's neuron count, refreshing the cached topology.
    pub fn get_count(&mut self, layer: Layer) -> Result<u32, DriverError> {
        self.ensure_session("get count")?;
        match self.execute(Command::GetCount { layer }, ResponseKind::Count)? {
            Response::Count(value) => {
                self.topology.set_count(layer, value);
                self.reconcile_configured();
                Ok(value)
            }
            resp => Err(unexpected_shape(4, resp.payload().len())),
        }
    }

    /// Set the stored training epoch count.
    pub fn set_epoch_count(&mut self, epochs: u32) -> Result<(), DriverError> {
        self.ensure_session("set epoch count")?;
        self.execute(Command::SetEpochCount { epochs }, ResponseKind::Empty)?;
        Ok(())
    }

    /// Get the stored training epoch count.
    pub fn get_epoch_count(&mut self) -> Result<u32, DriverError> {
        self.ensure_session("get epoch count")?;
        match self.execute(Command::GetEpochCount, ResponseKind::Count)? {
            Response::Count(value) => Ok(value),
            resp => Err(unexpected_shape(4, resp.payload().len())),
        }
    }

    /// Set a per-neuron scalar field (activation, bias or gradient).
    pub fn set_scalar(
        &mut self,
        field: ScalarField,
        neuron: NeuronRef,
        value: f32,
    ) -> Result<(), DriverError> {
        self.ensure_session("set scalar field")?;
        self.check_neuron(neuron)?;
        self.execute(
            Command::SetScalar {
                field,
                neuron,
                value,
            },
            ResponseKind::Empty,
        )?;
        Ok(())
    }

    /// Get a per-neuron scalar field (activation, bias or gradient).
    pub fn get_scalar(&mut self, field: ScalarField, neuron: NeuronRef) -> Result<f32, DriverError> {
        self.ensure_session("get scalar field")?;
        self.check_neuron(neuron)?;
        match self.execute(Command::GetScalar { field, neuron }, ResponseKind::Scalar)? {
            Response::Scalar(value) => Ok(value),
            resp => Err(unexpected_shape(4, resp.payload().len())),
        }
    }

    /// Set a neuron's incoming weights. The vector length must equal the
    /// preceding layer's count.
    pub fn set_weights(&mut self, neuron: NeuronRef, weights: &[f32]) -> Result<(), DriverError> {
        self.ensure_session("set weights")?;
        self.check_neuron(neuron)?;

        let expected = self.topology.fan_in(neuron.layer) as usize;
        if weights.len() != expected {
            return Err(DriverError::ShapeMismatch {
                expected,
                actual: weights.len(),
            });
        }

        self.execute(
            Command::SetWeights {
                neuron,
                weights: weights.to_vec(),
            },
            ResponseKind::Empty,
        )?;
        Ok(())
    }

    /// Get a neuron's incoming weights.
    pub fn get_weights(&mut self, neuron: NeuronRef) -> Result<Vec<f32>, DriverError> {
        self.ensure_session("get weights")?;
        self.check_neuron(neuron)?;

        let len = self.topology.fan_in(neuron.layer) as usize;
        match self.execute(Command::GetWeights { neuron }, ResponseKind::Vector { len })? {
            Response::Vector(values) => Ok(values),
            resp => Err(unexpected_shape(len * 4, resp.payload().len())),
        }
    }

    // ========================================================================
    // Command cycle
    // ========================================================================

    /// Run one command to completion: encode, send, await, decode, with
    /// bounded retries for timeouts and corrupt responses. Never returns
    /// `Response::Error`; device rejections become `DeviceRejected`.
    fn execute(&mut self, command: Command, kind: ResponseKind) -> Result<Response, DriverError> {
        let frame = command
            .to_frame()
            .map_err(|e| DriverError::InvalidArgument(e.to_string()))?;

        // Drop any bytes left over from an aborted exchange
        self.codec.clear();

        let mut attempt = 0u32;
        loop {
            match self.round_trip(&frame, kind) {
                Ok(Response::Error(code)) => {
                    debug!("device rejected opcode 0x{:02X}: {}", command.code(), code);
                    return Err(DriverError::DeviceRejected(code));
                }
                Ok(resp) => return Ok(resp),
                Err(DriverError::Link(msg)) => {
                    warn!("link failure, session lost: {}", msg);
                    self.state = SessionState::Disconnected;
                    return Err(DriverError::Link(msg));
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    self.retries_performed += 1;
                    warn!(
                        "re-sending opcode 0x{:02X} after {} (attempt {}/{})",
                        command.code(),
                        err,
                        attempt,
                        self.config.max_retries
                    );
                    self.codec.clear();
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One send/receive attempt.
    fn round_trip(&mut self, frame: &[u8], kind: ResponseKind) -> Result<Response, DriverError> {
        trace!("sending opcode 0x{:02X} ({} bytes)", frame[0], frame.len());
        self.transport.send(frame)?;
        self.commands_sent += 1;

        let deadline = Instant::now() + self.config.response_timeout;
        loop {
            if let Some(raw) = self.codec.try_decode()? {
                trace!(
                    "received status 0x{:02X} ({} payload bytes)",
                    raw.tag,
                    raw.payload.len()
                );
                return Ok(Response::decode(&raw, kind)?);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(DriverError::Timeout);
            }
            let chunk = self.transport.receive(deadline - now)?;
            self.codec.feed(&chunk);
        }
    }

    // ========================================================================
    // State helpers
    // ========================================================================

    fn ensure_session(&self, command: &'static str) -> Result<(), DriverError> {
        match self.state {
            SessionState::Disconnected | SessionState::Handshaking => {
                Err(DriverError::ProtocolViolation {
                    state: self.state,
                    command,
                })
            }
            _ => Ok(()),
        }
    }

    fn ensure_configured(&self, command: &'static str) -> Result<(), DriverError> {
        self.ensure_session(command)?;
        match self.state {
            SessionState::Configured | SessionState::Trained => Ok(()),
            SessionState::Ready => Err(DriverError::NotConfigured),
            state => Err(DriverError::ProtocolViolation { state, command }),
        }
    }

    fn check_neuron(&self, neuron: NeuronRef) -> Result<(), DriverError> {
        let count = self.topology.neuron_count(neuron.layer);
        if neuron.index >= count {
            return Err(DriverError::IndexOutOfRange {
                index: neuron.index,
                count,
            });
        }
        Ok(())
    }

    /// Move between `Ready` and `Configured` as the cached topology gains or
    /// loses completeness.
    fn reconcile_configured(&mut self) {
        if self.state == SessionState::Ready && self.topology.is_complete() {
            debug!(
                "topology complete ({}/{}/{}), session configured",
                self.topology.input_count, self.topology.hidden_count, self.topology.output_count
            );
            self.state = SessionState::Configured;
        } else if !self.topology.is_complete()
            && matches!(
                self.state,
                SessionState::Configured | SessionState::Trained
            )
        {
            self.state = SessionState::Ready;
            self.trained = false;
        }
    }

    fn restore_after_failure(&mut self, prev: SessionState) {
        // A link failure already dropped the session; keep that.
        if self.state != SessionState::Disconnected {
            self.state = prev;
        }
    }
}
