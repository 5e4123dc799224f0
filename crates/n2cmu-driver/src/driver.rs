//! Coprocessor driver façade.
//!
//! One typed method per device operation. All methods delegate to the
//! protocol engine behind a mutex: the wire is half-duplex with exactly one
//! command in flight, so concurrent callers serialize on the lock for the
//! duration of a round trip.

use parking_lot::Mutex;
use tracing::debug;

use n2cmu_protocol::{Layer, NetworkTopology, NeuronRef, ScalarField};

use crate::engine::{EngineConfig, ProtocolEngine, SessionState};
use crate::error::DriverError;
use crate::transport::Transport;

/// Handle to one N2CMU coprocessor.
///
/// The transport is owned for the lifetime of the handle. Call
/// [`begin`](Self::begin) before anything else; every other method fails
/// with [`DriverError::ProtocolViolation`] until the handshake completes.
pub struct Coprocessor<T: Transport> {
    engine: Mutex<ProtocolEngine<T>>,
}

impl<T: Transport> Coprocessor<T> {
    /// Create a driver over an open transport with default engine policy.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, EngineConfig::default())
    }

    /// Create a driver with explicit engine policy.
    pub fn with_config(transport: T, config: EngineConfig) -> Self {
        Coprocessor {
            engine: Mutex::new(ProtocolEngine::new(transport, config)),
        }
    }

    /// Establish the session: performs the handshake that must precede all
    /// other commands on a newly opened transport.
    pub fn begin(&self) -> Result<(), DriverError> {
        debug!("beginning coprocessor session");
        self.engine.lock().handshake()
    }

    /// Reset the coprocessor CPU. Topology memory on the device survives.
    pub fn cpu_reset(&self) -> Result<(), DriverError> {
        self.engine.lock().cpu_reset()
    }

    /// Create a network with the given layer counts.
    pub fn create_network(
        &self,
        input_count: u32,
        hidden_count: u32,
        output_count: u32,
    ) -> Result<(), DriverError> {
        self.engine
            .lock()
            .net_create(NetworkTopology::new(input_count, hidden_count, output_count))
    }

    /// Reset all weights, biases and gradients to zero.
    pub fn reset_network(&self) -> Result<(), DriverError> {
        self.engine.lock().net_reset()
    }

    /// Run training epochs. `None` uses the epoch count stored on the
    /// device via [`set_epoch_count`](Self::set_epoch_count).
    pub fn train(&self, epochs: Option<u32>) -> Result<(), DriverError> {
        self.engine.lock().train(epochs)
    }

    /// Run a forward pass over `input` and return the output vector.
    pub fn infer(&self, input: &[f32]) -> Result<Vec<f32>, DriverError> {
        self.engine.lock().infer(input)
    }

    /// Close the transport and end the session.
    pub fn close(&self) {
        self.engine.lock().close();
    }

    // ========================================================================
    // Session introspection
    // ========================================================================

    /// Current session state.
    pub fn state(&self) -> SessionState {
        self.engine.lock().state()
    }

    /// Locally cached topology.
    pub fn topology(&self) -> NetworkTopology {
        self.engine.lock().topology()
    }

    // ========================================================================
    // Counts
    // ========================================================================

    /// Set the input layer neuron count.
    pub fn set_input_count(&self, count: u32) -> Result<(), DriverError> {
        self.engine.lock().set_count(Layer::Input, count)
    }

    /// Get the input layer neuron count.
    pub fn get_input_count(&self) -> Result<u32, DriverError> {
        self.engine.lock().get_count(Layer::Input)
    }

    /// Set the hidden layer neuron count.
    pub fn set_hidden_count(&self, count: u32) -> Result<(), DriverError> {
        self.engine.lock().set_count(Layer::Hidden, count)
    }

    /// Get the hidden layer neuron count.
    pub fn get_hidden_count(&self) -> Result<u32, DriverError> {
        self.engine.lock().get_count(Layer::Hidden)
    }

    /// Set the output layer neuron count.
    pub fn set_output_count(&self, count: u32) -> Result<(), DriverError> {
        self.engine.lock().set_count(Layer::Output, count)
    }

    /// Get the output layer neuron count.
    pub fn get_output_count(&self) -> Result<u32, DriverError> {
        self.engine.lock().get_count(Layer::Output)
    }

    /// Set the stored training epoch count.
    pub fn set_epoch_count(&self, epochs: u32) -> Result<(), DriverError> {
        self.engine.lock().set_epoch_count(epochs)
    }

    /// Get the stored training epoch count.
    pub fn get_epoch_count(&self) -> Result<u32, DriverError> {
        self.engine.lock().get_epoch_count()
    }

    // ========================================================================
    // Hidden layer fields
    // ========================================================================

    /// Set a hidden neuron's activation.
    pub fn set_hidden_neuron(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Activation, NeuronRef::hidden(index), value)
    }

    /// Get a hidden neuron's activation.
    pub fn get_hidden_neuron(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Activation, NeuronRef::hidden(index))
    }

    /// Set a hidden neuron's incoming weights (one per input neuron).
    pub fn set_hidden_weights(&self, index: u32, weights: &[f32]) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_weights(NeuronRef::hidden(index), weights)
    }

    /// Get a hidden neuron's incoming weights.
    pub fn get_hidden_weights(&self, index: u32) -> Result<Vec<f32>, DriverError> {
        self.engine.lock().get_weights(NeuronRef::hidden(index))
    }

    /// Set a hidden neuron's bias.
    pub fn set_hidden_bias(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Bias, NeuronRef::hidden(index), value)
    }

    /// Get a hidden neuron's bias.
    pub fn get_hidden_bias(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Bias, NeuronRef::hidden(index))
    }

    /// Set a hidden neuron's gradient.
    pub fn set_hidden_gradient(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Gradient, NeuronRef::hidden(index), value)
    }

    /// Get a hidden neuron's gradient.
    pub fn get_hidden_gradient(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Gradient, NeuronRef::hidden(index))
    }

    // ========================================================================
    // Output layer fields
    // ========================================================================

    /// Set an output neuron's activation.
    pub fn set_output_neuron(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Activation, NeuronRef::output(index), value)
    }

    /// Get an output neuron's activation.
    pub fn get_output_neuron(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Activation, NeuronRef::output(index))
    }

    /// Set an output neuron's incoming weights (one per hidden neuron).
    pub fn set_output_weights(&self, index: u32, weights: &[f32]) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_weights(NeuronRef::output(index), weights)
    }

    /// Get an output neuron's incoming weights.
    pub fn get_output_weights(&self, index: u32) -> Result<Vec<f32>, DriverError> {
        self.engine.lock().get_weights(NeuronRef::output(index))
    }

    /// Set an output neuron's bias.
    pub fn set_output_bias(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Bias, NeuronRef::output(index), value)
    }

    /// Get an output neuron's bias.
    pub fn get_output_bias(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Bias, NeuronRef::output(index))
    }

    /// Set an output neuron's gradient.
    pub fn set_output_gradient(&self, index: u32, value: f32) -> Result<(), DriverError> {
        self.engine
            .lock()
            .set_scalar(ScalarField::Gradient, NeuronRef::output(index), value)
    }

    /// Get an output neuron's gradient.
    pub fn get_output_gradient(&self, index: u32) -> Result<f32, DriverError> {
        self.engine
            .lock()
            .get_scalar(ScalarField::Gradient, NeuronRef::output(index))
    }
}
