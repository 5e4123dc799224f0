//! N2CMU Host Driver
//!
//! This crate drives the N2CMU neural coprocessor over a byte-oriented
//! serial link. It layers three pieces on top of the wire protocol from
//! `n2cmu-protocol`:
//!
//! - A [`Transport`] contract (plus serial and TCP adapters) supplying the
//!   raw duplex byte channel.
//! - A [`ProtocolEngine`] owning the per-connection session state machine,
//!   the request/response cycle, and the timeout/retry policy.
//! - A [`Coprocessor`] façade exposing one typed method per device
//!   operation, serialized onto the half-duplex wire with a mutex.
//!
//! # Example
//!
//! ```rust,ignore
//! use n2cmu_driver::{Coprocessor, SerialTransport};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115_200)?;
//! let cpu = Coprocessor::new(transport);
//! cpu.begin()?;
//! cpu.create_network(3, 4, 1)?;
//! cpu.train(Some(1000))?;
//! let output = cpu.infer(&[1.0, 0.0, 1.0])?;
//! ```

mod driver;
mod engine;
mod error;
mod transport;

pub use driver::*;
pub use engine::*;
pub use error::*;
pub use transport::*;

pub use n2cmu_protocol::{
    DeviceErrorCode, Layer, NetworkTopology, NeuronLayer, NeuronRef, ScalarField,
};
