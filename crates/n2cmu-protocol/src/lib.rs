//! N2CMU Coprocessor Wire Protocol
//!
//! This crate provides types and utilities for communicating with the N2CMU
//! neural-network coprocessor over its serial command protocol. The protocol
//! is a strict request/response exchange: every frame the host sends carries
//! one command, and the device answers with exactly one response frame.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): an opcode byte followed by a
//!   length-prefixed payload and a checksum.
//! - **Responses** (device → host): a status byte (OK or ERROR) followed by a
//!   length-prefixed payload and a checksum.
//!
//! The device stores a single feed-forward network (input/hidden/output
//! layers). Commands cover session handshake, CPU reset, network
//! creation/reset, training, inference, and get/set access to every
//! per-layer count and per-neuron field (activation, weights, bias,
//! gradient).
//!
//! # Example
//!
//! ```rust,ignore
//! use n2cmu_protocol::{Command, FrameCodec, NetworkTopology};
//!
//! // Build a command frame
//! let cmd = Command::NetCreate { topology: NetworkTopology::new(3, 4, 1) };
//! let frame = cmd.to_frame()?;
//!
//! // Decode a received frame
//! let mut codec = FrameCodec::new();
//! codec.feed(&received_data);
//! let raw = codec.try_decode()?;
//! ```

mod commands;
mod constants;
mod error;
mod frame;
mod responses;
mod types;
mod wire;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
pub use responses::*;
pub use types::*;
