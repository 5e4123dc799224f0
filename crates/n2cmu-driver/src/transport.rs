//! Transport contract and adapters.
//!
//! The driver only requires a blocking duplex byte channel; it never assumes
//! delivery guarantees. Corruption and loss are detected above this layer by
//! the frame checksum and the receive timeout.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Read chunk size for the stream adapters.
const READ_CHUNK_SIZE: usize = 256;

/// Errors reported by a transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// No bytes arrived within the allotted time.
    #[error("receive timed out")]
    Timeout,

    /// The link failed (disconnect, I/O error). Fatal to the session.
    #[error("link failure: {0}")]
    Link(String),
}

/// A blocking duplex byte channel to the coprocessor.
///
/// Implementations are owned by the caller and handed to the driver at
/// construction; the driver takes exclusive ownership for the session.
pub trait Transport: Send {
    /// Send bytes down the link.
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Receive whatever bytes are available, waiting up to `timeout` for the
    /// first of them. Returns at least one byte on success.
    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Close the link. Further operations fail with a link error.
    fn close(&mut self);
}

fn link_err(err: impl std::fmt::Display) -> TransportError {
    TransportError::Link(err.to_string())
}

// ============================================================================
// Serial
// ============================================================================

/// Transport over a local serial port, the device's native attachment.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open a serial port at the given baud rate.
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(link_err)?;
        debug!("opened serial port {} at {} baud", path, baud_rate);
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(bytes).map_err(link_err)?;
        self.port.flush().map_err(link_err)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.port
            .set_timeout(timeout.max(Duration::from_millis(1)))
            .map_err(link_err)?;

        let mut buf = [0u8; READ_CHUNK_SIZE];
        match self.port.read(&mut buf) {
            Ok(0) => Err(TransportError::Link("serial port closed".to_string())),
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Err(TransportError::Timeout),
            Err(e) => Err(link_err(e)),
        }
    }

    fn close(&mut self) {
        // Serial ports release on drop; nothing to tear down eagerly.
    }
}

// ============================================================================
// TCP
// ============================================================================

/// Transport over a TCP byte stream, for serial-over-TCP bridges.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to a serial bridge at the given address.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).map_err(link_err)?;
        stream.set_nodelay(true).map_err(link_err)?;
        debug!("connected to serial bridge at {:?}", stream.peer_addr().ok());
        Ok(TcpTransport { stream })
    }
}

impl Transport for TcpTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(bytes).map_err(link_err)
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        self.stream
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))
            .map_err(link_err)?;

        let mut buf = [0u8; READ_CHUNK_SIZE];
        match self.stream.read(&mut buf) {
            Ok(0) => Err(TransportError::Link("connection closed".to_string())),
            Ok(n) => Ok(buf[..n].to_vec()),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                Err(TransportError::Timeout)
            }
            Err(e) => Err(link_err(e)),
        }
    }

    fn close(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
