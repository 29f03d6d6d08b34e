//! Serial transport abstraction and the stop-and-wait transaction engine.

#![forbid(unsafe_code)]

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use modline_core::pdu::ExceptionCode;
use modline_core::{DecodeError, EncodeError};
use thiserror::Error;

pub mod bus;
pub mod serial;
pub mod sim;

pub use bus::{silent_interval, Bus, TransactOptions, BROADCAST_ADDRESS};
pub use serial::{SerialConfig, TokioSerialPort};
pub use sim::{CoilBank, RegisterBank, SimPort, SimSlave};

/// Everything that can go wrong during one exchange on the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The OS refused an open, read or write on the underlying port.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("decode error: {0}")]
    Decode(DecodeError),
    #[error("checksum mismatch: expected {expected:#06X}, received {received:#06X}")]
    ChecksumMismatch { expected: u16, received: u16 },
    #[error("no response from slave {slave}")]
    NoResponse { slave: u8 },
    #[error("short response from slave {slave}: expected {expected} bytes, received {received}")]
    ShortResponse {
        slave: u8,
        expected: usize,
        received: usize,
    },
    #[error("local echo did not match the transmitted request")]
    LocalEchoMismatch,
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
    #[error("slave {slave} reported {} for function {function:#04X}", .code.description())]
    SlaveException {
        slave: u8,
        function: u8,
        code: ExceptionCode,
    },
}

impl From<DecodeError> for BusError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::ChecksumMismatch { expected, received } => {
                Self::ChecksumMismatch { expected, received }
            }
            other => Self::Decode(other),
        }
    }
}

/// The serial transport the engine drives. Implementations bound `read` by
/// `timeout` and return whatever arrived, which may be nothing.
#[async_trait]
pub trait SerialPort: Send {
    async fn open(&mut self) -> io::Result<()>;
    async fn close(&mut self) -> io::Result<()>;
    fn is_open(&self) -> bool;
    fn baud_rate(&self) -> u32;
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;
    /// Read up to `buf.len()` bytes, waiting at most `timeout` for them.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
    async fn clear_input(&mut self) -> io::Result<()>;
    async fn clear_output(&mut self) -> io::Result<()>;
}
