//! `tokio-serial` implementation of the [`SerialPort`] transport.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::Instant;
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits,
};

use crate::SerialPort;

/// Serial line parameters. The Modbus defaults are 19200 baud, no parity,
/// eight data bits, one stop bit.
#[derive(Debug, Clone, Copy)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    pub write_timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 19200,
            parity: Parity::None,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            write_timeout: Duration::from_secs(2),
        }
    }
}

impl SerialConfig {
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }
}

/// A serial port that can be opened and closed repeatedly from the same
/// configuration, for hosts that do not share serial handles cleanly.
#[derive(Debug)]
pub struct TokioSerialPort {
    path: String,
    config: SerialConfig,
    stream: Option<SerialStream>,
}

impl TokioSerialPort {
    pub fn new(path: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            path: path.into(),
            config,
            stream: None,
        }
    }
}

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port is not open")
}

#[async_trait]
impl SerialPort for TokioSerialPort {
    async fn open(&mut self) -> io::Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let builder = tokio_serial::new(&self.path, self.config.baud_rate)
            .parity(self.config.parity)
            .data_bits(self.config.data_bits)
            .stop_bits(self.config.stop_bits)
            .flow_control(self.config.flow_control);
        let stream = builder.open_native_async().map_err(|err| {
            io::Error::other(format!(
                "failed to open serial port '{}': {err}",
                self.path
            ))
        })?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn baud_rate(&self) -> u32 {
        self.config.baud_rate
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_open)?;
        tokio::time::timeout(self.config.write_timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "serial write timed out"))?
    }

    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let stream = self.stream.as_mut().ok_or_else(not_open)?;
        let deadline = Instant::now() + timeout;
        let mut filled = 0;
        while filled < buf.len() {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match tokio::time::timeout(remaining, stream.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(err)) => return Err(err),
                Err(_) => break,
            }
        }
        Ok(filled)
    }

    async fn clear_input(&mut self) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_open)?;
        tokio_serial::SerialPort::clear(stream, ClearBuffer::Input)
            .map_err(|err| io::Error::other(err.to_string()))
    }

    async fn clear_output(&mut self) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(not_open)?;
        tokio_serial::SerialPort::clear(stream, ClearBuffer::Output)
            .map_err(|err| io::Error::other(err.to_string()))
    }
}
