//! Typed operation surface for talking to Modbus slaves over a serial bus.
//!
//! An [`Instrument`] is bound to one slave address and a shared [`Bus`];
//! several instruments targeting devices on the same multi-drop line share
//! the bus handle and therefore its one-exchange-at-a-time discipline.

#![forbid(unsafe_code)]

pub mod blocking;

use std::sync::Arc;
use std::time::Duration;

use modline_core::encoding::Reader;
use modline_core::pdu::{
    ReadRequest, Request, Response, WriteBitsRequest, WriteRegistersRequest, WriteSingleRequest,
    MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MAX_WRITE_REGISTERS,
};
use modline_core::value::{self, MAX_DECIMALS};
use modline_core::{DecodeError, EncodeError};
use modline_datalink::{Bus, BusError, SerialConfig, SerialPort, TokioSerialPort, TransactOptions};
use thiserror::Error;
use tracing::debug;

pub use modline_core::frame::Mode;
pub use modline_core::value::WordOrder;

#[derive(Debug, Error)]
pub enum InstrumentError {
    /// The caller asked for something structurally wrong, such as reading
    /// from the broadcast address.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// An argument had the right shape but sat outside its allowed domain.
    #[error("value out of range: {0}")]
    ValueOutOfRange(&'static str),
    #[error(transparent)]
    Bus(#[from] BusError),
    /// The slave answered, but not with what this request permits.
    #[error("invalid response: {0}")]
    InvalidResponse(&'static str),
}

impl From<EncodeError> for InstrumentError {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::ValueOutOfRange => {
                Self::ValueOutOfRange("value outside the encodable range")
            }
            EncodeError::InvalidLength => Self::InvalidArgument("invalid value length"),
            EncodeError::BufferTooSmall => Self::InvalidArgument("value does not fit a frame"),
            EncodeError::Message(msg) => Self::InvalidArgument(msg),
        }
    }
}

impl From<DecodeError> for InstrumentError {
    fn from(err: DecodeError) -> Self {
        Self::Bus(BusError::from(err))
    }
}

/// Which bit table a read addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitFunction {
    /// Function code 1.
    Coils,
    /// Function code 2.
    #[default]
    DiscreteInputs,
}

/// Which register table a read addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterFunction {
    /// Function code 3.
    #[default]
    Holding,
    /// Function code 4.
    Input,
}

/// How single-register writes go out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteRegisterFunction {
    /// Function code 16 with a register count of one.
    #[default]
    Multiple,
    /// Function code 6.
    Single,
}

/// How single-bit writes go out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteBitFunction {
    /// Function code 5.
    #[default]
    Single,
    /// Function code 15 with a bit count of one.
    Multiple,
}

/// Per-instrument configuration. Everything here can be changed between
/// calls; the bound slave address and bus cannot.
#[derive(Debug, Clone, Copy)]
pub struct InstrumentConfig {
    pub mode: Mode,
    pub response_timeout: Duration,
    pub clear_buffers_before_transaction: bool,
    pub handle_local_echo: bool,
    pub close_port_after_call: bool,
    pub drain_quirk_trailing_byte: bool,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Rtu,
            response_timeout: Duration::from_millis(50),
            clear_buffers_before_transaction: true,
            handle_local_echo: false,
            close_port_after_call: false,
            drain_quirk_trailing_byte: false,
        }
    }
}

impl InstrumentConfig {
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_local_echo(mut self, handle_local_echo: bool) -> Self {
        self.handle_local_echo = handle_local_echo;
        self
    }

    pub fn with_close_port_after_call(mut self, close_port_after_call: bool) -> Self {
        self.close_port_after_call = close_port_after_call;
        self
    }

    pub fn with_quirk_trailing_byte(mut self, drain: bool) -> Self {
        self.drain_quirk_trailing_byte = drain;
        self
    }

    fn transact_options(&self) -> TransactOptions {
        TransactOptions {
            response_timeout: self.response_timeout,
            clear_buffers_before_transaction: self.clear_buffers_before_transaction,
            handle_local_echo: self.handle_local_echo,
            close_port_after_call: self.close_port_after_call,
            drain_quirk_trailing_byte: self.drain_quirk_trailing_byte,
        }
    }
}

pub struct Instrument<P: SerialPort> {
    bus: Arc<Bus<P>>,
    slave_address: u8,
    config: InstrumentConfig,
}

impl Instrument<TokioSerialPort> {
    /// Open a serial port and bind an instrument to it. Address 0 is
    /// broadcast; 248 to 255 are reserved but accepted.
    pub async fn open_serial(
        path: &str,
        slave_address: u8,
        serial: SerialConfig,
        config: InstrumentConfig,
    ) -> Result<Self, InstrumentError> {
        let mut port = TokioSerialPort::new(path, serial);
        if !config.close_port_after_call {
            port.open().await.map_err(BusError::Transport)?;
        }
        Ok(Self::with_bus(Arc::new(Bus::new(port)), slave_address, config))
    }
}

impl<P: SerialPort> Instrument<P> {
    /// Bind to an existing bus, sharing it with other instruments on the
    /// same line.
    pub fn with_bus(bus: Arc<Bus<P>>, slave_address: u8, config: InstrumentConfig) -> Self {
        Self {
            bus,
            slave_address,
            config,
        }
    }

    pub fn bus(&self) -> Arc<Bus<P>> {
        Arc::clone(&self.bus)
    }

    pub fn slave_address(&self) -> u8 {
        self.slave_address
    }

    pub fn config(&self) -> InstrumentConfig {
        self.config
    }

    pub fn set_config(&mut self, config: InstrumentConfig) {
        self.config = config;
    }

    fn is_broadcast(&self) -> bool {
        self.slave_address == modline_datalink::BROADCAST_ADDRESS
    }

    fn ensure_unicast(&self) -> Result<(), InstrumentError> {
        if self.is_broadcast() {
            return Err(InstrumentError::InvalidArgument(
                "the broadcast address cannot be read from",
            ));
        }
        Ok(())
    }

    async fn transact(&self, request: &Request<'_>) -> Result<Vec<u8>, InstrumentError> {
        debug!(
            slave = self.slave_address,
            function = request.function_code().as_u8(),
            "dispatching request"
        );
        Ok(self
            .bus
            .transact(
                self.slave_address,
                self.config.mode,
                request,
                &self.config.transact_options(),
            )
            .await?)
    }

    /// Read `count` bits starting at `address`.
    pub async fn read_bits(
        &self,
        address: u16,
        count: u16,
        function: BitFunction,
    ) -> Result<Vec<bool>, InstrumentError> {
        self.ensure_unicast()?;
        if count == 0 || count > MAX_READ_BITS {
            return Err(InstrumentError::ValueOutOfRange(
                "bit count must be 1 to 2000",
            ));
        }

        let request = Request::Read(match function {
            BitFunction::Coils => ReadRequest::coils(address, count),
            BitFunction::DiscreteInputs => ReadRequest::discrete_inputs(address, count),
        });

        let pdu = self.transact(&request).await?;
        let mut reader = Reader::new(&pdu);
        match Response::decode(&mut reader)? {
            Response::ReadBits(resp) => {
                if !reader.is_empty() {
                    return Err(InstrumentError::InvalidResponse(
                        "trailing bytes in response",
                    ));
                }
                if resp.data.len() != usize::from(count).div_ceil(8) {
                    return Err(InstrumentError::InvalidResponse(
                        "bit payload length mismatch",
                    ));
                }
                Ok(value::unpack_bits(resp.data, usize::from(count))?)
            }
            _ => Err(InstrumentError::InvalidResponse(
                "unexpected function response",
            )),
        }
    }

    /// Read a single coil or discrete input.
    pub async fn read_bit(
        &self,
        address: u16,
        function: BitFunction,
    ) -> Result<bool, InstrumentError> {
        let bits = self.read_bits(address, 1, function).await?;
        Ok(bits[0])
    }

    /// Write one coil, by default with function code 5.
    pub async fn write_bit(
        &self,
        address: u16,
        value: bool,
        function: WriteBitFunction,
    ) -> Result<(), InstrumentError> {
        match function {
            WriteBitFunction::Single => {
                let request = Request::WriteSingle(WriteSingleRequest::coil(address, value));
                let pdu = self.transact(&request).await?;
                if self.is_broadcast() {
                    return Ok(());
                }
                let mut reader = Reader::new(&pdu);
                match Response::decode(&mut reader)? {
                    Response::WriteSingle(resp)
                        if resp.address == address
                            && resp.raw_value == value::coil_value(value) =>
                    {
                        Ok(())
                    }
                    Response::WriteSingle(_) => {
                        Err(InstrumentError::InvalidResponse("write echo mismatch"))
                    }
                    _ => Err(InstrumentError::InvalidResponse(
                        "unexpected function response",
                    )),
                }
            }
            WriteBitFunction::Multiple => self.write_bits(address, &[value]).await,
        }
    }

    /// Write a block of coils with function code 15.
    pub async fn write_bits(
        &self,
        address: u16,
        values: &[bool],
    ) -> Result<(), InstrumentError> {
        if values.is_empty() || values.len() > usize::from(MAX_WRITE_BITS) {
            return Err(InstrumentError::ValueOutOfRange(
                "bit count must be 1 to 1968",
            ));
        }

        let request = Request::WriteBits(WriteBitsRequest {
            start_address: address,
            values,
        });
        let pdu = self.transact(&request).await?;
        if self.is_broadcast() {
            return Ok(());
        }
        let mut reader = Reader::new(&pdu);
        match Response::decode(&mut reader)? {
            Response::WriteMultiple(resp)
                if resp.start_address == address
                    && usize::from(resp.quantity) == values.len() =>
            {
                Ok(())
            }
            Response::WriteMultiple(_) => {
                Err(InstrumentError::InvalidResponse("write echo mismatch"))
            }
            _ => Err(InstrumentError::InvalidResponse(
                "unexpected function response",
            )),
        }
    }

    async fn read_register_data(
        &self,
        address: u16,
        quantity: u16,
        function: RegisterFunction,
    ) -> Result<Vec<u8>, InstrumentError> {
        self.ensure_unicast()?;
        if quantity == 0 || quantity > MAX_READ_REGISTERS {
            return Err(InstrumentError::ValueOutOfRange(
                "register count must be 1 to 125",
            ));
        }

        let request = Request::Read(match function {
            RegisterFunction::Holding => ReadRequest::holding_registers(address, quantity),
            RegisterFunction::Input => ReadRequest::input_registers(address, quantity),
        });

        let pdu = self.transact(&request).await?;
        let mut reader = Reader::new(&pdu);
        match Response::decode(&mut reader)? {
            Response::ReadRegisters(resp) => {
                if !reader.is_empty() {
                    return Err(InstrumentError::InvalidResponse(
                        "trailing bytes in response",
                    ));
                }
                if resp.data.len() != usize::from(quantity) * 2 {
                    return Err(InstrumentError::InvalidResponse(
                        "register payload length mismatch",
                    ));
                }
                Ok(resp.data.to_vec())
            }
            _ => Err(InstrumentError::InvalidResponse(
                "unexpected function response",
            )),
        }
    }

    async fn write_register_block(
        &self,
        address: u16,
        values: &[u16],
    ) -> Result<(), InstrumentError> {
        if values.is_empty() || values.len() > usize::from(MAX_WRITE_REGISTERS) {
            return Err(InstrumentError::ValueOutOfRange(
                "register count must be 1 to 123",
            ));
        }

        let request = Request::WriteRegisters(WriteRegistersRequest {
            start_address: address,
            values,
        });
        let pdu = self.transact(&request).await?;
        if self.is_broadcast() {
            return Ok(());
        }
        let mut reader = Reader::new(&pdu);
        match Response::decode(&mut reader)? {
            Response::WriteMultiple(resp)
                if resp.start_address == address
                    && usize::from(resp.quantity) == values.len() =>
            {
                Ok(())
            }
            Response::WriteMultiple(_) => {
                Err(InstrumentError::InvalidResponse("write echo mismatch"))
            }
            _ => Err(InstrumentError::InvalidResponse(
                "unexpected function response",
            )),
        }
    }

    /// Read one 16-bit register, scaled by `10^decimals`.
    ///
    /// A register holding 770 read with one decimal yields 77.0; with
    /// `signed` the upper range is interpreted as two's complement.
    pub async fn read_register(
        &self,
        address: u16,
        decimals: u8,
        function: RegisterFunction,
        signed: bool,
    ) -> Result<f64, InstrumentError> {
        if decimals > MAX_DECIMALS {
            return Err(InstrumentError::ValueOutOfRange("decimals must be 0 to 10"));
        }
        let data = self.read_register_data(address, 1, function).await?;
        let raw = value::decode_u16([data[0], data[1]]);
        Ok(value::scale_from_register(raw, decimals, signed)?)
    }

    /// Write one 16-bit register, scaling the value by `10^decimals` first.
    pub async fn write_register(
        &self,
        address: u16,
        value: f64,
        decimals: u8,
        function: WriteRegisterFunction,
        signed: bool,
    ) -> Result<(), InstrumentError> {
        if decimals > MAX_DECIMALS {
            return Err(InstrumentError::ValueOutOfRange("decimals must be 0 to 10"));
        }
        let raw = value::scale_to_register(value, decimals, signed)?;

        match function {
            WriteRegisterFunction::Multiple => self.write_register_block(address, &[raw]).await,
            WriteRegisterFunction::Single => {
                let request = Request::WriteSingle(WriteSingleRequest::register(address, raw));
                let pdu = self.transact(&request).await?;
                if self.is_broadcast() {
                    return Ok(());
                }
                let mut reader = Reader::new(&pdu);
                match Response::decode(&mut reader)? {
                    Response::WriteSingle(resp)
                        if resp.address == address && resp.raw_value == raw =>
                    {
                        Ok(())
                    }
                    Response::WriteSingle(_) => {
                        Err(InstrumentError::InvalidResponse("write echo mismatch"))
                    }
                    _ => Err(InstrumentError::InvalidResponse(
                        "unexpected function response",
                    )),
                }
            }
        }
    }

    /// Read a block of raw 16-bit registers.
    pub async fn read_registers(
        &self,
        address: u16,
        count: u16,
        function: RegisterFunction,
    ) -> Result<Vec<u16>, InstrumentError> {
        let data = self.read_register_data(address, count, function).await?;
        Ok(data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Write a block of raw 16-bit registers with function code 16.
    pub async fn write_registers(
        &self,
        address: u16,
        values: &[u16],
    ) -> Result<(), InstrumentError> {
        self.write_register_block(address, values).await
    }

    /// Read a 32-bit unsigned integer from two consecutive registers.
    pub async fn read_u32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<u32, InstrumentError> {
        let data = self.read_register_data(address, 2, function).await?;
        Ok(value::decode_u32([data[0], data[1], data[2], data[3]], order))
    }

    pub async fn read_i32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<i32, InstrumentError> {
        Ok(self.read_u32(address, function, order).await? as i32)
    }

    /// Read a 64-bit unsigned integer from four consecutive registers.
    pub async fn read_u64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<u64, InstrumentError> {
        let data = self.read_register_data(address, 4, function).await?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data);
        Ok(value::decode_u64(bytes, order))
    }

    pub async fn read_i64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<i64, InstrumentError> {
        Ok(self.read_u64(address, function, order).await? as i64)
    }

    pub async fn write_u32(
        &self,
        address: u16,
        value: u32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        let bytes = value::encode_u32(value, order);
        self.write_register_block(address, &registers_from(&bytes))
            .await
    }

    pub async fn write_i32(
        &self,
        address: u16,
        value: i32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.write_u32(address, value as u32, order).await
    }

    pub async fn write_u64(
        &self,
        address: u16,
        value: u64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        let bytes = value::encode_u64(value, order);
        self.write_register_block(address, &registers_from(&bytes))
            .await
    }

    pub async fn write_i64(
        &self,
        address: u16,
        value: i64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.write_u64(address, value as u64, order).await
    }

    /// Read an IEEE-754 single-precision float from two registers.
    pub async fn read_f32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<f32, InstrumentError> {
        let data = self.read_register_data(address, 2, function).await?;
        Ok(value::decode_f32([data[0], data[1], data[2], data[3]], order))
    }

    /// Read an IEEE-754 double-precision float from four registers.
    pub async fn read_f64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<f64, InstrumentError> {
        let data = self.read_register_data(address, 4, function).await?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&data);
        Ok(value::decode_f64(bytes, order))
    }

    pub async fn write_f32(
        &self,
        address: u16,
        value: f32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        let bytes = value::encode_f32(value, order)?;
        self.write_register_block(address, &registers_from(&bytes))
            .await
    }

    pub async fn write_f64(
        &self,
        address: u16,
        value: f64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        let bytes = value::encode_f64(value, order)?;
        self.write_register_block(address, &registers_from(&bytes))
            .await
    }

    /// Read `count` registers as text, two characters per register, exactly
    /// as stored (no trimming).
    pub async fn read_text(
        &self,
        address: u16,
        count: u16,
        function: RegisterFunction,
    ) -> Result<String, InstrumentError> {
        let data = self.read_register_data(address, count, function).await?;
        Ok(value::decode_text(&data)?)
    }

    /// Write ASCII text into `count` registers, right-padded with spaces.
    pub async fn write_text(
        &self,
        address: u16,
        text: &str,
        count: u16,
    ) -> Result<(), InstrumentError> {
        if count == 0 || count > MAX_WRITE_REGISTERS {
            return Err(InstrumentError::ValueOutOfRange(
                "register count must be 1 to 123",
            ));
        }
        let bytes = value::encode_text(text, count)?;
        self.write_register_block(address, &registers_from(&bytes))
            .await
    }
}

fn registers_from(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Frame-level fake: every write_all pops one scripted response.
    #[derive(Default)]
    struct ScriptedPort {
        responses: Arc<Mutex<VecDeque<Vec<u8>>>>,
        pending: VecDeque<u8>,
        writes: Arc<Mutex<Vec<Vec<u8>>>>,
        open: bool,
    }

    impl ScriptedPort {
        fn with_responses(responses: Vec<Vec<u8>>) -> Self {
            Self {
                responses: Arc::new(Mutex::new(responses.into())),
                ..Self::default()
            }
        }

        fn writes_handle(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
            Arc::clone(&self.writes)
        }
    }

    #[async_trait]
    impl SerialPort for ScriptedPort {
        async fn open(&mut self) -> io::Result<()> {
            self.open = true;
            Ok(())
        }

        async fn close(&mut self) -> io::Result<()> {
            self.open = false;
            Ok(())
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn baud_rate(&self) -> u32 {
            19200
        }

        async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
            self.writes.lock().unwrap().push(data.to_vec());
            if let Some(response) = self.responses.lock().unwrap().pop_front() {
                self.pending.extend(response);
            }
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
            let mut filled = 0;
            while filled < buf.len() {
                match self.pending.pop_front() {
                    Some(byte) => {
                        buf[filled] = byte;
                        filled += 1;
                    }
                    None => break,
                }
            }
            Ok(filled)
        }

        async fn clear_input(&mut self) -> io::Result<()> {
            self.pending.clear();
            Ok(())
        }

        async fn clear_output(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn instrument(port: ScriptedPort, slave: u8) -> Instrument<ScriptedPort> {
        Instrument::with_bus(
            Arc::new(Bus::new(port)),
            slave,
            InstrumentConfig::default(),
        )
    }

    #[tokio::test]
    async fn read_register_scales_response() {
        let port = ScriptedPort::with_responses(vec![vec![
            0x01, 0x03, 0x02, 0x00, 0xBA, 0x39, 0xF7,
        ]]);
        let writes = port.writes_handle();
        let inst = instrument(port, 0x01);

        let value = inst
            .read_register(5, 1, RegisterFunction::Holding, false)
            .await
            .unwrap();
        assert_eq!(value, 18.6);
        assert_eq!(
            writes.lock().unwrap()[0],
            [0x01, 0x03, 0x00, 0x05, 0x00, 0x01, 0x94, 0x0B]
        );
    }

    #[tokio::test]
    async fn write_register_issues_fc16_by_default() {
        let port = ScriptedPort::with_responses(vec![vec![
            0x0A, 0x10, 0x10, 0x01, 0x00, 0x01, 0x55, 0xB2,
        ]]);
        let writes = port.writes_handle();
        let inst = instrument(port, 0x0A);

        inst.write_register(4097, 325.8, 1, WriteRegisterFunction::Multiple, false)
            .await
            .unwrap();
        assert_eq!(
            writes.lock().unwrap()[0],
            [0x0A, 0x10, 0x10, 0x01, 0x00, 0x01, 0x02, 0x0C, 0xBA, 0x41, 0xC3]
        );
    }

    #[tokio::test]
    async fn write_register_echo_mismatch_is_rejected() {
        // The slave echoes a different register count.
        let port = ScriptedPort::with_responses(vec![vec![
            0x0A, 0x10, 0x10, 0x01, 0x00, 0x02, 0x15, 0xB3,
        ]]);
        let inst = instrument(port, 0x0A);

        let err = inst
            .write_register(4097, 325.8, 1, WriteRegisterFunction::Multiple, false)
            .await
            .unwrap_err();
        assert!(matches!(err, InstrumentError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn read_bits_masks_surplus_bits() {
        // Slave sets all eight bits although only three were requested.
        let port =
            ScriptedPort::with_responses(vec![vec![0x01, 0x01, 0x01, 0xFF, 0x11, 0xC8]]);
        let inst = instrument(port, 0x01);

        let bits = inst.read_bits(0, 3, BitFunction::Coils).await.unwrap();
        assert_eq!(bits, [true, true, true]);
    }

    #[tokio::test]
    async fn arguments_are_validated_before_the_bus_is_touched() {
        let port = ScriptedPort::with_responses(vec![]);
        let writes = port.writes_handle();
        let inst = instrument(port, 0x01);

        assert!(matches!(
            inst.read_registers(0, 126, RegisterFunction::Holding)
                .await
                .unwrap_err(),
            InstrumentError::ValueOutOfRange(_)
        ));
        assert!(matches!(
            inst.write_registers(0, &[0u16; 124]).await.unwrap_err(),
            InstrumentError::ValueOutOfRange(_)
        ));
        assert!(matches!(
            inst.read_bits(0, 2001, BitFunction::Coils).await.unwrap_err(),
            InstrumentError::ValueOutOfRange(_)
        ));
        assert!(matches!(
            inst.read_register(0, 11, RegisterFunction::Holding, false)
                .await
                .unwrap_err(),
            InstrumentError::ValueOutOfRange(_)
        ));
        assert!(matches!(
            inst.write_register(0, 65536.0, 0, WriteRegisterFunction::Multiple, false)
                .await
                .unwrap_err(),
            InstrumentError::ValueOutOfRange(_)
        ));
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_reads_are_rejected() {
        let port = ScriptedPort::with_responses(vec![]);
        let writes = port.writes_handle();
        let inst = instrument(port, 0);

        let err = inst
            .read_register(0, 0, RegisterFunction::Holding, false)
            .await
            .unwrap_err();
        assert!(matches!(err, InstrumentError::InvalidArgument(_)));
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_writes_skip_the_response() {
        let port = ScriptedPort::with_responses(vec![]);
        let writes = port.writes_handle();
        let inst = instrument(port, 0);

        inst.write_register(7, 42.0, 0, WriteRegisterFunction::Single, false)
            .await
            .unwrap();
        assert_eq!(writes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reserved_slave_addresses_are_accepted() {
        let port = ScriptedPort::with_responses(vec![vec![
            0xF8, 0x03, 0x02, 0x00, 0x2A, 0xA5, 0x8F,
        ]]);
        let inst = instrument(port, 248);

        let values = inst
            .read_registers(0, 1, RegisterFunction::Holding)
            .await
            .unwrap();
        assert_eq!(values, [0x2A]);
    }
}
