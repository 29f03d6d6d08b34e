//! An in-memory slave and transport double for exercising the engine
//! without hardware.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use modline_core::encoding::{Reader, Writer};
use modline_core::frame::Mode;
use modline_core::pdu::{
    DecodedRequest, ExceptionCode, ExceptionResponse, FunctionCode, ReadBitsResponse,
    ReadRegistersResponse, Response, WriteMultipleResponse, WriteSingleResponse,
};
use modline_core::value::{coil_value, pack_bits};
use modline_core::MAX_PDU_LEN;
use tokio::time::Instant;

use crate::{SerialPort, BROADCAST_ADDRESS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoilBank {
    values: Vec<bool>,
}

impl CoilBank {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![false; size],
        }
    }

    pub fn get(&self, address: u16) -> Option<bool> {
        self.values.get(usize::from(address)).copied()
    }

    pub fn set(&mut self, address: u16, value: bool) -> bool {
        match self.values.get_mut(usize::from(address)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterBank {
    values: Vec<u16>,
}

impl RegisterBank {
    pub fn new(size: usize) -> Self {
        Self {
            values: vec![0u16; size],
        }
    }

    pub fn get(&self, address: u16) -> Option<u16> {
        self.values.get(usize::from(address)).copied()
    }

    pub fn set(&mut self, address: u16, value: u16) -> bool {
        match self.values.get_mut(usize::from(address)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A conformant slave: decodes request frames, serves its point banks and
/// produces the response frame a real device would, exceptions included.
#[derive(Debug)]
pub struct SimSlave {
    pub address: u8,
    pub mode: Mode,
    pub coils: CoilBank,
    pub discrete_inputs: CoilBank,
    pub holding_registers: RegisterBank,
    pub input_registers: RegisterBank,
}

impl SimSlave {
    pub fn new(address: u8, mode: Mode) -> Self {
        Self {
            address,
            mode,
            coils: CoilBank::new(8192),
            discrete_inputs: CoilBank::new(8192),
            holding_registers: RegisterBank::new(8192),
            input_registers: RegisterBank::new(8192),
        }
    }

    /// Process one request frame. `None` means the line stays silent: the
    /// frame was not addressed to this slave, was malformed at the framing
    /// level, or was a broadcast (which is executed but never answered).
    pub fn respond(&mut self, frame: &[u8]) -> Option<Vec<u8>> {
        let mut scratch = [0u8; MAX_PDU_LEN + 2];
        let mode = self.mode;
        let (address, pdu) = mode.decode_frame(frame, &mut scratch).ok()?;
        if address != self.address && address != BROADCAST_ADDRESS {
            return None;
        }

        let mut response_pdu = [0u8; MAX_PDU_LEN];
        let mut w = Writer::new(&mut response_pdu);
        self.execute(pdu, &mut w).ok()?;

        if address == BROADCAST_ADDRESS {
            return None;
        }

        let mut frame_buf = vec![0u8; mode.frame_len(w.as_written().len())];
        let mut fw = Writer::new(&mut frame_buf);
        mode.encode_frame(&mut fw, self.address, w.as_written()).ok()?;
        Some(frame_buf)
    }

    fn execute(
        &mut self,
        request_pdu: &[u8],
        w: &mut Writer<'_>,
    ) -> Result<(), modline_core::EncodeError> {
        let function_byte = request_pdu.first().copied().unwrap_or(0);
        let mut reader = Reader::new(request_pdu);
        let request = match DecodedRequest::decode(&mut reader) {
            Ok(request) => request,
            Err(err) => {
                let code = match err {
                    modline_core::DecodeError::InvalidFunctionCode => {
                        ExceptionCode::IllegalFunction
                    }
                    _ => ExceptionCode::IllegalDataValue,
                };
                return exception(w, function_byte, code);
            }
        };

        match request {
            DecodedRequest::Read(req) => match req.function() {
                FunctionCode::ReadCoils => read_bits_response(
                    w,
                    req.function(),
                    &self.coils,
                    req.start_address,
                    req.quantity,
                ),
                FunctionCode::ReadDiscreteInputs => read_bits_response(
                    w,
                    req.function(),
                    &self.discrete_inputs,
                    req.start_address,
                    req.quantity,
                ),
                FunctionCode::ReadHoldingRegisters => read_registers_response(
                    w,
                    req.function(),
                    &self.holding_registers,
                    req.start_address,
                    req.quantity,
                ),
                _ => read_registers_response(
                    w,
                    req.function(),
                    &self.input_registers,
                    req.start_address,
                    req.quantity,
                ),
            },
            DecodedRequest::WriteSingle(req) => {
                let stored = match req.function() {
                    FunctionCode::WriteSingleCoil => self
                        .coils
                        .set(req.address, req.raw_value() == coil_value(true)),
                    _ => self.holding_registers.set(req.address, req.raw_value()),
                };
                if !stored {
                    return exception(w, function_byte, ExceptionCode::IllegalDataAddress);
                }
                Response::WriteSingle(WriteSingleResponse {
                    function: req.function(),
                    address: req.address,
                    raw_value: req.raw_value(),
                })
                .encode(w)
            }
            DecodedRequest::WriteBits {
                start_address,
                quantity,
                packed,
            } => {
                for i in 0..quantity {
                    let Some(address) = start_address.checked_add(i) else {
                        return exception(w, function_byte, ExceptionCode::IllegalDataAddress);
                    };
                    let bit = (packed[usize::from(i) / 8] & (1u8 << (i % 8))) != 0;
                    if !self.coils.set(address, bit) {
                        return exception(w, function_byte, ExceptionCode::IllegalDataAddress);
                    }
                }
                Response::WriteMultiple(WriteMultipleResponse {
                    function: FunctionCode::WriteMultipleCoils,
                    start_address,
                    quantity,
                })
                .encode(w)
            }
            DecodedRequest::WriteRegisters {
                start_address,
                data,
            } => {
                let quantity = (data.len() / 2) as u16;
                for i in 0..quantity {
                    let Some(address) = start_address.checked_add(i) else {
                        return exception(w, function_byte, ExceptionCode::IllegalDataAddress);
                    };
                    let offset = usize::from(i) * 2;
                    let value = u16::from_be_bytes([data[offset], data[offset + 1]]);
                    if !self.holding_registers.set(address, value) {
                        return exception(w, function_byte, ExceptionCode::IllegalDataAddress);
                    }
                }
                Response::WriteMultiple(WriteMultipleResponse {
                    function: FunctionCode::WriteMultipleRegisters,
                    start_address,
                    quantity,
                })
                .encode(w)
            }
        }
    }
}

fn exception(
    w: &mut Writer<'_>,
    function_byte: u8,
    code: ExceptionCode,
) -> Result<(), modline_core::EncodeError> {
    ExceptionResponse {
        function_code: function_byte & 0x7F,
        exception_code: code,
    }
    .encode(w)
}

fn read_bits_response(
    w: &mut Writer<'_>,
    function: FunctionCode,
    bank: &CoilBank,
    start_address: u16,
    quantity: u16,
) -> Result<(), modline_core::EncodeError> {
    let mut bits = Vec::with_capacity(usize::from(quantity));
    for i in 0..quantity {
        let value = start_address
            .checked_add(i)
            .and_then(|address| bank.get(address));
        match value {
            Some(bit) => bits.push(bit),
            None => return exception(w, function.as_u8(), ExceptionCode::IllegalDataAddress),
        }
    }
    let mut packed = vec![0u8; bits.len().div_ceil(8)];
    pack_bits(&bits, &mut packed);
    Response::ReadBits(ReadBitsResponse {
        function,
        data: &packed,
    })
    .encode(w)
}

fn read_registers_response(
    w: &mut Writer<'_>,
    function: FunctionCode,
    bank: &RegisterBank,
    start_address: u16,
    quantity: u16,
) -> Result<(), modline_core::EncodeError> {
    let mut data = Vec::with_capacity(usize::from(quantity) * 2);
    for i in 0..quantity {
        let value = start_address
            .checked_add(i)
            .and_then(|address| bank.get(address));
        match value {
            Some(register) => data.extend_from_slice(&register.to_be_bytes()),
            None => return exception(w, function.as_u8(), ExceptionCode::IllegalDataAddress),
        }
    }
    Response::ReadRegisters(ReadRegistersResponse {
        function,
        data: &data,
    })
    .encode(w)
}

/// A record of everything the master transmitted, shared out of the port so
/// tests can assert on it after the port has moved into a bus.
#[derive(Debug, Default)]
pub struct SimLog {
    pub writes: Vec<Vec<u8>>,
    pub write_times: Vec<Instant>,
}

/// [`SerialPort`] double wired straight to a [`SimSlave`]. Reads return
/// whatever the slave queued, immediately; an empty queue models a timeout.
pub struct SimPort {
    slave: SimSlave,
    pending: VecDeque<u8>,
    scripted: VecDeque<Vec<u8>>,
    local_echo: bool,
    baud_rate: u32,
    open: bool,
    log: Arc<Mutex<SimLog>>,
}

impl SimPort {
    pub fn new(slave: SimSlave) -> Self {
        Self {
            slave,
            pending: VecDeque::new(),
            scripted: VecDeque::new(),
            local_echo: false,
            baud_rate: 19200,
            open: false,
            log: Arc::new(Mutex::new(SimLog::default())),
        }
    }

    pub fn with_local_echo(mut self, local_echo: bool) -> Self {
        self.local_echo = local_echo;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Queue a raw byte sequence to be returned for the next request instead
    /// of the slave's own answer. Used for fault injection.
    pub fn push_raw_response(&mut self, bytes: impl Into<Vec<u8>>) {
        self.scripted.push_back(bytes.into());
    }

    pub fn log_handle(&self) -> Arc<Mutex<SimLog>> {
        Arc::clone(&self.log)
    }
}

#[async_trait]
impl SerialPort for SimPort {
    async fn open(&mut self) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.open = false;
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "sim port is closed",
            ));
        }
        {
            let mut log = self.log.lock().unwrap_or_else(|err| err.into_inner());
            log.writes.push(data.to_vec());
            log.write_times.push(Instant::now());
        }
        if self.local_echo {
            self.pending.extend(data);
        }
        if let Some(raw) = self.scripted.pop_front() {
            self.pending.extend(raw);
        } else if let Some(response) = self.slave.respond(data) {
            self.pending.extend(response);
        }
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        if !self.open {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "sim port is closed",
            ));
        }
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
