//! Blocking wrapper for callers without an async runtime.

use modline_datalink::{BusError, SerialConfig, SerialPort, TokioSerialPort};
use tokio::runtime::Runtime;

use crate::{
    BitFunction, Instrument as AsyncInstrument, InstrumentConfig, InstrumentError,
    RegisterFunction, WordOrder, WriteBitFunction, WriteRegisterFunction,
};

/// A synchronous [`crate::Instrument`]: owns a private runtime and blocks on
/// every operation.
pub struct Instrument<P: SerialPort> {
    runtime: Runtime,
    inner: AsyncInstrument<P>,
}

impl Instrument<TokioSerialPort> {
    pub fn open_serial(
        path: &str,
        slave_address: u8,
        serial: SerialConfig,
        config: InstrumentConfig,
    ) -> Result<Self, InstrumentError> {
        let runtime = new_runtime()?;
        let inner =
            runtime.block_on(AsyncInstrument::open_serial(path, slave_address, serial, config))?;
        Ok(Self { runtime, inner })
    }
}

fn new_runtime() -> Result<Runtime, InstrumentError> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| InstrumentError::Bus(BusError::Transport(err)))
}

impl<P: SerialPort> Instrument<P> {
    /// Wrap an already-constructed async instrument.
    pub fn from_async(inner: AsyncInstrument<P>) -> Result<Self, InstrumentError> {
        Ok(Self {
            runtime: new_runtime()?,
            inner,
        })
    }

    pub fn config(&self) -> InstrumentConfig {
        self.inner.config()
    }

    pub fn set_config(&mut self, config: InstrumentConfig) {
        self.inner.set_config(config);
    }

    pub fn slave_address(&self) -> u8 {
        self.inner.slave_address()
    }

    pub fn read_bit(&self, address: u16, function: BitFunction) -> Result<bool, InstrumentError> {
        self.runtime.block_on(self.inner.read_bit(address, function))
    }

    pub fn read_bits(
        &self,
        address: u16,
        count: u16,
        function: BitFunction,
    ) -> Result<Vec<bool>, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_bits(address, count, function))
    }

    pub fn write_bit(
        &self,
        address: u16,
        value: bool,
        function: WriteBitFunction,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_bit(address, value, function))
    }

    pub fn write_bits(&self, address: u16, values: &[bool]) -> Result<(), InstrumentError> {
        self.runtime.block_on(self.inner.write_bits(address, values))
    }

    pub fn read_register(
        &self,
        address: u16,
        decimals: u8,
        function: RegisterFunction,
        signed: bool,
    ) -> Result<f64, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_register(address, decimals, function, signed))
    }

    pub fn write_register(
        &self,
        address: u16,
        value: f64,
        decimals: u8,
        function: WriteRegisterFunction,
        signed: bool,
    ) -> Result<(), InstrumentError> {
        self.runtime.block_on(self.inner.write_register(
            address, value, decimals, function, signed,
        ))
    }

    pub fn read_registers(
        &self,
        address: u16,
        count: u16,
        function: RegisterFunction,
    ) -> Result<Vec<u16>, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_registers(address, count, function))
    }

    pub fn write_registers(&self, address: u16, values: &[u16]) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_registers(address, values))
    }

    pub fn read_u32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<u32, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_u32(address, function, order))
    }

    pub fn read_i32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<i32, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_i32(address, function, order))
    }

    pub fn read_u64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<u64, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_u64(address, function, order))
    }

    pub fn read_i64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<i64, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_i64(address, function, order))
    }

    pub fn write_u32(
        &self,
        address: u16,
        value: u32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_u32(address, value, order))
    }

    pub fn write_i32(
        &self,
        address: u16,
        value: i32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_i32(address, value, order))
    }

    pub fn write_u64(
        &self,
        address: u16,
        value: u64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_u64(address, value, order))
    }

    pub fn write_i64(
        &self,
        address: u16,
        value: i64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_i64(address, value, order))
    }

    pub fn read_f32(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<f32, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_f32(address, function, order))
    }

    pub fn read_f64(
        &self,
        address: u16,
        function: RegisterFunction,
        order: WordOrder,
    ) -> Result<f64, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_f64(address, function, order))
    }

    pub fn write_f32(
        &self,
        address: u16,
        value: f32,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_f32(address, value, order))
    }

    pub fn write_f64(
        &self,
        address: u16,
        value: f64,
        order: WordOrder,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_f64(address, value, order))
    }

    pub fn read_text(
        &self,
        address: u16,
        count: u16,
        function: RegisterFunction,
    ) -> Result<String, InstrumentError> {
        self.runtime
            .block_on(self.inner.read_text(address, count, function))
    }

    pub fn write_text(
        &self,
        address: u16,
        text: &str,
        count: u16,
    ) -> Result<(), InstrumentError> {
        self.runtime
            .block_on(self.inner.write_text(address, text, count))
    }
}
