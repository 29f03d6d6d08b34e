use crate::encoding::{Reader, Writer};
use crate::pdu::FunctionCode;
use crate::value::{coil_value, pack_bits};
use crate::{DecodeError, EncodeError};

pub const MAX_READ_BITS: u16 = 2000;
pub const MAX_READ_REGISTERS: u16 = 125;
pub const MAX_WRITE_BITS: u16 = 1968;
pub const MAX_WRITE_REGISTERS: u16 = 123;

/// A read of bits or registers, function codes 1 to 4. The constructors fix
/// which table is addressed; the quantity bound for that table is enforced
/// when the request is encoded or decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
}

impl ReadRequest {
    pub const fn coils(start_address: u16, quantity: u16) -> Self {
        Self {
            function: FunctionCode::ReadCoils,
            start_address,
            quantity,
        }
    }

    pub const fn discrete_inputs(start_address: u16, quantity: u16) -> Self {
        Self {
            function: FunctionCode::ReadDiscreteInputs,
            start_address,
            quantity,
        }
    }

    pub const fn holding_registers(start_address: u16, quantity: u16) -> Self {
        Self {
            function: FunctionCode::ReadHoldingRegisters,
            start_address,
            quantity,
        }
    }

    pub const fn input_registers(start_address: u16, quantity: u16) -> Self {
        Self {
            function: FunctionCode::ReadInputRegisters,
            start_address,
            quantity,
        }
    }

    pub const fn function(&self) -> FunctionCode {
        self.function
    }

    const fn reads_bits(&self) -> bool {
        matches!(
            self.function,
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs
        )
    }

    fn quantity_limit(&self) -> u16 {
        if self.reads_bits() {
            MAX_READ_BITS
        } else {
            MAX_READ_REGISTERS
        }
    }

    /// Data bytes the slave will return: packed bits or two bytes per
    /// register.
    pub fn response_data_len(&self) -> usize {
        let quantity = usize::from(self.quantity);
        if self.reads_bits() {
            quantity.div_ceil(8)
        } else {
            quantity * 2
        }
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.quantity == 0 || self.quantity > self.quantity_limit() {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_u8(self.function.as_u8())?;
        w.write_be_u16(self.start_address)?;
        w.write_be_u16(self.quantity)
    }

    fn decode_body(function: FunctionCode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let decoded = Self {
            function,
            start_address: r.read_be_u16()?,
            quantity: r.read_be_u16()?,
        };
        if decoded.quantity == 0 || decoded.quantity > decoded.quantity_limit() {
            return Err(DecodeError::InvalidValue);
        }
        Ok(decoded)
    }
}

/// A single-point write, function code 5 or 6. The value is held as its raw
/// register image; coils use the 0xFF00 / 0x0000 pattern, which the
/// constructor makes the only representable states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleRequest {
    function: FunctionCode,
    pub address: u16,
    raw_value: u16,
}

impl WriteSingleRequest {
    pub const fn coil(address: u16, on: bool) -> Self {
        Self {
            function: FunctionCode::WriteSingleCoil,
            address,
            raw_value: coil_value(on),
        }
    }

    pub const fn register(address: u16, value: u16) -> Self {
        Self {
            function: FunctionCode::WriteSingleRegister,
            address,
            raw_value: value,
        }
    }

    pub const fn function(&self) -> FunctionCode {
        self.function
    }

    pub const fn raw_value(&self) -> u16 {
        self.raw_value
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(self.function.as_u8())?;
        w.write_be_u16(self.address)?;
        w.write_be_u16(self.raw_value)
    }

    fn decode_body(function: FunctionCode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let address = r.read_be_u16()?;
        let raw_value = r.read_be_u16()?;
        let coil_pattern = raw_value == coil_value(true) || raw_value == coil_value(false);
        if function == FunctionCode::WriteSingleCoil && !coil_pattern {
            return Err(DecodeError::InvalidValue);
        }
        Ok(Self {
            function,
            address,
            raw_value,
        })
    }
}

/// Function code 15: a block of coil states, packed eight to the octet on
/// the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteBitsRequest<'a> {
    pub start_address: u16,
    pub values: &'a [bool],
}

impl<'a> WriteBitsRequest<'a> {
    pub fn quantity(&self) -> Result<u16, EncodeError> {
        match u16::try_from(self.values.len()) {
            Ok(quantity) if quantity >= 1 && quantity <= MAX_WRITE_BITS => Ok(quantity),
            _ => Err(EncodeError::ValueOutOfRange),
        }
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let quantity = self.quantity()?;
        let byte_count = usize::from(quantity).div_ceil(8);

        w.write_u8(FunctionCode::WriteMultipleCoils.as_u8())?;
        w.write_be_u16(self.start_address)?;
        w.write_be_u16(quantity)?;
        w.write_u8(byte_count as u8)?;

        let mut packed = [0u8; MAX_WRITE_BITS as usize / 8];
        pack_bits(self.values, &mut packed[..byte_count]);
        w.write_all(&packed[..byte_count])
    }
}

/// Function code 16: a block of raw register images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRegistersRequest<'a> {
    pub start_address: u16,
    pub values: &'a [u16],
}

impl<'a> WriteRegistersRequest<'a> {
    pub fn quantity(&self) -> Result<u16, EncodeError> {
        match u16::try_from(self.values.len()) {
            Ok(quantity) if quantity >= 1 && quantity <= MAX_WRITE_REGISTERS => Ok(quantity),
            _ => Err(EncodeError::ValueOutOfRange),
        }
    }

    fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let quantity = self.quantity()?;
        w.write_u8(FunctionCode::WriteMultipleRegisters.as_u8())?;
        w.write_be_u16(self.start_address)?;
        w.write_be_u16(quantity)?;
        w.write_u8((quantity * 2) as u8)?;
        for value in self.values {
            w.write_be_u16(*value)?;
        }
        Ok(())
    }
}

/// One request of any implemented function code, ready to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request<'a> {
    Read(ReadRequest),
    WriteSingle(WriteSingleRequest),
    WriteBits(WriteBitsRequest<'a>),
    WriteRegisters(WriteRegistersRequest<'a>),
}

impl<'a> Request<'a> {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::Read(req) => req.encode(w),
            Self::WriteSingle(req) => req.encode(w),
            Self::WriteBits(req) => req.encode(w),
            Self::WriteRegisters(req) => req.encode(w),
        }
    }

    pub fn function_code(&self) -> FunctionCode {
        match self {
            Self::Read(req) => req.function(),
            Self::WriteSingle(req) => req.function(),
            Self::WriteBits(_) => FunctionCode::WriteMultipleCoils,
            Self::WriteRegisters(_) => FunctionCode::WriteMultipleRegisters,
        }
    }

    /// Size of the happy-path response PDU, fully determined before
    /// transmission so the transport can read exactly the right number of
    /// bytes. Reads return a byte-counted data block; writes echo their
    /// four-byte request header.
    pub fn response_pdu_len(&self) -> usize {
        match self {
            Self::Read(req) => 2 + req.response_data_len(),
            Self::WriteSingle(_) | Self::WriteBits(_) | Self::WriteRegisters(_) => 5,
        }
    }
}

/// Request-side decoding, used by the simulated slave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedRequest<'a> {
    Read(ReadRequest),
    WriteSingle(WriteSingleRequest),
    WriteBits {
        start_address: u16,
        quantity: u16,
        packed: &'a [u8],
    },
    WriteRegisters {
        start_address: u16,
        data: &'a [u8],
    },
}

impl<'a> DecodedRequest<'a> {
    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let function = FunctionCode::from_u8(r.read_u8()?)?;
        match function {
            FunctionCode::ReadCoils
            | FunctionCode::ReadDiscreteInputs
            | FunctionCode::ReadHoldingRegisters
            | FunctionCode::ReadInputRegisters => {
                Ok(Self::Read(ReadRequest::decode_body(function, r)?))
            }
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => Ok(
                Self::WriteSingle(WriteSingleRequest::decode_body(function, r)?),
            ),
            FunctionCode::WriteMultipleCoils => {
                let start_address = r.read_be_u16()?;
                let quantity = r.read_be_u16()?;
                if quantity == 0 || quantity > MAX_WRITE_BITS {
                    return Err(DecodeError::InvalidValue);
                }
                let byte_count = usize::from(r.read_u8()?);
                if byte_count != usize::from(quantity).div_ceil(8) {
                    return Err(DecodeError::InvalidLength);
                }
                Ok(Self::WriteBits {
                    start_address,
                    quantity,
                    packed: r.read_exact(byte_count)?,
                })
            }
            FunctionCode::WriteMultipleRegisters => {
                let start_address = r.read_be_u16()?;
                let quantity = r.read_be_u16()?;
                if quantity == 0 || quantity > MAX_WRITE_REGISTERS {
                    return Err(DecodeError::InvalidValue);
                }
                let byte_count = usize::from(r.read_u8()?);
                if byte_count != usize::from(quantity) * 2 {
                    return Err(DecodeError::InvalidLength);
                }
                Ok(Self::WriteRegisters {
                    start_address,
                    data: r.read_exact(byte_count)?,
                })
            }
        }
    }
}
