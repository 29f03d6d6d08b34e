use crate::encoding::{Reader, Writer};
use crate::pdu::{ExceptionCode, ExceptionResponse, FunctionCode};
use crate::value::coil_value;
use crate::{DecodeError, EncodeError};

use super::request::{MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MAX_WRITE_REGISTERS};

fn checked_byte_count(r: &mut Reader<'_>, limit: usize) -> Result<usize, DecodeError> {
    let byte_count = usize::from(r.read_u8()?);
    if byte_count == 0 || byte_count > limit {
        return Err(DecodeError::InvalidLength);
    }
    Ok(byte_count)
}

/// Byte-counted bit data returned by function codes 1 and 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBitsResponse<'a> {
    pub function: FunctionCode,
    pub data: &'a [u8],
}

impl<'a> ReadBitsResponse<'a> {
    fn decode_body(function: FunctionCode, r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let byte_count = checked_byte_count(r, usize::from(MAX_READ_BITS).div_ceil(8))?;
        Ok(Self {
            function,
            data: r.read_exact(byte_count)?,
        })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let byte_count =
            u8::try_from(self.data.len()).map_err(|_| EncodeError::ValueOutOfRange)?;
        w.write_u8(self.function.as_u8())?;
        w.write_u8(byte_count)?;
        w.write_all(self.data)
    }

    /// Bit states are packed LSB first; bits past the transmitted count read
    /// as `None`.
    pub fn bit(&self, index: usize) -> Option<bool> {
        let byte = *self.data.get(index / 8)?;
        Some(byte >> (index % 8) & 1 == 1)
    }
}

/// Byte-counted register data returned by function codes 3 and 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRegistersResponse<'a> {
    pub function: FunctionCode,
    pub data: &'a [u8],
}

impl<'a> ReadRegistersResponse<'a> {
    fn decode_body(function: FunctionCode, r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let byte_count = checked_byte_count(r, usize::from(MAX_READ_REGISTERS) * 2)?;
        if byte_count % 2 != 0 {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self {
            function,
            data: r.read_exact(byte_count)?,
        })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.data.len() % 2 != 0 {
            return Err(EncodeError::InvalidLength);
        }
        let byte_count =
            u8::try_from(self.data.len()).map_err(|_| EncodeError::ValueOutOfRange)?;
        w.write_u8(self.function.as_u8())?;
        w.write_u8(byte_count)?;
        w.write_all(self.data)
    }

    pub fn register_count(&self) -> usize {
        self.data.len() / 2
    }

    pub fn register(&self, index: usize) -> Option<u16> {
        self.data
            .chunks_exact(2)
            .nth(index)
            .map(|pair| u16::from(pair[0]) << 8 | u16::from(pair[1]))
    }
}

/// Echo of a single-point write, function code 5 or 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSingleResponse {
    pub function: FunctionCode,
    pub address: u16,
    pub raw_value: u16,
}

impl WriteSingleResponse {
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

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(self.function.as_u8())?;
        w.write_be_u16(self.address)?;
        w.write_be_u16(self.raw_value)
    }
}

/// Echo of a block write, function code 15 or 16: the start address and the
/// number of points written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMultipleResponse {
    pub function: FunctionCode,
    pub start_address: u16,
    pub quantity: u16,
}

impl WriteMultipleResponse {
    fn quantity_limit(function: FunctionCode) -> u16 {
        if function == FunctionCode::WriteMultipleCoils {
            MAX_WRITE_BITS
        } else {
            MAX_WRITE_REGISTERS
        }
    }

    fn decode_body(function: FunctionCode, r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let decoded = Self {
            function,
            start_address: r.read_be_u16()?,
            quantity: r.read_be_u16()?,
        };
        if decoded.quantity == 0 || decoded.quantity > Self::quantity_limit(function) {
            return Err(DecodeError::InvalidValue);
        }
        Ok(decoded)
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.quantity == 0 || self.quantity > Self::quantity_limit(self.function) {
            return Err(EncodeError::ValueOutOfRange);
        }
        w.write_u8(self.function.as_u8())?;
        w.write_be_u16(self.start_address)?;
        w.write_be_u16(self.quantity)
    }
}

/// One response PDU of any implemented function code, or a slave exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response<'a> {
    ReadBits(ReadBitsResponse<'a>),
    ReadRegisters(ReadRegistersResponse<'a>),
    WriteSingle(WriteSingleResponse),
    WriteMultiple(WriteMultipleResponse),
    Exception(ExceptionResponse),
}

impl<'a> Response<'a> {
    pub fn decode(r: &mut Reader<'a>) -> Result<Self, DecodeError> {
        let function_byte = r.read_u8()?;
        if FunctionCode::is_exception(function_byte) {
            return Ok(Self::Exception(ExceptionResponse {
                function_code: function_byte & 0x7F,
                exception_code: ExceptionCode::from_u8(r.read_u8()?),
            }));
        }

        let function = FunctionCode::from_u8(function_byte)?;
        match function {
            FunctionCode::ReadCoils | FunctionCode::ReadDiscreteInputs => {
                Ok(Self::ReadBits(ReadBitsResponse::decode_body(function, r)?))
            }
            FunctionCode::ReadHoldingRegisters | FunctionCode::ReadInputRegisters => Ok(
                Self::ReadRegisters(ReadRegistersResponse::decode_body(function, r)?),
            ),
            FunctionCode::WriteSingleCoil | FunctionCode::WriteSingleRegister => Ok(
                Self::WriteSingle(WriteSingleResponse::decode_body(function, r)?),
            ),
            FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => Ok(
                Self::WriteMultiple(WriteMultipleResponse::decode_body(function, r)?),
            ),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::ReadBits(resp) => resp.encode(w),
            Self::ReadRegisters(resp) => resp.encode(w),
            Self::WriteSingle(resp) => resp.encode(w),
            Self::WriteMultiple(resp) => resp.encode(w),
            Self::Exception(resp) => resp.encode(w),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ReadRegistersResponse, Response, WriteSingleResponse};
    use crate::encoding::{Reader, Writer};
    use crate::pdu::{ExceptionCode, FunctionCode};
    use crate::DecodeError;

    fn decode(bytes: &[u8]) -> Result<Response<'_>, DecodeError> {
        Response::decode(&mut Reader::new(bytes))
    }

    #[test]
    fn register_accessors_walk_pairs() {
        let resp = ReadRegistersResponse {
            function: FunctionCode::ReadHoldingRegisters,
            data: &[0x07, 0xD0, 0x00, 0xBA],
        };
        assert_eq!(resp.register_count(), 2);
        assert_eq!(resp.register(0), Some(0x07D0));
        assert_eq!(resp.register(1), Some(0x00BA));
        assert_eq!(resp.register(2), None);
    }

    #[test]
    fn bit_accessor_reads_lsb_first() {
        match decode(&[0x02, 0x01, 0b0000_0101]).unwrap() {
            Response::ReadBits(resp) => {
                assert_eq!(resp.function, FunctionCode::ReadDiscreteInputs);
                assert_eq!(resp.bit(0), Some(true));
                assert_eq!(resp.bit(1), Some(false));
                assert_eq!(resp.bit(2), Some(true));
                assert_eq!(resp.bit(8), None);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn exception_pdus_take_priority() {
        match decode(&[0x83, 0x19]).unwrap() {
            Response::Exception(ex) => {
                assert_eq!(ex.function_code, 0x03);
                assert_eq!(ex.exception_code, ExceptionCode::Unknown(0x19));
            }
            _ => panic!("expected exception"),
        }
    }

    #[test]
    fn register_byte_counts_must_be_even_and_present() {
        assert_eq!(
            decode(&[0x03, 0x03, 0x00, 0xBA, 0x00]).unwrap_err(),
            DecodeError::InvalidLength
        );
        assert_eq!(
            decode(&[0x04, 0x00]).unwrap_err(),
            DecodeError::InvalidLength
        );
        assert_eq!(
            decode(&[0x03, 0x04, 0x00, 0xBA]).unwrap_err(),
            DecodeError::UnexpectedEof
        );
    }

    #[test]
    fn coil_echo_must_use_the_wire_pattern() {
        assert_eq!(
            decode(&[0x05, 0x00, 0x01, 0x12, 0x34]).unwrap_err(),
            DecodeError::InvalidValue
        );
        match decode(&[0x05, 0x08, 0x14, 0xFF, 0x00]).unwrap() {
            Response::WriteSingle(resp) => {
                assert_eq!(resp.address, 2068);
                assert_eq!(resp.raw_value, 0xFF00);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn block_write_echo_roundtrips() {
        let original = Response::WriteMultiple(super::WriteMultipleResponse {
            function: FunctionCode::WriteMultipleRegisters,
            start_address: 4097,
            quantity: 1,
        });
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        original.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x10, 0x10, 0x01, 0x00, 0x01]);
        assert_eq!(decode(w.as_written()).unwrap(), original);
    }

    #[test]
    fn single_write_echo_roundtrips() {
        let original = Response::WriteSingle(WriteSingleResponse {
            function: FunctionCode::WriteSingleRegister,
            address: 7,
            raw_value: 0x002A,
        });
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        original.encode(&mut w).unwrap();
        assert_eq!(decode(w.as_written()).unwrap(), original);
    }
}
