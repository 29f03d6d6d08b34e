use crate::encoding::{Reader, Writer};
use crate::pdu::FunctionCode;
use crate::{DecodeError, EncodeError};

/// Exception codes a slave can report. Unrecognised codes are preserved
/// rather than rejected; devices in the field report all sorts of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    NegativeAcknowledge,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Unknown(u8),
}

impl ExceptionCode {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::SlaveDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::SlaveDeviceBusy,
            0x07 => Self::NegativeAcknowledge,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetFailedToRespond,
            other => Self::Unknown(other),
        }
    }

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::SlaveDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::SlaveDeviceBusy => 0x06,
            Self::NegativeAcknowledge => 0x07,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetFailedToRespond => 0x0B,
            Self::Unknown(raw) => raw,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::NegativeAcknowledge => "negative acknowledge",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetFailedToRespond => "gateway target device failed to respond",
            Self::Unknown(_) => "unrecognised exception code",
        }
    }
}

/// The two-byte PDU a slave sends instead of a normal response: the request
/// function code with bit 7 set, then the exception code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExceptionResponse {
    /// Function code with the exception bit already stripped.
    pub function_code: u8,
    pub exception_code: ExceptionCode,
}

impl ExceptionResponse {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(self.function_code | 0x80)?;
        w.write_u8(self.exception_code.as_u8())
    }

    /// Decode a whole exception PDU, function byte included. Fails when
    /// bit 7 of the function byte is clear.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let function_byte = r.read_u8()?;
        if !FunctionCode::is_exception(function_byte) {
            return Err(DecodeError::InvalidFunctionCode);
        }
        Ok(Self {
            function_code: function_byte & 0x7F,
            exception_code: ExceptionCode::from_u8(r.read_u8()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ExceptionCode, ExceptionResponse};
    use crate::encoding::{Reader, Writer};
    use crate::DecodeError;

    #[test]
    fn encode_sets_the_error_bit() {
        let mut buf = [0u8; 2];
        let mut w = Writer::new(&mut buf);
        ExceptionResponse {
            function_code: 0x03,
            exception_code: ExceptionCode::IllegalDataAddress,
        }
        .encode(&mut w)
        .unwrap();
        assert_eq!(w.as_written(), &[0x83, 0x02]);
    }

    #[test]
    fn decode_requires_the_error_bit() {
        let decoded = ExceptionResponse::decode(&mut Reader::new(&[0x85, 0x06])).unwrap();
        assert_eq!(decoded.function_code, 0x05);
        assert_eq!(decoded.exception_code, ExceptionCode::SlaveDeviceBusy);

        assert_eq!(
            ExceptionResponse::decode(&mut Reader::new(&[0x05, 0x06])).unwrap_err(),
            DecodeError::InvalidFunctionCode
        );
    }

    #[test]
    fn unknown_codes_survive_the_roundtrip() {
        let decoded = ExceptionResponse::decode(&mut Reader::new(&[0x83, 0x11])).unwrap();
        assert_eq!(decoded.exception_code, ExceptionCode::Unknown(0x11));
        assert_eq!(decoded.exception_code.as_u8(), 0x11);
    }

    #[test]
    fn every_named_code_roundtrips() {
        for raw in [1u8, 2, 3, 4, 5, 6, 7, 8, 10, 11] {
            assert_eq!(ExceptionCode::from_u8(raw).as_u8(), raw);
        }
    }
}
