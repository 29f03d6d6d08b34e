use crate::DecodeError;

/// The function codes this master implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FunctionCode {
    ReadCoils,
    ReadDiscreteInputs,
    ReadHoldingRegisters,
    ReadInputRegisters,
    WriteSingleCoil,
    WriteSingleRegister,
    WriteMultipleCoils,
    WriteMultipleRegisters,
}

impl FunctionCode {
    /// The implemented set, in wire-code order.
    pub const IMPLEMENTED: [Self; 8] = [
        Self::ReadCoils,
        Self::ReadDiscreteInputs,
        Self::ReadHoldingRegisters,
        Self::ReadInputRegisters,
        Self::WriteSingleCoil,
        Self::WriteSingleRegister,
        Self::WriteMultipleCoils,
        Self::WriteMultipleRegisters,
    ];

    pub const fn as_u8(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
        }
    }

    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Self::IMPLEMENTED
            .into_iter()
            .find(|function| function.as_u8() == value)
            .ok_or(DecodeError::InvalidFunctionCode)
    }

    /// Whether a received function byte carries the exception indication
    /// (bit 7).
    pub const fn is_exception(value: u8) -> bool {
        value & 0x80 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::FunctionCode;
    use crate::DecodeError;

    #[test]
    fn wire_codes_roundtrip() {
        for function in FunctionCode::IMPLEMENTED {
            assert_eq!(FunctionCode::from_u8(function.as_u8()).unwrap(), function);
        }
    }

    #[test]
    fn codes_outside_the_implemented_set_are_rejected() {
        for value in [0x00, 0x07, 0x16, 0x17, 0x7F, 0x83] {
            assert_eq!(
                FunctionCode::from_u8(value).unwrap_err(),
                DecodeError::InvalidFunctionCode
            );
        }
    }

    #[test]
    fn bit_seven_marks_exceptions() {
        assert!(FunctionCode::is_exception(0x83));
        assert!(FunctionCode::is_exception(0x90));
        assert!(!FunctionCode::is_exception(0x10));
    }
}
