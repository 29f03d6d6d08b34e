//! Serial-line framing: RTU (binary, CRC-16) and ASCII (`:` to CR LF, LRC).

pub mod ascii;
pub mod check;
pub mod rtu;

use crate::encoding::Writer;
use crate::{DecodeError, EncodeError};

/// Framing variant of the serial line. Fixed for the lifetime of an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    #[default]
    Rtu,
    Ascii,
}

impl Mode {
    /// Exact on-wire frame size for a PDU of `pdu_len` bytes.
    ///
    /// RTU: `addr + pdu + crc`. ASCII: `':' + hex(addr + pdu) + hex(lrc)
    /// + CR LF`, two characters per binary byte. Together with the
    /// response-size prediction on the request types this fully determines
    /// how many bytes to read back.
    pub const fn frame_len(self, pdu_len: usize) -> usize {
        match self {
            Self::Rtu => pdu_len + 3,
            Self::Ascii => 2 * (pdu_len + 1) + 5,
        }
    }

    /// Frame size of an exception response (function code + exception code).
    pub const fn exception_frame_len(self) -> usize {
        self.frame_len(2)
    }

    pub fn encode_frame(
        self,
        w: &mut Writer<'_>,
        address: u8,
        pdu: &[u8],
    ) -> Result<(), EncodeError> {
        match self {
            Self::Rtu => rtu::encode_frame(w, address, pdu),
            Self::Ascii => ascii::encode_frame(w, address, pdu),
        }
    }

    /// Split a received frame into slave address and PDU, validating the
    /// frame check. ASCII frames are hex-decoded into `scratch`; RTU frames
    /// borrow from `data` directly.
    pub fn decode_frame<'a>(
        self,
        data: &'a [u8],
        scratch: &'a mut [u8],
    ) -> Result<(u8, &'a [u8]), DecodeError> {
        match self {
            Self::Rtu => rtu::decode_frame(data),
            Self::Ascii => ascii::decode_frame(data, scratch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Mode;

    #[test]
    fn frame_len_rtu() {
        // fc3 response for one register: fc + byte count + 2 data bytes.
        assert_eq!(Mode::Rtu.frame_len(4), 7);
        assert_eq!(Mode::Rtu.exception_frame_len(), 5);
    }

    #[test]
    fn frame_len_ascii() {
        assert_eq!(Mode::Ascii.frame_len(4), 15);
        assert_eq!(Mode::Ascii.frame_len(5), 17);
        assert_eq!(Mode::Ascii.exception_frame_len(), 11);
    }
}
