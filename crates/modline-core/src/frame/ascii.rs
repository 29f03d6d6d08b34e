//! ASCII framing: `':' + hex(addr + pdu) + hex(lrc) + CR LF` with
//! uppercase hex digits on the wire.

use crate::encoding::Writer;
use crate::frame::check::lrc;
use crate::{DecodeError, EncodeError, MAX_PDU_LEN};

const START: u8 = b':';
const END: &[u8] = b"\r\n";

/// Shortest well-formed frame: start, address, function code, LRC, CR LF.
const MIN_FRAME_LEN: usize = 9;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

fn write_hex_byte(w: &mut Writer<'_>, value: u8) -> Result<(), EncodeError> {
    w.write_u8(HEX_DIGITS[usize::from(value >> 4)])?;
    w.write_u8(HEX_DIGITS[usize::from(value & 0x0F)])
}

fn hex_value(digit: u8) -> Result<u8, DecodeError> {
    match digit {
        b'0'..=b'9' => Ok(digit - b'0'),
        b'A'..=b'F' => Ok(digit - b'A' + 10),
        b'a'..=b'f' => Ok(digit - b'a' + 10),
        _ => Err(DecodeError::InvalidFrame("invalid hex digit")),
    }
}

pub fn encode_frame(w: &mut Writer<'_>, address: u8, pdu: &[u8]) -> Result<(), EncodeError> {
    if pdu.is_empty() {
        return Err(EncodeError::InvalidLength);
    }
    if pdu.len() > MAX_PDU_LEN {
        return Err(EncodeError::ValueOutOfRange);
    }

    w.write_u8(START)?;
    write_hex_byte(w, address)?;
    let mut sum = address;
    for byte in pdu {
        write_hex_byte(w, *byte)?;
        sum = sum.wrapping_add(*byte);
    }
    write_hex_byte(w, sum.wrapping_neg())?;
    w.write_all(END)
}

/// Hex-decode and validate a received frame. The binary form is written into
/// `scratch`; the returned PDU borrows from it.
pub fn decode_frame<'a>(
    data: &[u8],
    scratch: &'a mut [u8],
) -> Result<(u8, &'a [u8]), DecodeError> {
    if data.len() < MIN_FRAME_LEN {
        return Err(DecodeError::InvalidLength);
    }
    if data[0] != START {
        return Err(DecodeError::InvalidFrame("missing start delimiter"));
    }
    if &data[data.len() - 2..] != END {
        return Err(DecodeError::InvalidFrame("missing end delimiter"));
    }

    let body = &data[1..data.len() - 2];
    if body.len() % 2 != 0 {
        return Err(DecodeError::InvalidFrame("odd-length hex body"));
    }

    let raw_len = body.len() / 2;
    if scratch.len() < raw_len {
        return Err(DecodeError::InvalidLength);
    }
    for (i, pair) in body.chunks_exact(2).enumerate() {
        scratch[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
    }

    let raw = &scratch[..raw_len];
    let received = raw[raw_len - 1];
    let expected = lrc(&raw[..raw_len - 1]);
    if received != expected {
        return Err(DecodeError::ChecksumMismatch {
            expected: u16::from(expected),
            received: u16::from(received),
        });
    }

    Ok((raw[0], &raw[1..raw_len - 1]))
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, encode_frame};
    use crate::encoding::Writer;
    use crate::DecodeError;

    #[test]
    fn ascii_golden_frame() {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        encode_frame(&mut w, 0x01, &[0x03, 0x10, 0x01, 0x00, 0x01]).unwrap();
        assert_eq!(w.as_written(), b":010310010001EA\r\n");
    }

    #[test]
    fn ascii_roundtrip() {
        let mut buf = [0u8; 64];
        let mut w = Writer::new(&mut buf);
        encode_frame(&mut w, 0x0A, &[0x10, 0x10, 0x01, 0x00, 0x01]).unwrap();

        let mut scratch = [0u8; 32];
        let (address, pdu) = decode_frame(w.as_written(), &mut scratch).unwrap();
        assert_eq!(address, 0x0A);
        assert_eq!(pdu, &[0x10, 0x10, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn accepts_lowercase_hex() {
        let mut scratch = [0u8; 16];
        let (address, pdu) = decode_frame(b":01030200ba40\r\n", &mut scratch).unwrap();
        assert_eq!(address, 0x01);
        assert_eq!(pdu, &[0x03, 0x02, 0x00, 0xBA]);
    }

    #[test]
    fn rejects_missing_start() {
        let mut scratch = [0u8; 16];
        assert_eq!(
            decode_frame(b"010310010001EA\r\n\r", &mut scratch).unwrap_err(),
            DecodeError::InvalidFrame("missing start delimiter")
        );
    }

    #[test]
    fn rejects_missing_footer() {
        let mut scratch = [0u8; 16];
        assert_eq!(
            decode_frame(b":010310010001EA\r;", &mut scratch).unwrap_err(),
            DecodeError::InvalidFrame("missing end delimiter")
        );
    }

    #[test]
    fn rejects_odd_hex_body() {
        let mut scratch = [0u8; 16];
        assert_eq!(
            decode_frame(b":010310010001E\r\n", &mut scratch).unwrap_err(),
            DecodeError::InvalidFrame("odd-length hex body")
        );
    }

    #[test]
    fn rejects_bad_lrc() {
        let mut scratch = [0u8; 16];
        assert!(matches!(
            decode_frame(b":010310010001EB\r\n", &mut scratch).unwrap_err(),
            DecodeError::ChecksumMismatch {
                expected: 0xEA,
                received: 0xEB
            }
        ));
    }

    #[test]
    fn rejects_non_hex_digit() {
        let mut scratch = [0u8; 16];
        assert_eq!(
            decode_frame(b":01031001000GEA\r\n", &mut scratch).unwrap_err(),
            DecodeError::InvalidFrame("invalid hex digit")
        );
    }
}
