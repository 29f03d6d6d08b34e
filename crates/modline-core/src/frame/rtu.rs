//! RTU framing: `addr + pdu + crc` with the CRC transmitted low byte first.

use crate::encoding::Writer;
use crate::frame::check::{crc16, crc16_update};
use crate::{DecodeError, EncodeError, MAX_PDU_LEN};

pub fn encode_frame(w: &mut Writer<'_>, address: u8, pdu: &[u8]) -> Result<(), EncodeError> {
    if pdu.is_empty() {
        return Err(EncodeError::InvalidLength);
    }
    if pdu.len() > MAX_PDU_LEN {
        return Err(EncodeError::ValueOutOfRange);
    }

    w.write_u8(address)?;
    w.write_all(pdu)?;

    let crc = crc16_over(address, pdu);
    w.write_all(&crc.to_le_bytes())?;
    Ok(())
}

fn crc16_over(address: u8, pdu: &[u8]) -> u16 {
    crc16_update(crc16(&[address]), pdu)
}

pub fn decode_frame(data: &[u8]) -> Result<(u8, &[u8]), DecodeError> {
    if data.len() < 4 {
        return Err(DecodeError::InvalidLength);
    }

    let body = &data[..data.len() - 2];
    let expected = crc16(body);
    let received = u16::from_le_bytes([data[data.len() - 2], data[data.len() - 1]]);
    if expected != received {
        return Err(DecodeError::ChecksumMismatch { expected, received });
    }

    Ok((body[0], &body[1..]))
}

#[cfg(test)]
mod tests {
    use super::{decode_frame, encode_frame};
    use crate::encoding::Writer;
    use crate::DecodeError;

    #[test]
    fn rtu_roundtrip() {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        encode_frame(&mut w, 0x0A, &[0x03, 0x10, 0x01, 0x00, 0x01]).unwrap();

        let (address, pdu) = decode_frame(w.as_written()).unwrap();
        assert_eq!(address, 0x0A);
        assert_eq!(pdu, &[0x03, 0x10, 0x01, 0x00, 0x01]);
    }

    #[test]
    fn rtu_golden_frame() {
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        encode_frame(&mut w, 0x01, &[0x03, 0x00, 0x05, 0x00, 0x01]).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x01, 0x03, 0x00, 0x05, 0x00, 0x01, 0x94, 0x0B]
        );
    }

    #[test]
    fn detects_bad_crc() {
        // The golden frame above with one payload byte flipped.
        let tampered = [0x01u8, 0x03, 0x00, 0x04, 0x00, 0x01, 0x94, 0x0B];
        assert!(matches!(
            decode_frame(&tampered).unwrap_err(),
            DecodeError::ChecksumMismatch {
                received: 0x0B94,
                ..
            }
        ));
    }

    #[test]
    fn rejects_runt_frame() {
        assert_eq!(
            decode_frame(&[0x01, 0x03, 0x94]).unwrap_err(),
            DecodeError::InvalidLength
        );
    }
}
