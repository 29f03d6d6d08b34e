//! Register-level value codec.
//!
//! Single registers are 16 bits and always travel MSB first. Values spanning
//! several registers (32/64-bit integers, floats) are assembled according to
//! a [`WordOrder`]; scaled integers, text and bit vectors cover the rest of
//! the domain-level types instruments actually expose.

#[cfg(feature = "alloc")]
use alloc::string::String;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

use crate::{DecodeError, EncodeError};

/// Largest supported decimal scaling exponent. Some instruments store
/// 0.00000154 A as 154, hence the generous ceiling.
pub const MAX_DECIMALS: u8 = 10;

/// How a multi-register value is laid out across consecutive registers.
///
/// With the logical big-endian bytes `[A, B, C, D]`, the wire orders are
/// `Big` = ABCD, `BigSwap` = BADC, `LittleSwap` = CDAB, `Little` = DCBA
/// (and correspondingly for eight bytes). Each 16-bit register itself is
/// still transmitted MSB first; the order selects how the wide value is
/// spread over registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WordOrder {
    #[default]
    Big,
    Little,
    BigSwap,
    LittleSwap,
}

impl WordOrder {
    /// Reorder `bytes` in place between logical big-endian and the wire
    /// layout. All four orders are involutions, so the same call performs
    /// both directions.
    pub fn apply(self, bytes: &mut [u8]) {
        debug_assert!(bytes.len() % 2 == 0);
        match self {
            Self::Big => {}
            Self::Little => bytes.reverse(),
            Self::BigSwap => swap_register_bytes(bytes),
            Self::LittleSwap => {
                bytes.reverse();
                swap_register_bytes(bytes);
            }
        }
    }
}

fn swap_register_bytes(bytes: &mut [u8]) {
    for pair in bytes.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

pub const fn encode_u16(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

pub const fn decode_u16(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}

pub const fn encode_i16(value: i16) -> [u8; 2] {
    value.to_be_bytes()
}

pub const fn decode_i16(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

pub fn encode_u32(value: u32, order: WordOrder) -> [u8; 4] {
    let mut bytes = value.to_be_bytes();
    order.apply(&mut bytes);
    bytes
}

pub fn decode_u32(mut bytes: [u8; 4], order: WordOrder) -> u32 {
    order.apply(&mut bytes);
    u32::from_be_bytes(bytes)
}

pub fn encode_i32(value: i32, order: WordOrder) -> [u8; 4] {
    encode_u32(value as u32, order)
}

pub fn decode_i32(bytes: [u8; 4], order: WordOrder) -> i32 {
    decode_u32(bytes, order) as i32
}

pub fn encode_u64(value: u64, order: WordOrder) -> [u8; 8] {
    let mut bytes = value.to_be_bytes();
    order.apply(&mut bytes);
    bytes
}

pub fn decode_u64(mut bytes: [u8; 8], order: WordOrder) -> u64 {
    order.apply(&mut bytes);
    u64::from_be_bytes(bytes)
}

pub fn encode_i64(value: i64, order: WordOrder) -> [u8; 8] {
    encode_u64(value as u64, order)
}

pub fn decode_i64(bytes: [u8; 8], order: WordOrder) -> i64 {
    decode_u64(bytes, order) as i64
}

/// IEEE-754 binary32. Non-finite values are rejected; no instrument register
/// map defines NaN or infinity semantics.
pub fn encode_f32(value: f32, order: WordOrder) -> Result<[u8; 4], EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::ValueOutOfRange);
    }
    let mut bytes = value.to_be_bytes();
    order.apply(&mut bytes);
    Ok(bytes)
}

pub fn decode_f32(mut bytes: [u8; 4], order: WordOrder) -> f32 {
    order.apply(&mut bytes);
    f32::from_be_bytes(bytes)
}

/// IEEE-754 binary64.
pub fn encode_f64(value: f64, order: WordOrder) -> Result<[u8; 8], EncodeError> {
    if !value.is_finite() {
        return Err(EncodeError::ValueOutOfRange);
    }
    let mut bytes = value.to_be_bytes();
    order.apply(&mut bytes);
    Ok(bytes)
}

pub fn decode_f64(mut bytes: [u8; 8], order: WordOrder) -> f64 {
    order.apply(&mut bytes);
    f64::from_be_bytes(bytes)
}

/// Wire form of a single coil value for function code 5.
pub const fn coil_value(on: bool) -> u16 {
    if on {
        0xFF00
    } else {
        0x0000
    }
}

/// Pack bits LSB first within each octet, zero-padded toward the MSB of the
/// final octet. `out` must hold `ceil(values.len() / 8)` bytes.
pub fn pack_bits(values: &[bool], out: &mut [u8]) {
    out.fill(0);
    for (i, value) in values.iter().enumerate() {
        if *value {
            out[i / 8] |= 1u8 << (i % 8);
        }
    }
}

/// Unpack `count` bits from a packed octet buffer. The buffer length must be
/// exactly `ceil(count / 8)`; surplus bits in the final octet are masked off.
#[cfg(feature = "alloc")]
pub fn unpack_bits(data: &[u8], count: usize) -> Result<Vec<bool>, DecodeError> {
    if data.len() != count.div_ceil(8) {
        return Err(DecodeError::InvalidLength);
    }
    Ok((0..count)
        .map(|i| (data[i / 8] & (1u8 << (i % 8))) != 0)
        .collect())
}

/// Encode ASCII text into `2 * register_count` bytes, right-padded with
/// spaces.
#[cfg(feature = "alloc")]
pub fn encode_text(text: &str, register_count: u16) -> Result<Vec<u8>, EncodeError> {
    let capacity = usize::from(register_count) * 2;
    if register_count == 0 || text.is_empty() {
        return Err(EncodeError::InvalidLength);
    }
    if text.len() > capacity {
        return Err(EncodeError::ValueOutOfRange);
    }
    if !text.is_ascii() {
        return Err(EncodeError::Message("text must be ASCII"));
    }
    let mut out = Vec::with_capacity(capacity);
    out.extend_from_slice(text.as_bytes());
    out.resize(capacity, b' ');
    Ok(out)
}

/// Decode register bytes as text, one character per byte, no trimming.
/// The bytes must all be ASCII; instruments that store anything else in
/// their text registers need the raw register interface.
#[cfg(feature = "alloc")]
pub fn decode_text(data: &[u8]) -> Result<String, DecodeError> {
    if data.is_empty() || data.len() % 2 != 0 {
        return Err(DecodeError::InvalidLength);
    }
    if !data.is_ascii() {
        return Err(DecodeError::InvalidValue);
    }
    Ok(data.iter().map(|&byte| char::from(byte)).collect())
}

fn pow10(decimals: u8) -> f64 {
    10u64.pow(u32::from(decimals)) as f64
}

fn round_half_away(value: f64) -> i64 {
    if value >= 0.0 {
        (value + 0.5) as i64
    } else {
        (value - 0.5) as i64
    }
}

/// Scale a numerical value into a raw 16-bit register:
/// `round(value * 10^decimals)`, then range-checked against the signed or
/// unsigned 16-bit domain.
pub fn scale_to_register(value: f64, decimals: u8, signed: bool) -> Result<u16, EncodeError> {
    if decimals > MAX_DECIMALS {
        return Err(EncodeError::ValueOutOfRange);
    }
    if !value.is_finite() {
        return Err(EncodeError::ValueOutOfRange);
    }

    let scaled = round_half_away(value * pow10(decimals));
    if signed {
        if scaled < i64::from(i16::MIN) || scaled > i64::from(i16::MAX) {
            return Err(EncodeError::ValueOutOfRange);
        }
        Ok(scaled as i16 as u16)
    } else {
        if scaled < 0 || scaled > i64::from(u16::MAX) {
            return Err(EncodeError::ValueOutOfRange);
        }
        Ok(scaled as u16)
    }
}

/// Inverse of [`scale_to_register`]: divide the raw register content by
/// `10^decimals`, interpreting it as two's complement first when `signed`.
pub fn scale_from_register(raw: u16, decimals: u8, signed: bool) -> Result<f64, DecodeError> {
    if decimals > MAX_DECIMALS {
        return Err(DecodeError::InvalidValue);
    }
    let base = if signed {
        f64::from(raw as i16)
    } else {
        f64::from(raw)
    };
    Ok(base / pow10(decimals))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_orders_match_wire_layout() {
        let value = 0xAABBCCDDu32;
        assert_eq!(encode_u32(value, WordOrder::Big), [0xAA, 0xBB, 0xCC, 0xDD]);
        assert_eq!(
            encode_u32(value, WordOrder::BigSwap),
            [0xBB, 0xAA, 0xDD, 0xCC]
        );
        assert_eq!(
            encode_u32(value, WordOrder::LittleSwap),
            [0xCC, 0xDD, 0xAA, 0xBB]
        );
        assert_eq!(
            encode_u32(value, WordOrder::Little),
            [0xDD, 0xCC, 0xBB, 0xAA]
        );
    }

    #[test]
    fn word_orders_match_wire_layout_64() {
        let bytes = encode_u64(0x0102030405060708, WordOrder::LittleSwap);
        assert_eq!(bytes, [0x07, 0x08, 0x05, 0x06, 0x03, 0x04, 0x01, 0x02]);
        let bytes = encode_u64(0x0102030405060708, WordOrder::BigSwap);
        assert_eq!(bytes, [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07]);
    }

    #[test]
    fn word_order_apply_is_involution() {
        for order in [
            WordOrder::Big,
            WordOrder::Little,
            WordOrder::BigSwap,
            WordOrder::LittleSwap,
        ] {
            let mut bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
            order.apply(&mut bytes);
            order.apply(&mut bytes);
            assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8]);
        }
    }

    #[test]
    fn signed_registers_use_twos_complement() {
        assert_eq!(encode_i16(-1), [0xFF, 0xFF]);
        assert_eq!(decode_i16([0x80, 0x00]), -32768);
        assert_eq!(decode_i32([0xFF, 0xFF, 0xFF, 0xFE], WordOrder::Big), -2);
    }

    #[test]
    fn float_encoding_is_ieee754() {
        assert_eq!(
            encode_f32(1.0, WordOrder::Big).unwrap(),
            [0x3F, 0x80, 0x00, 0x00]
        );
        assert_eq!(decode_f32([0x3F, 0x80, 0x00, 0x00], WordOrder::Big), 1.0);
        assert!(encode_f32(f32::NAN, WordOrder::Big).is_err());
        assert!(encode_f64(f64::INFINITY, WordOrder::Big).is_err());
    }

    #[test]
    fn coil_values() {
        assert_eq!(coil_value(true), 0xFF00);
        assert_eq!(coil_value(false), 0x0000);
    }

    #[test]
    fn bits_pack_lsb_first() {
        let mut out = [0u8; 2];
        pack_bits(
            &[true, false, true, true, false, false, true, false, true],
            &mut out,
        );
        assert_eq!(out, [0b0100_1101, 0b0000_0001]);
    }

    #[test]
    fn unpack_masks_surplus_bits() {
        let bits = unpack_bits(&[0xFF], 3).unwrap();
        assert_eq!(bits, [true, true, true]);
        assert_eq!(unpack_bits(&[0xFF, 0x01], 3).unwrap_err(), DecodeError::InvalidLength);
    }

    #[test]
    fn text_is_space_padded() {
        assert_eq!(encode_text("AB", 2).unwrap(), b"AB  ");
        assert_eq!(decode_text(b"AB  ").unwrap(), "AB  ");
        assert!(encode_text("ABCDE", 2).is_err());
        assert!(encode_text("\u{e9}", 2).is_err());
    }

    #[test]
    fn text_decoding_requires_ascii() {
        assert_eq!(
            decode_text(&[0x41, 0xE9]).unwrap_err(),
            DecodeError::InvalidValue
        );
        assert_eq!(decode_text(b"ABC").unwrap_err(), DecodeError::InvalidLength);
    }

    #[test]
    fn scaling_rounds_half_away_from_zero() {
        assert_eq!(scale_to_register(325.8, 1, false).unwrap(), 3258);
        assert_eq!(scale_to_register(0.15, 1, false).unwrap(), 2);
        assert_eq!(scale_to_register(-0.15, 1, true).unwrap(), (-2i16) as u16);
        assert_eq!(scale_to_register(-77.0, 0, true).unwrap(), 0xFFB3);
    }

    #[test]
    fn scaling_range_checks() {
        assert!(scale_to_register(65536.0, 0, false).is_err());
        assert!(scale_to_register(-1.0, 0, false).is_err());
        assert!(scale_to_register(32768.0, 0, true).is_err());
        assert!(scale_to_register(1.0, 11, false).is_err());
        assert!(scale_to_register(f64::NAN, 0, false).is_err());
    }

    #[test]
    fn scaling_divides_on_read() {
        assert_eq!(scale_from_register(0x00BA, 1, false).unwrap(), 18.6);
        assert_eq!(scale_from_register(0x07D0, 1, false).unwrap(), 200.0);
        assert_eq!(scale_from_register(0xFFB3, 0, true).unwrap(), -77.0);
    }
}
