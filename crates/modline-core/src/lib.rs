//! Modbus serial-line protocol encoding in pure Rust.
//!
//! `modline-core` provides `no_std`-compatible encoding and decoding of
//! Modbus PDUs, RTU and ASCII frames, and the register-level value codec
//! (scaled integers, multi-register integers and floats, text, bit vectors).

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod encoding;
pub mod error;
pub mod frame;
pub mod pdu;
pub mod value;

pub use error::{DecodeError, EncodeError};
pub use frame::Mode;
pub use value::WordOrder;

/// Largest PDU (function code + payload) that fits a serial frame.
pub const MAX_PDU_LEN: usize = 253;
