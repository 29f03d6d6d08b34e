//! Typed request and response PDUs for the implemented function codes.
//!
//! Requests and responses are modelled per response shape rather than per
//! function code: the four read codes share one request and two response
//! types, and the write codes share a single-point form and a block form.

mod exception;
mod function_code;
mod request;
mod response;

pub use exception::{ExceptionCode, ExceptionResponse};
pub use function_code::FunctionCode;
pub use request::{
    DecodedRequest, ReadRequest, Request, WriteBitsRequest, WriteRegistersRequest,
    WriteSingleRequest, MAX_READ_BITS, MAX_READ_REGISTERS, MAX_WRITE_BITS, MAX_WRITE_REGISTERS,
};
pub use response::{
    ReadBitsResponse, ReadRegistersResponse, Response, WriteMultipleResponse, WriteSingleResponse,
};
