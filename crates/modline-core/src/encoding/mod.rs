//! PDU cursors: a slice-splitting reader and a front-filling writer, both
//! bounds-checked so frame assembly and parsing never index raw offsets.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;
