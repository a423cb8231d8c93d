//! Hand-written DNS wire codec: names, messages and rdata.

pub mod message;
pub mod name;
pub mod rdata;

pub use message::{
    append_edns, decode_message, encode_query, Flags, Message, MessageWriter, Question,
    ResourceRecord, CLASS_IN, HEADER_LEN,
};
pub use name::{decode_name, encode_name, write_name, CompressionTable};
pub use rdata::{parse_rdata, write_rdata};
