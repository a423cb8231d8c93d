pub mod rcode;
pub mod record;
pub mod record_type;

pub use rcode::Rcode;
pub use record::{CaaRecord, MxRecord, RecordData, SoaRecord, SrvRecord};
pub use record_type::RecordType;
