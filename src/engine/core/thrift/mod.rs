pub mod compact;

pub use compact::{CompactReader, CompactType, MAX_NESTING, ThriftStruct};
