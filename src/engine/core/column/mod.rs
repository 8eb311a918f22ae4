pub mod column_buffer;
pub mod reader;
pub mod table;
pub mod value;

pub use column_buffer::{ChunkLocation, ColumnBuffer};
pub use table::ColumnTable;
pub use value::Value;
