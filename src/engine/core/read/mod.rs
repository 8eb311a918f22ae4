pub mod assembler;
pub mod materializer;
pub mod reader;
pub mod record;
pub mod row;
pub mod scheduler;

pub use reader::{ParquetReader, ReaderOptions};
pub use record::{FromField, Projection, Record, RecordBinding};
pub use row::{Field, Row};
pub use scheduler::TableMap;
