pub mod column;
pub mod io;
pub mod metadata;
pub mod read;
pub mod schema;
pub mod thrift;

pub use column::{ColumnBuffer, ColumnTable, Value};
pub use io::{FileSource, MmapSource, SeekableSource};
pub use metadata::{FileMetaData, PhysicalType, Repetition, SchemaElement, read_trailer};
pub use read::{
    Field, FromField, ParquetReader, Projection, ReaderOptions, Record, RecordBinding, Row,
};
pub use schema::{SchemaNode, SchemaPathIndex};
