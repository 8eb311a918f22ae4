pub mod file_metadata;
pub mod page_header;
pub mod trailer;

pub use file_metadata::{
    ColumnChunk, ColumnMetaData, Codec, Encoding, FileMetaData, KeyValue, PhysicalType,
    Repetition, RowGroup, SchemaElement,
};
pub use page_header::{
    DataPageHeader, DataPageHeaderV2, DictionaryPageHeader, PageHeader, PageType,
};
pub use trailer::{MAGIC, TRAILER_LEN, Trailer, read_trailer};
