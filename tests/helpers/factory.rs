pub use super::factories::{ColumnData, CompactWriter, ParquetFileFactory, SchemaElementFactory};

use crate::engine::core::metadata::PhysicalType;

pub struct Factory;

impl Factory {
    pub fn parquet_file() -> ParquetFileFactory {
        ParquetFileFactory::new()
    }

    pub fn compact_writer() -> CompactWriter {
        CompactWriter::new()
    }

    pub fn leaf(name: &str, physical_type: PhysicalType) -> SchemaElementFactory {
        SchemaElementFactory::leaf(name, physical_type)
    }

    pub fn group(name: &str, num_children: i32) -> SchemaElementFactory {
        SchemaElementFactory::group(name, num_children)
    }

    pub fn string(name: &str) -> SchemaElementFactory {
        SchemaElementFactory::string(name)
    }
}
