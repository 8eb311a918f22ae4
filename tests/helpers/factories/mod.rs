pub mod compact_writer;
pub mod parquet_file_factory;
pub mod schema_element_factory;

pub use compact_writer::CompactWriter;
pub use parquet_file_factory::{ColumnData, PageVersion, ParquetFileFactory, Slot, text};
pub use schema_element_factory::SchemaElementFactory;

#[cfg(test)]
mod compact_writer_test;
