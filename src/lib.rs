pub mod engine;
pub mod logging;
pub mod shared;

pub use engine::core::{
    Field, FileSource, FromField, MmapSource, ParquetReader, Projection, ReaderOptions, Record,
    Row, SeekableSource,
};
pub use engine::errors::{ReaderError, Result};

#[cfg(test)]
#[path = "../tests/helpers/mod.rs"]
pub mod test_helpers;
