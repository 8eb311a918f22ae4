pub mod source;

pub use source::{FileSource, MmapSource, SeekableSource};
