pub mod decompress;
pub mod levels;
pub mod page;
pub mod plain;
