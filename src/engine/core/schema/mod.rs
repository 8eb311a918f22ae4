pub mod path_index;

pub use path_index::{PATH_DELIMITER, SchemaNode, SchemaPathIndex};
