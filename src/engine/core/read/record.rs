use bytes::Bytes;

use crate::engine::core::read::row::{Field, Row};
use crate::engine::core::schema::SchemaPathIndex;
use crate::engine::errors::{ReaderError, Result};

/// Which top-level columns a record type reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    All,
    Columns(&'static [&'static str]),
}

/// A destination row type.
///
/// The projection is resolved against the file schema once per read; each
/// assembled row then arrives in `from_row` with its fields in projection
/// order.
pub trait Record: Sized + Send {
    fn projection() -> Projection {
        Projection::All
    }

    fn from_row(row: Row) -> Result<Self>;
}

impl Record for Row {
    fn from_row(row: Row) -> Result<Self> {
        Ok(row)
    }
}

/// Schema positions of the top-level fields a record reads, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordBinding {
    pub columns: Vec<usize>,
}

impl RecordBinding {
    pub fn resolve<T: Record>(schema: &SchemaPathIndex) -> Result<Self> {
        let top_level = schema.children(0);
        let columns = match T::projection() {
            Projection::All => top_level.to_vec(),
            Projection::Columns(names) => names
                .iter()
                .map(|name| {
                    top_level
                        .iter()
                        .copied()
                        .find(|&p| schema.element(p).name == *name)
                        .ok_or_else(|| {
                            ReaderError::Materialize(format!(
                                "column '{name}' is not a top-level field of '{}'",
                                schema.root_name()
                            ))
                        })
                })
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self { columns })
    }
}

/// Conversion from an assembled field into a Rust value.
pub trait FromField: Sized {
    fn from_field(field: Field) -> Result<Self>;
}

fn mismatch<T>(expected: &str, field: &Field) -> Result<T> {
    Err(ReaderError::Materialize(format!(
        "expected {expected}, found {}",
        field.kind()
    )))
}

impl FromField for Field {
    fn from_field(field: Field) -> Result<Self> {
        Ok(field)
    }
}

impl FromField for bool {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Bool(v) => Ok(v),
            other => mismatch("bool", &other),
        }
    }
}

impl FromField for i32 {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Int(v) => Ok(v),
            other => mismatch("int", &other),
        }
    }
}

impl FromField for i64 {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Long(v) => Ok(v),
            Field::Int(v) => Ok(i64::from(v)),
            other => mismatch("long", &other),
        }
    }
}

impl FromField for f32 {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Float(v) => Ok(v),
            other => mismatch("float", &other),
        }
    }
}

impl FromField for f64 {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Double(v) => Ok(v),
            Field::Float(v) => Ok(f64::from(v)),
            other => mismatch("double", &other),
        }
    }
}

impl FromField for String {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Str(v) => Ok(v),
            other => mismatch("string", &other),
        }
    }
}

impl FromField for Bytes {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Bytes(v) => Ok(v),
            Field::Str(v) => Ok(Bytes::from(v)),
            other => mismatch("bytes", &other),
        }
    }
}

impl FromField for Row {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Group(v) => Ok(v),
            other => mismatch("group", &other),
        }
    }
}

impl<T: FromField> FromField for Option<T> {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::Null => Ok(None),
            other => T::from_field(other).map(Some),
        }
    }
}

impl<T: FromField> FromField for Vec<T> {
    fn from_field(field: Field) -> Result<Self> {
        match field {
            Field::List(items) => items.into_iter().map(T::from_field).collect(),
            other => mismatch("list", &other),
        }
    }
}

impl Row {
    /// Moves the named field out and converts it.
    pub fn take<T: FromField>(&mut self, name: &str) -> Result<T> {
        let field = self
            .take_field(name)
            .ok_or_else(|| ReaderError::Materialize(format!("row has no field '{name}'")))?;
        T::from_field(field).map_err(|e| match e {
            ReaderError::Materialize(msg) => ReaderError::Materialize(format!("field '{name}': {msg}")),
            other => other,
        })
    }
}
