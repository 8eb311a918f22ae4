use bytes::Bytes;

use crate::engine::core::metadata::PhysicalType;

/// One decoded physical value. Byte arrays share the page buffer they were
/// decoded from.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Int96([u32; 3]),
    Float(f32),
    Double(f64),
    ByteArray(Bytes),
}

impl Value {
    pub fn physical_type(&self) -> PhysicalType {
        match self {
            Value::Boolean(_) => PhysicalType::Boolean,
            Value::Int32(_) => PhysicalType::Int32,
            Value::Int64(_) => PhysicalType::Int64,
            Value::Int96(_) => PhysicalType::Int96,
            Value::Float(_) => PhysicalType::Float,
            Value::Double(_) => PhysicalType::Double,
            Value::ByteArray(_) => PhysicalType::ByteArray,
        }
    }
}
