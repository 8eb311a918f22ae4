use bytes::Bytes;
use serde_json::{Map, Number, Value as JsonValue};

/// A reassembled value in row-major form.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Int96([u32; 3]),
    Float(f32),
    Double(f64),
    Str(String),
    Bytes(Bytes),
    Group(Row),
    List(Vec<Field>),
}

impl Field {
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Field::Null => "null",
            Field::Bool(_) => "bool",
            Field::Int(_) => "int",
            Field::Long(_) => "long",
            Field::Int96(_) => "int96",
            Field::Float(_) => "float",
            Field::Double(_) => "double",
            Field::Str(_) => "string",
            Field::Bytes(_) => "bytes",
            Field::Group(_) => "group",
            Field::List(_) => "list",
        }
    }
}

/// Ordered named fields of one record or group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Field)>,
}

impl Row {
    pub fn new(fields: Vec<(String, Field)>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn get_index(&self, index: usize) -> Option<&Field> {
        self.fields.get(index).map(|(_, f)| f)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Moves the named field out, leaving `Null` behind.
    pub fn take_field(&mut self, name: &str) -> Option<Field> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, f)| std::mem::replace(f, Field::Null))
    }

    pub fn into_fields(self) -> Vec<(String, Field)> {
        self.fields
    }
}

impl From<&Field> for JsonValue {
    fn from(field: &Field) -> Self {
        match field {
            Field::Null => JsonValue::Null,
            Field::Bool(b) => JsonValue::Bool(*b),
            Field::Int(v) => JsonValue::from(*v),
            Field::Long(v) => JsonValue::from(*v),
            Field::Int96(words) => JsonValue::from(words.to_vec()),
            Field::Float(v) => Number::from_f64(f64::from(*v))
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Field::Double(v) => Number::from_f64(*v)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Field::Str(s) => JsonValue::String(s.clone()),
            Field::Bytes(b) => JsonValue::from(b.to_vec()),
            Field::Group(row) => JsonValue::from(row),
            Field::List(items) => JsonValue::Array(items.iter().map(JsonValue::from).collect()),
        }
    }
}

impl From<&Row> for JsonValue {
    fn from(row: &Row) -> Self {
        let mut map = Map::with_capacity(row.len());
        for (name, field) in row.iter() {
            map.insert(name.to_string(), JsonValue::from(field));
        }
        JsonValue::Object(map)
    }
}
