use crate::engine::core::metadata::{PhysicalType, Repetition, SchemaElement};

const CONVERTED_UTF8: i32 = 0;
const CONVERTED_LIST: i32 = 3;
const LOGICAL_STRING: i16 = 1;

pub struct SchemaElementFactory {
    element: SchemaElement,
}

impl SchemaElementFactory {
    pub fn leaf(name: &str, physical_type: PhysicalType) -> Self {
        Self {
            element: SchemaElement {
                name: name.to_string(),
                physical_type: Some(physical_type),
                type_length: None,
                repetition: Some(Repetition::Required),
                num_children: None,
                converted_type: None,
                scale: None,
                precision: None,
                field_id: None,
                logical_type: None,
            },
        }
    }

    pub fn group(name: &str, num_children: i32) -> Self {
        Self {
            element: SchemaElement {
                name: name.to_string(),
                physical_type: None,
                type_length: None,
                repetition: Some(Repetition::Required),
                num_children: Some(num_children),
                converted_type: None,
                scale: None,
                precision: None,
                field_id: None,
                logical_type: None,
            },
        }
    }

    /// A UTF8-annotated byte array leaf.
    pub fn string(name: &str) -> Self {
        Self::leaf(name, PhysicalType::ByteArray).with_converted_type(CONVERTED_UTF8)
    }

    pub fn optional(mut self) -> Self {
        self.element.repetition = Some(Repetition::Optional);
        self
    }

    pub fn repeated(mut self) -> Self {
        self.element.repetition = Some(Repetition::Repeated);
        self
    }

    pub fn list(self) -> Self {
        self.with_converted_type(CONVERTED_LIST)
    }

    pub fn with_converted_type(mut self, converted_type: i32) -> Self {
        self.element.converted_type = Some(converted_type);
        self
    }

    pub fn with_string_logical_type(mut self) -> Self {
        self.element.logical_type = Some(LOGICAL_STRING);
        self
    }

    pub fn with_type_length(mut self, len: i32) -> Self {
        self.element.type_length = Some(len);
        self
    }

    pub fn with_field_id(mut self, id: i32) -> Self {
        self.element.field_id = Some(id);
        self
    }

    pub fn create(self) -> SchemaElement {
        self.element
    }
}
