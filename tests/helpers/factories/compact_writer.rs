use crate::engine::core::thrift::CompactType;

/// Test-side encoder for the Thrift compact protocol, the mirror image of
/// `CompactReader`.
#[derive(Debug, Default)]
pub struct CompactWriter {
    buf: Vec<u8>,
    last_field_id: i16,
    stack: Vec<i16>,
}

impl CompactWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn write_byte(&mut self, b: u8) -> &mut Self {
        self.buf.push(b);
        self
    }

    pub fn write_varint(&mut self, mut v: u64) -> &mut Self {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return self;
            }
            self.buf.push(byte | 0x80);
        }
    }

    pub fn write_zigzag(&mut self, v: i64) -> &mut Self {
        self.write_varint(((v << 1) ^ (v >> 63)) as u64)
    }

    pub fn struct_begin(&mut self) -> &mut Self {
        self.stack.push(self.last_field_id);
        self.last_field_id = 0;
        self
    }

    pub fn struct_end(&mut self) -> &mut Self {
        self.buf.push(CompactType::Stop as u8);
        self.last_field_id = self.stack.pop().unwrap_or(0);
        self
    }

    pub fn field_header(&mut self, ty: CompactType, id: i16) -> &mut Self {
        let delta = id - self.last_field_id;
        if (1..=15).contains(&delta) {
            self.buf.push(((delta as u8) << 4) | ty as u8);
        } else {
            self.buf.push(ty as u8);
            self.write_zigzag(i64::from(id));
        }
        self.last_field_id = id;
        self
    }

    pub fn field_bool(&mut self, id: i16, v: bool) -> &mut Self {
        let ty = if v {
            CompactType::BoolTrue
        } else {
            CompactType::BoolFalse
        };
        self.field_header(ty, id)
    }

    pub fn field_i32(&mut self, id: i16, v: i32) -> &mut Self {
        self.field_header(CompactType::I32, id);
        self.write_zigzag(i64::from(v))
    }

    pub fn field_i64(&mut self, id: i16, v: i64) -> &mut Self {
        self.field_header(CompactType::I64, id);
        self.write_zigzag(v)
    }

    pub fn field_double(&mut self, id: i16, v: f64) -> &mut Self {
        self.field_header(CompactType::Double, id);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn write_binary(&mut self, v: &[u8]) -> &mut Self {
        self.write_varint(v.len() as u64);
        self.buf.extend_from_slice(v);
        self
    }

    pub fn field_binary(&mut self, id: i16, v: &[u8]) -> &mut Self {
        self.field_header(CompactType::Binary, id);
        self.write_binary(v)
    }

    pub fn field_string(&mut self, id: i16, v: &str) -> &mut Self {
        self.field_binary(id, v.as_bytes())
    }

    /// Opens a nested struct field; close it with `struct_end`.
    pub fn field_struct_begin(&mut self, id: i16) -> &mut Self {
        self.field_header(CompactType::Struct, id);
        self.struct_begin()
    }

    pub fn list_header(&mut self, elem: CompactType, size: usize) -> &mut Self {
        if size < 15 {
            self.buf.push(((size as u8) << 4) | elem as u8);
        } else {
            self.buf.push(0xf0 | elem as u8);
            self.write_varint(size as u64);
        }
        self
    }

    pub fn field_list_begin(&mut self, id: i16, elem: CompactType, size: usize) -> &mut Self {
        self.field_header(CompactType::List, id);
        self.list_header(elem, size)
    }

    pub fn field_i32_list(&mut self, id: i16, values: &[i32]) -> &mut Self {
        self.field_list_begin(id, CompactType::I32, values.len());
        for v in values {
            self.write_zigzag(i64::from(*v));
        }
        self
    }

    pub fn field_string_list(&mut self, id: i16, values: &[String]) -> &mut Self {
        self.field_list_begin(id, CompactType::Binary, values.len());
        for v in values {
            self.write_binary(v.as_bytes());
        }
        self
    }
}
