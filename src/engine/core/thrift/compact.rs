use crate::engine::errors::ThriftError;

/// Structs nested deeper than this are rejected instead of recursing.
pub const MAX_NESTING: usize = 64;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompactType {
    Stop = 0,
    BoolTrue = 1,
    BoolFalse = 2,
    Byte = 3,
    I16 = 4,
    I32 = 5,
    I64 = 6,
    Double = 7,
    Binary = 8,
    List = 9,
    Set = 10,
    Map = 11,
    Struct = 12,
}

impl TryFrom<u8> for CompactType {
    type Error = ThriftError;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => CompactType::Stop,
            1 => CompactType::BoolTrue,
            2 => CompactType::BoolFalse,
            3 => CompactType::Byte,
            4 => CompactType::I16,
            5 => CompactType::I32,
            6 => CompactType::I64,
            7 => CompactType::Double,
            8 => CompactType::Binary,
            9 => CompactType::List,
            10 => CompactType::Set,
            11 => CompactType::Map,
            12 => CompactType::Struct,
            other => return Err(ThriftError::InvalidType(other)),
        })
    }
}

impl CompactType {
    pub fn is_bool(self) -> bool {
        matches!(self, CompactType::BoolTrue | CompactType::BoolFalse)
    }
}

/// A struct that can be decoded from the compact protocol.
pub trait ThriftStruct: Sized {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError>;
}

/// Decoder over an in-memory slice of compact-protocol bytes.
///
/// Field ids are delta-encoded relative to the previous field of the same
/// struct, so the reader keeps one "last id" per open struct.
#[derive(Debug)]
pub struct CompactReader<'a> {
    buf: &'a [u8],
    pos: usize,
    last_field_id: i16,
    field_id_stack: Vec<i16>,
    pending_bool: Option<bool>,
}

impl<'a> CompactReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            last_field_id: 0,
            field_id_stack: Vec::new(),
            pending_bool: None,
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_byte(&mut self) -> Result<u8, ThriftError> {
        let b = *self
            .buf
            .get(self.pos)
            .ok_or(ThriftError::UnexpectedEof(self.pos))?;
        self.pos += 1;
        Ok(b)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ThriftError> {
        if len > self.remaining() {
            return Err(ThriftError::UnexpectedEof(self.buf.len()));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    pub fn read_varint(&mut self) -> Result<u64, ThriftError> {
        let start = self.pos;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let b = self.read_byte()?;
            value |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(ThriftError::VarintOverflow(start));
            }
        }
    }

    fn read_zigzag(&mut self) -> Result<i64, ThriftError> {
        let v = self.read_varint()?;
        Ok(((v >> 1) as i64) ^ -((v & 1) as i64))
    }

    pub fn read_struct_begin(&mut self) -> Result<(), ThriftError> {
        if self.field_id_stack.len() >= MAX_NESTING {
            return Err(ThriftError::TooDeep(MAX_NESTING));
        }
        self.field_id_stack.push(self.last_field_id);
        self.last_field_id = 0;
        Ok(())
    }

    pub fn read_struct_end(&mut self) {
        self.last_field_id = self.field_id_stack.pop().unwrap_or(0);
    }

    /// Returns `None` on the stop byte that terminates a struct.
    pub fn read_field_begin(&mut self) -> Result<Option<(CompactType, i16)>, ThriftError> {
        let header = self.read_byte()?;
        let ty = CompactType::try_from(header & 0x0f)?;
        if ty == CompactType::Stop {
            return Ok(None);
        }
        let delta = (header >> 4) as i16;
        let id = if delta != 0 {
            self.last_field_id.wrapping_add(delta)
        } else {
            self.read_i16()?
        };
        self.last_field_id = id;
        if ty.is_bool() {
            self.pending_bool = Some(ty == CompactType::BoolTrue);
        }
        Ok(Some((ty, id)))
    }

    pub fn read_bool(&mut self) -> Result<bool, ThriftError> {
        if let Some(v) = self.pending_bool.take() {
            return Ok(v);
        }
        // Inside collections a bool is a whole byte.
        Ok(self.read_byte()? == CompactType::BoolTrue as u8)
    }

    pub fn read_i8(&mut self) -> Result<i8, ThriftError> {
        Ok(self.read_byte()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, ThriftError> {
        let v = self.read_zigzag()?;
        i16::try_from(v).map_err(|_| ThriftError::InvalidValue { what: "i16", value: v })
    }

    pub fn read_i32(&mut self) -> Result<i32, ThriftError> {
        let v = self.read_zigzag()?;
        i32::try_from(v).map_err(|_| ThriftError::InvalidValue { what: "i32", value: v })
    }

    pub fn read_i64(&mut self) -> Result<i64, ThriftError> {
        self.read_zigzag()
    }

    pub fn read_double(&mut self) -> Result<f64, ThriftError> {
        let raw = self.read_slice(8)?;
        let mut b = [0u8; 8];
        b.copy_from_slice(raw);
        Ok(f64::from_le_bytes(b))
    }

    pub fn read_binary(&mut self) -> Result<&'a [u8], ThriftError> {
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| ThriftError::InvalidValue { what: "binary length", value: len as i64 })?;
        self.read_slice(len)
    }

    pub fn read_string(&mut self) -> Result<String, ThriftError> {
        let raw = self.read_binary()?;
        String::from_utf8(raw.to_vec()).map_err(|_| ThriftError::InvalidUtf8)
    }

    /// List and set headers share one layout: size in the high nibble
    /// (15 means a varint follows), element type in the low nibble.
    pub fn read_list_begin(&mut self) -> Result<(CompactType, usize), ThriftError> {
        let header = self.read_byte()?;
        let elem = CompactType::try_from(header & 0x0f)?;
        let short = (header >> 4) as u64;
        let size = if short == 15 { self.read_varint()? } else { short };
        Ok((elem, self.checked_len(size)?))
    }

    pub fn read_map_begin(&mut self) -> Result<(CompactType, CompactType, usize), ThriftError> {
        let size = self.read_varint()?;
        if size == 0 {
            return Ok((CompactType::Stop, CompactType::Stop, 0));
        }
        let kv = self.read_byte()?;
        let key = CompactType::try_from(kv >> 4)?;
        let value = CompactType::try_from(kv & 0x0f)?;
        Ok((key, value, self.checked_len(size)?))
    }

    // Every element occupies at least one byte, so a count larger than the
    // remaining input is malformed.
    fn checked_len(&self, size: u64) -> Result<usize, ThriftError> {
        match usize::try_from(size) {
            Ok(n) if n <= self.remaining() => Ok(n),
            _ => Err(ThriftError::UnexpectedEof(self.buf.len())),
        }
    }

    pub fn skip(&mut self, ty: CompactType) -> Result<(), ThriftError> {
        self.skip_depth(ty, 0)
    }

    fn skip_depth(&mut self, ty: CompactType, depth: usize) -> Result<(), ThriftError> {
        if depth > MAX_NESTING {
            return Err(ThriftError::TooDeep(MAX_NESTING));
        }
        match ty {
            CompactType::Stop => {}
            CompactType::BoolTrue | CompactType::BoolFalse => {
                self.read_bool()?;
            }
            CompactType::Byte => {
                self.read_byte()?;
            }
            CompactType::I16 | CompactType::I32 | CompactType::I64 => {
                self.read_varint()?;
            }
            CompactType::Double => {
                self.read_slice(8)?;
            }
            CompactType::Binary => {
                self.read_binary()?;
            }
            CompactType::List | CompactType::Set => {
                let (elem, len) = self.read_list_begin()?;
                for _ in 0..len {
                    self.skip_depth(elem, depth + 1)?;
                }
            }
            CompactType::Map => {
                let (k, v, len) = self.read_map_begin()?;
                for _ in 0..len {
                    self.skip_depth(k, depth + 1)?;
                    self.skip_depth(v, depth + 1)?;
                }
            }
            CompactType::Struct => {
                self.read_struct_begin()?;
                while let Some((field_ty, _)) = self.read_field_begin()? {
                    self.skip_depth(field_ty, depth + 1)?;
                }
                self.read_struct_end();
            }
        }
        Ok(())
    }

    pub fn read_struct<T: ThriftStruct>(&mut self) -> Result<T, ThriftError> {
        T::read_from(self)
    }

    pub fn read_struct_list<T: ThriftStruct>(&mut self) -> Result<Vec<T>, ThriftError> {
        let (_, len) = self.read_list_begin()?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(T::read_from(self)?);
        }
        Ok(out)
    }

    pub fn read_i32_list(&mut self) -> Result<Vec<i32>, ThriftError> {
        let (_, len) = self.read_list_begin()?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_i32()?);
        }
        Ok(out)
    }

    pub fn read_string_list(&mut self) -> Result<Vec<String>, ThriftError> {
        let (_, len) = self.read_list_begin()?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_string()?);
        }
        Ok(out)
    }
}
