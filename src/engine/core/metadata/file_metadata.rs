use crate::engine::core::thrift::{CompactReader, ThriftStruct};
use crate::engine::errors::ThriftError;

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhysicalType {
    Boolean = 0,
    Int32 = 1,
    Int64 = 2,
    Int96 = 3,
    Float = 4,
    Double = 5,
    ByteArray = 6,
    FixedLenByteArray = 7,
}

impl TryFrom<i32> for PhysicalType {
    type Error = ThriftError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => PhysicalType::Boolean,
            1 => PhysicalType::Int32,
            2 => PhysicalType::Int64,
            3 => PhysicalType::Int96,
            4 => PhysicalType::Float,
            5 => PhysicalType::Double,
            6 => PhysicalType::ByteArray,
            7 => PhysicalType::FixedLenByteArray,
            other => {
                return Err(ThriftError::InvalidValue {
                    what: "physical type",
                    value: other.into(),
                });
            }
        })
    }
}

#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repetition {
    Required = 0,
    Optional = 1,
    Repeated = 2,
}

impl TryFrom<i32> for Repetition {
    type Error = ThriftError;

    fn try_from(v: i32) -> Result<Self, Self::Error> {
        Ok(match v {
            0 => Repetition::Required,
            1 => Repetition::Optional,
            2 => Repetition::Repeated,
            other => {
                return Err(ThriftError::InvalidValue {
                    what: "repetition type",
                    value: other.into(),
                });
            }
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Brotli,
    Lz4,
    Zstd,
    Lz4Raw,
    Unknown(i32),
}

impl From<i32> for Codec {
    fn from(v: i32) -> Self {
        match v {
            0 => Codec::Uncompressed,
            1 => Codec::Snappy,
            2 => Codec::Gzip,
            3 => Codec::Lzo,
            4 => Codec::Brotli,
            5 => Codec::Lz4,
            6 => Codec::Zstd,
            7 => Codec::Lz4Raw,
            other => Codec::Unknown(other),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Plain,
    PlainDictionary,
    Rle,
    BitPacked,
    DeltaBinaryPacked,
    DeltaLengthByteArray,
    DeltaByteArray,
    RleDictionary,
    ByteStreamSplit,
    Unknown(i32),
}

impl From<i32> for Encoding {
    fn from(v: i32) -> Self {
        match v {
            0 => Encoding::Plain,
            2 => Encoding::PlainDictionary,
            3 => Encoding::Rle,
            4 => Encoding::BitPacked,
            5 => Encoding::DeltaBinaryPacked,
            6 => Encoding::DeltaLengthByteArray,
            7 => Encoding::DeltaByteArray,
            8 => Encoding::RleDictionary,
            9 => Encoding::ByteStreamSplit,
            other => Encoding::Unknown(other),
        }
    }
}

impl Encoding {
    pub fn is_dictionary(self) -> bool {
        matches!(self, Encoding::PlainDictionary | Encoding::RleDictionary)
    }
}

// Converted types whose byte arrays carry UTF-8 text.
const CONVERTED_UTF8: i32 = 0;
const CONVERTED_ENUM: i32 = 4;
const CONVERTED_JSON: i32 = 19;

const CONVERTED_LIST: i32 = 3;

// LogicalType union members that carry UTF-8 text.
const LOGICAL_STRING: i16 = 1;
const LOGICAL_ENUM: i16 = 4;
const LOGICAL_JSON: i16 = 12;
const LOGICAL_LIST: i16 = 3;

/// One node of the flat, pre-order schema list.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaElement {
    pub name: String,
    pub physical_type: Option<PhysicalType>,
    pub type_length: Option<i32>,
    pub repetition: Option<Repetition>,
    pub num_children: Option<i32>,
    pub converted_type: Option<i32>,
    pub scale: Option<i32>,
    pub precision: Option<i32>,
    pub field_id: Option<i32>,
    /// Field id of the set `LogicalType` union member, if any.
    pub logical_type: Option<i16>,
}

impl SchemaElement {
    pub fn child_count(&self) -> i32 {
        self.num_children.unwrap_or(0)
    }

    pub fn is_leaf(&self) -> bool {
        self.child_count() == 0
    }

    pub fn repetition(&self) -> Repetition {
        self.repetition.unwrap_or(Repetition::Required)
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self.converted_type,
            Some(CONVERTED_UTF8 | CONVERTED_ENUM | CONVERTED_JSON)
        ) || matches!(
            self.logical_type,
            Some(LOGICAL_STRING | LOGICAL_ENUM | LOGICAL_JSON)
        )
    }

    pub fn is_list(&self) -> bool {
        self.converted_type == Some(CONVERTED_LIST) || self.logical_type == Some(LOGICAL_LIST)
    }
}

impl ThriftStruct for SchemaElement {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut name = None;
        let mut physical_type = None;
        let mut type_length = None;
        let mut repetition = None;
        let mut num_children = None;
        let mut converted_type = None;
        let mut scale = None;
        let mut precision = None;
        let mut field_id = None;
        let mut logical_type = None;

        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => physical_type = Some(PhysicalType::try_from(r.read_i32()?)?),
                2 => type_length = Some(r.read_i32()?),
                3 => repetition = Some(Repetition::try_from(r.read_i32()?)?),
                4 => name = Some(r.read_string()?),
                5 => num_children = Some(r.read_i32()?),
                6 => converted_type = Some(r.read_i32()?),
                7 => scale = Some(r.read_i32()?),
                8 => precision = Some(r.read_i32()?),
                9 => field_id = Some(r.read_i32()?),
                10 => logical_type = read_union_member(r)?,
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();

        Ok(Self {
            name: name.ok_or(ThriftError::MissingField {
                strukt: "SchemaElement",
                field: "name",
            })?,
            physical_type,
            type_length,
            repetition,
            num_children,
            converted_type,
            scale,
            precision,
            field_id,
            logical_type,
        })
    }
}

fn read_union_member(r: &mut CompactReader<'_>) -> Result<Option<i16>, ThriftError> {
    r.read_struct_begin()?;
    let mut member = None;
    while let Some((ty, id)) = r.read_field_begin()? {
        member.get_or_insert(id);
        r.skip(ty)?;
    }
    r.read_struct_end();
    Ok(member)
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: Option<String>,
}

impl ThriftStruct for KeyValue {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut key = None;
        let mut value = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => key = Some(r.read_string()?),
                2 => value = Some(r.read_string()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            key: key.ok_or(ThriftError::MissingField {
                strukt: "KeyValue",
                field: "key",
            })?,
            value,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMetaData {
    pub physical_type: PhysicalType,
    pub encodings: Vec<Encoding>,
    pub path_in_schema: Vec<String>,
    pub codec: Codec,
    pub num_values: i64,
    pub total_uncompressed_size: i64,
    pub total_compressed_size: i64,
    pub data_page_offset: i64,
    pub index_page_offset: Option<i64>,
    pub dictionary_page_offset: Option<i64>,
}

impl ColumnMetaData {
    /// First byte of the chunk: the dictionary page when present.
    pub fn chunk_start(&self) -> i64 {
        match self.dictionary_page_offset {
            Some(dict) if dict > 0 && dict < self.data_page_offset => dict,
            _ => self.data_page_offset,
        }
    }
}

impl ThriftStruct for ColumnMetaData {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut physical_type = None;
        let mut encodings = None;
        let mut path_in_schema = None;
        let mut codec = None;
        let mut num_values = None;
        let mut total_uncompressed_size = None;
        let mut total_compressed_size = None;
        let mut data_page_offset = None;
        let mut index_page_offset = None;
        let mut dictionary_page_offset = None;

        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => physical_type = Some(PhysicalType::try_from(r.read_i32()?)?),
                2 => {
                    encodings = Some(
                        r.read_i32_list()?
                            .into_iter()
                            .map(Encoding::from)
                            .collect::<Vec<_>>(),
                    )
                }
                3 => path_in_schema = Some(r.read_string_list()?),
                4 => codec = Some(Codec::from(r.read_i32()?)),
                5 => num_values = Some(r.read_i64()?),
                6 => total_uncompressed_size = Some(r.read_i64()?),
                7 => total_compressed_size = Some(r.read_i64()?),
                9 => data_page_offset = Some(r.read_i64()?),
                10 => index_page_offset = Some(r.read_i64()?),
                11 => dictionary_page_offset = Some(r.read_i64()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();

        let missing = |field| ThriftError::MissingField {
            strukt: "ColumnMetaData",
            field,
        };
        Ok(Self {
            physical_type: physical_type.ok_or(missing("type"))?,
            encodings: encodings.ok_or(missing("encodings"))?,
            path_in_schema: path_in_schema.ok_or(missing("path_in_schema"))?,
            codec: codec.ok_or(missing("codec"))?,
            num_values: num_values.ok_or(missing("num_values"))?,
            total_uncompressed_size: total_uncompressed_size
                .ok_or(missing("total_uncompressed_size"))?,
            total_compressed_size: total_compressed_size.ok_or(missing("total_compressed_size"))?,
            data_page_offset: data_page_offset.ok_or(missing("data_page_offset"))?,
            index_page_offset,
            dictionary_page_offset,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnChunk {
    pub file_path: Option<String>,
    pub file_offset: i64,
    pub meta_data: Option<ColumnMetaData>,
}

impl ThriftStruct for ColumnChunk {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut file_path = None;
        let mut file_offset = None;
        let mut meta_data = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => file_path = Some(r.read_string()?),
                2 => file_offset = Some(r.read_i64()?),
                3 => meta_data = Some(r.read_struct::<ColumnMetaData>()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        Ok(Self {
            file_path,
            file_offset: file_offset.ok_or(ThriftError::MissingField {
                strukt: "ColumnChunk",
                field: "file_offset",
            })?,
            meta_data,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RowGroup {
    pub columns: Vec<ColumnChunk>,
    pub total_byte_size: i64,
    pub num_rows: i64,
}

impl ThriftStruct for RowGroup {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut columns = None;
        let mut total_byte_size = None;
        let mut num_rows = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => columns = Some(r.read_struct_list::<ColumnChunk>()?),
                2 => total_byte_size = Some(r.read_i64()?),
                3 => num_rows = Some(r.read_i64()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "RowGroup",
            field,
        };
        Ok(Self {
            columns: columns.ok_or(missing("columns"))?,
            total_byte_size: total_byte_size.ok_or(missing("total_byte_size"))?,
            num_rows: num_rows.ok_or(missing("num_rows"))?,
        })
    }
}

/// Decoded trailer payload. Immutable once read.
#[derive(Clone, Debug, PartialEq)]
pub struct FileMetaData {
    pub version: i32,
    pub schema: Vec<SchemaElement>,
    pub num_rows: i64,
    pub row_groups: Vec<RowGroup>,
    pub key_value_metadata: Vec<KeyValue>,
    pub created_by: Option<String>,
}

impl ThriftStruct for FileMetaData {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut version = None;
        let mut schema = None;
        let mut num_rows = None;
        let mut row_groups = None;
        let mut key_value_metadata = Vec::new();
        let mut created_by = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => version = Some(r.read_i32()?),
                2 => schema = Some(r.read_struct_list::<SchemaElement>()?),
                3 => num_rows = Some(r.read_i64()?),
                4 => row_groups = Some(r.read_struct_list::<RowGroup>()?),
                5 => key_value_metadata = r.read_struct_list::<KeyValue>()?,
                6 => created_by = Some(r.read_string()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "FileMetaData",
            field,
        };
        Ok(Self {
            version: version.ok_or(missing("version"))?,
            schema: schema.ok_or(missing("schema"))?,
            num_rows: num_rows.ok_or(missing("num_rows"))?,
            row_groups: row_groups.ok_or(missing("row_groups"))?,
            key_value_metadata,
            created_by,
        })
    }
}

impl FileMetaData {
    pub fn num_rows(&self) -> usize {
        usize::try_from(self.num_rows).unwrap_or(0)
    }

    pub fn key_value(&self, key: &str) -> Option<&str> {
        self.key_value_metadata
            .iter()
            .find(|kv| kv.key == key)
            .and_then(|kv| kv.value.as_deref())
    }
}
