use crate::engine::core::metadata::file_metadata::Encoding;
use crate::engine::core::thrift::{CompactReader, ThriftStruct};
use crate::engine::errors::ThriftError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageType {
    DataPage,
    IndexPage,
    DictionaryPage,
    DataPageV2,
    Unknown(i32),
}

impl From<i32> for PageType {
    fn from(v: i32) -> Self {
        match v {
            0 => PageType::DataPage,
            1 => PageType::IndexPage,
            2 => PageType::DictionaryPage,
            3 => PageType::DataPageV2,
            other => PageType::Unknown(other),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub definition_level_encoding: Encoding,
    pub repetition_level_encoding: Encoding,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DataPageHeaderV2 {
    pub num_values: i32,
    pub num_nulls: i32,
    pub num_rows: i32,
    pub encoding: Encoding,
    pub definition_levels_byte_length: i32,
    pub repetition_levels_byte_length: i32,
    pub is_compressed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DictionaryPageHeader {
    pub num_values: i32,
    pub encoding: Encoding,
    pub is_sorted: Option<bool>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PageHeader {
    pub page_type: PageType,
    pub uncompressed_page_size: i32,
    pub compressed_page_size: i32,
    pub crc: Option<i32>,
    pub data_page_header: Option<DataPageHeader>,
    pub dictionary_page_header: Option<DictionaryPageHeader>,
    pub data_page_header_v2: Option<DataPageHeaderV2>,
}

impl ThriftStruct for DataPageHeader {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut num_values = None;
        let mut encoding = None;
        let mut def_encoding = None;
        let mut rep_encoding = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => num_values = Some(r.read_i32()?),
                2 => encoding = Some(Encoding::from(r.read_i32()?)),
                3 => def_encoding = Some(Encoding::from(r.read_i32()?)),
                4 => rep_encoding = Some(Encoding::from(r.read_i32()?)),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "DataPageHeader",
            field,
        };
        Ok(Self {
            num_values: num_values.ok_or(missing("num_values"))?,
            encoding: encoding.ok_or(missing("encoding"))?,
            definition_level_encoding: def_encoding.ok_or(missing("definition_level_encoding"))?,
            repetition_level_encoding: rep_encoding.ok_or(missing("repetition_level_encoding"))?,
        })
    }
}

impl ThriftStruct for DataPageHeaderV2 {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut num_values = None;
        let mut num_nulls = None;
        let mut num_rows = None;
        let mut encoding = None;
        let mut def_len = None;
        let mut rep_len = None;
        let mut is_compressed = true;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => num_values = Some(r.read_i32()?),
                2 => num_nulls = Some(r.read_i32()?),
                3 => num_rows = Some(r.read_i32()?),
                4 => encoding = Some(Encoding::from(r.read_i32()?)),
                5 => def_len = Some(r.read_i32()?),
                6 => rep_len = Some(r.read_i32()?),
                7 => is_compressed = r.read_bool()?,
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "DataPageHeaderV2",
            field,
        };
        Ok(Self {
            num_values: num_values.ok_or(missing("num_values"))?,
            num_nulls: num_nulls.ok_or(missing("num_nulls"))?,
            num_rows: num_rows.ok_or(missing("num_rows"))?,
            encoding: encoding.ok_or(missing("encoding"))?,
            definition_levels_byte_length: def_len.ok_or(missing("definition_levels_byte_length"))?,
            repetition_levels_byte_length: rep_len.ok_or(missing("repetition_levels_byte_length"))?,
            is_compressed,
        })
    }
}

impl ThriftStruct for DictionaryPageHeader {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut num_values = None;
        let mut encoding = None;
        let mut is_sorted = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => num_values = Some(r.read_i32()?),
                2 => encoding = Some(Encoding::from(r.read_i32()?)),
                3 => is_sorted = Some(r.read_bool()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "DictionaryPageHeader",
            field,
        };
        Ok(Self {
            num_values: num_values.ok_or(missing("num_values"))?,
            encoding: encoding.ok_or(missing("encoding"))?,
            is_sorted,
        })
    }
}

impl ThriftStruct for PageHeader {
    fn read_from(r: &mut CompactReader<'_>) -> Result<Self, ThriftError> {
        r.read_struct_begin()?;
        let mut page_type = None;
        let mut uncompressed = None;
        let mut compressed = None;
        let mut crc = None;
        let mut data_page_header = None;
        let mut dictionary_page_header = None;
        let mut data_page_header_v2 = None;
        while let Some((ty, id)) = r.read_field_begin()? {
            match id {
                1 => page_type = Some(PageType::from(r.read_i32()?)),
                2 => uncompressed = Some(r.read_i32()?),
                3 => compressed = Some(r.read_i32()?),
                4 => crc = Some(r.read_i32()?),
                5 => data_page_header = Some(r.read_struct::<DataPageHeader>()?),
                7 => dictionary_page_header = Some(r.read_struct::<DictionaryPageHeader>()?),
                8 => data_page_header_v2 = Some(r.read_struct::<DataPageHeaderV2>()?),
                _ => r.skip(ty)?,
            }
        }
        r.read_struct_end();
        let missing = |field| ThriftError::MissingField {
            strukt: "PageHeader",
            field,
        };
        Ok(Self {
            page_type: page_type.ok_or(missing("type"))?,
            uncompressed_page_size: uncompressed.ok_or(missing("uncompressed_page_size"))?,
            compressed_page_size: compressed.ok_or(missing("compressed_page_size"))?,
            crc,
            data_page_header,
            dictionary_page_header,
            data_page_header_v2,
        })
    }
}
