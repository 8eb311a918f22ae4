use bytes::Bytes;

use crate::engine::core::column::reader::decompress::decompress_page;
use crate::engine::core::column::reader::levels::{decode_levels, decode_prefixed_levels};
use crate::engine::core::column::reader::plain::{decode_dictionary_indices, decode_plain};
use crate::engine::core::column::value::Value;
use crate::engine::core::metadata::{
    Codec, DataPageHeader, DataPageHeaderV2, Encoding, PageHeader, PhysicalType,
};
use crate::engine::core::thrift::CompactReader;
use crate::engine::errors::DecodeError;

/// Static description of the leaf a page belongs to.
#[derive(Debug, Clone, Copy)]
pub struct LeafLayout {
    pub physical_type: PhysicalType,
    pub type_length: Option<i32>,
    pub max_def_level: i16,
    pub max_rep_level: i16,
}

/// Levels and defined values of one data page.
#[derive(Debug, Default)]
pub struct DecodedPage {
    pub values: Vec<Value>,
    pub def_levels: Vec<i16>,
    pub rep_levels: Vec<i16>,
}

/// Parses a page header at the front of `buf`, returning it with its encoded
/// length.
pub fn read_page_header(buf: &[u8]) -> Result<(PageHeader, usize), DecodeError> {
    let mut reader = CompactReader::new(buf);
    let header = reader.read_struct::<PageHeader>()?;
    Ok((header, reader.position()))
}

pub fn verify_crc(stored: i32, body: &[u8]) -> Result<(), DecodeError> {
    let computed = crc32fast::hash(body);
    let stored = stored as u32;
    if stored != computed {
        return Err(DecodeError::CrcMismatch { stored, computed });
    }
    Ok(())
}

fn checked_size(size: i32, what: &'static str) -> Result<usize, DecodeError> {
    usize::try_from(size).map_err(|_| DecodeError::Invalid(format!("negative {what}: {size}")))
}

pub fn decode_dictionary_page(
    header: &PageHeader,
    body: &[u8],
    codec: Codec,
    layout: &LeafLayout,
) -> Result<Vec<Value>, DecodeError> {
    let dict = header
        .dictionary_page_header
        .as_ref()
        .ok_or_else(|| DecodeError::Invalid("dictionary page without dictionary header".into()))?;
    if !matches!(dict.encoding, Encoding::Plain | Encoding::PlainDictionary) {
        return Err(DecodeError::UnsupportedEncoding(format!(
            "{:?} dictionary page",
            dict.encoding
        )));
    }
    let uncompressed = checked_size(header.uncompressed_page_size, "uncompressed_page_size")?;
    let raw = Bytes::from(decompress_page(codec, body, uncompressed)?);
    let n = checked_size(dict.num_values, "dictionary num_values")?;
    decode_plain(&raw, layout.physical_type, layout.type_length, n)
}

pub fn decode_data_page_v1(
    header: &PageHeader,
    data: &DataPageHeader,
    body: &[u8],
    codec: Codec,
    layout: &LeafLayout,
    dictionary: Option<&[Value]>,
) -> Result<DecodedPage, DecodeError> {
    let uncompressed = checked_size(header.uncompressed_page_size, "uncompressed_page_size")?;
    let raw = Bytes::from(decompress_page(codec, body, uncompressed)?);
    let n = checked_size(data.num_values, "num_values")?;

    for (encoding, max) in [
        (data.repetition_level_encoding, layout.max_rep_level),
        (data.definition_level_encoding, layout.max_def_level),
    ] {
        if max > 0 && encoding != Encoding::Rle {
            return Err(DecodeError::UnsupportedEncoding(format!(
                "{encoding:?} level encoding"
            )));
        }
    }

    let (rep_levels, rep_len) = decode_prefixed_levels(&raw, layout.max_rep_level, n)?;
    let (def_levels, def_len) = decode_prefixed_levels(&raw[rep_len..], layout.max_def_level, n)?;
    let values_buf = raw.slice(rep_len + def_len..);
    let values = decode_values(&values_buf, data.encoding, &def_levels, layout, dictionary)?;
    Ok(DecodedPage {
        values,
        def_levels,
        rep_levels,
    })
}

pub fn decode_data_page_v2(
    header: &PageHeader,
    data: &DataPageHeaderV2,
    body: &Bytes,
    codec: Codec,
    layout: &LeafLayout,
    dictionary: Option<&[Value]>,
) -> Result<DecodedPage, DecodeError> {
    let n = checked_size(data.num_values, "num_values")?;
    let rep_len = checked_size(data.repetition_levels_byte_length, "repetition levels length")?;
    let def_len = checked_size(data.definition_levels_byte_length, "definition levels length")?;
    if rep_len + def_len > body.len() {
        return Err(DecodeError::Truncated("v2 level sections"));
    }
    let rep_levels = decode_levels(&body[..rep_len], layout.max_rep_level, n)?;
    let def_levels = decode_levels(&body[rep_len..rep_len + def_len], layout.max_def_level, n)?;

    let values_section = body.slice(rep_len + def_len..);
    let values_buf = if data.is_compressed && codec != Codec::Uncompressed {
        let uncompressed = checked_size(header.uncompressed_page_size, "uncompressed_page_size")?
            .checked_sub(rep_len + def_len)
            .ok_or_else(|| DecodeError::Invalid("v2 level sections exceed page size".into()))?;
        Bytes::from(decompress_page(codec, &values_section, uncompressed)?)
    } else {
        values_section
    };
    let values = decode_values(&values_buf, data.encoding, &def_levels, layout, dictionary)?;
    Ok(DecodedPage {
        values,
        def_levels,
        rep_levels,
    })
}

fn decode_values(
    buf: &Bytes,
    encoding: Encoding,
    def_levels: &[i16],
    layout: &LeafLayout,
    dictionary: Option<&[Value]>,
) -> Result<Vec<Value>, DecodeError> {
    let defined = def_levels
        .iter()
        .filter(|d| **d == layout.max_def_level)
        .count();
    match encoding {
        Encoding::Plain => decode_plain(buf, layout.physical_type, layout.type_length, defined),
        e if e.is_dictionary() => {
            let dictionary = dictionary.ok_or_else(|| {
                DecodeError::Invalid("dictionary-encoded page before dictionary page".into())
            })?;
            decode_dictionary_indices(buf, dictionary, defined)
        }
        other => Err(DecodeError::UnsupportedEncoding(format!("{other:?}"))),
    }
}
