use bytes::Bytes;

use crate::engine::core::column::reader::levels::decode_hybrid;
use crate::engine::core::column::value::Value;
use crate::engine::core::metadata::PhysicalType;
use crate::engine::errors::DecodeError;

fn fixed<const N: usize>(buf: &[u8], pos: usize) -> Result<[u8; N], DecodeError> {
    let raw = buf
        .get(pos..pos + N)
        .ok_or(DecodeError::Truncated("plain value"))?;
    let mut out = [0u8; N];
    out.copy_from_slice(raw);
    Ok(out)
}

/// Decodes `n` PLAIN-encoded values starting at the front of `buf`.
pub fn decode_plain(
    buf: &Bytes,
    physical_type: PhysicalType,
    type_length: Option<i32>,
    n: usize,
) -> Result<Vec<Value>, DecodeError> {
    // Smallest encoded size of one value; rejects counts the buffer cannot
    // hold before reserving for them.
    let min_bits = match physical_type {
        PhysicalType::Boolean => 1,
        PhysicalType::Int32 | PhysicalType::Float => 32,
        PhysicalType::Int64 | PhysicalType::Double => 64,
        PhysicalType::Int96 => 96,
        PhysicalType::ByteArray => 32,
        PhysicalType::FixedLenByteArray => 0,
    };
    if n.checked_mul(min_bits).is_none_or(|bits| bits > buf.len().saturating_mul(8)) {
        return Err(DecodeError::Truncated("plain values"));
    }
    let mut out = Vec::with_capacity(n);
    match physical_type {
        PhysicalType::Boolean => {
            if buf.len() < n.div_ceil(8) {
                return Err(DecodeError::Truncated("boolean values"));
            }
            for i in 0..n {
                out.push(Value::Boolean((buf[i / 8] >> (i % 8)) & 1 == 1));
            }
        }
        PhysicalType::Int32 => {
            for i in 0..n {
                out.push(Value::Int32(i32::from_le_bytes(fixed(buf, i * 4)?)));
            }
        }
        PhysicalType::Int64 => {
            for i in 0..n {
                out.push(Value::Int64(i64::from_le_bytes(fixed(buf, i * 8)?)));
            }
        }
        PhysicalType::Int96 => {
            for i in 0..n {
                let raw: [u8; 12] = fixed(buf, i * 12)?;
                let word = |w: usize| {
                    u32::from_le_bytes([raw[w * 4], raw[w * 4 + 1], raw[w * 4 + 2], raw[w * 4 + 3]])
                };
                out.push(Value::Int96([word(0), word(1), word(2)]));
            }
        }
        PhysicalType::Float => {
            for i in 0..n {
                out.push(Value::Float(f32::from_le_bytes(fixed(buf, i * 4)?)));
            }
        }
        PhysicalType::Double => {
            for i in 0..n {
                out.push(Value::Double(f64::from_le_bytes(fixed(buf, i * 8)?)));
            }
        }
        PhysicalType::ByteArray => {
            let mut pos = 0usize;
            for _ in 0..n {
                let len = u32::from_le_bytes(fixed(buf, pos)?) as usize;
                pos += 4;
                if pos + len > buf.len() {
                    return Err(DecodeError::Truncated("byte array value"));
                }
                out.push(Value::ByteArray(buf.slice(pos..pos + len)));
                pos += len;
            }
        }
        PhysicalType::FixedLenByteArray => {
            let len = type_length
                .and_then(|l| usize::try_from(l).ok())
                .filter(|l| *l > 0)
                .ok_or_else(|| {
                    DecodeError::Invalid("fixed-length byte array without type_length".into())
                })?;
            if len.checked_mul(n).is_none_or(|total| buf.len() < total) {
                return Err(DecodeError::Truncated("fixed-length byte array value"));
            }
            for i in 0..n {
                out.push(Value::ByteArray(buf.slice(i * len..(i + 1) * len)));
            }
        }
    }
    Ok(out)
}

/// Decodes `n` dictionary indices (one bit-width byte, then hybrid runs) and
/// resolves them against `dictionary`.
pub fn decode_dictionary_indices(
    buf: &[u8],
    dictionary: &[Value],
    n: usize,
) -> Result<Vec<Value>, DecodeError> {
    if n == 0 {
        return Ok(Vec::new());
    }
    let (&bit_width, runs) = buf
        .split_first()
        .ok_or(DecodeError::Truncated("dictionary indices"))?;
    let indices = decode_hybrid(runs, bit_width, n)?;
    indices
        .into_iter()
        .map(|i| {
            dictionary.get(i as usize).cloned().ok_or_else(|| {
                DecodeError::Invalid(format!(
                    "dictionary index {i} out of range ({} entries)",
                    dictionary.len()
                ))
            })
        })
        .collect()
}
