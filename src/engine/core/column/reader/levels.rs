use crate::engine::errors::DecodeError;

/// Bits needed to store levels up to `max_level`.
pub fn bit_width(max_level: i16) -> u8 {
    if max_level <= 0 {
        0
    } else {
        (16 - (max_level as u16).leading_zeros()) as u8
    }
}

pub fn read_uleb128(buf: &[u8], pos: &mut usize) -> Result<u64, DecodeError> {
    let mut value = 0u64;
    let mut shift = 0u32;
    loop {
        let b = *buf.get(*pos).ok_or(DecodeError::Truncated("varint"))?;
        *pos += 1;
        value |= u64::from(b & 0x7f) << shift;
        if b & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
        if shift > 63 {
            return Err(DecodeError::Invalid("varint overflow".into()));
        }
    }
}

/// Decodes `n` values of the RLE / bit-packed hybrid encoding.
///
/// A run header with a clear low bit is an RLE run (`len << 1`) followed by
/// the value in `ceil(bit_width / 8)` bytes; a set low bit is
/// `groups << 1 | 1` followed by `groups * 8` values packed LSB first.
pub fn decode_hybrid(buf: &[u8], bit_width: u8, n: usize) -> Result<Vec<u32>, DecodeError> {
    if bit_width == 0 {
        return Ok(vec![0; n]);
    }
    if bit_width > 32 {
        return Err(DecodeError::Invalid(format!("bit width {bit_width} > 32")));
    }
    // `n` may come from a corrupt header.
    let mut out = Vec::with_capacity(n.min(buf.len().saturating_mul(8)));
    let mut pos = 0usize;
    while out.len() < n {
        let header = read_uleb128(buf, &mut pos)?;
        let count = usize::try_from(header >> 1)
            .map_err(|_| DecodeError::Invalid("run length overflow".into()))?;
        if count == 0 {
            return Err(DecodeError::Invalid("empty hybrid run".into()));
        }
        if header & 1 == 0 {
            let width = bit_width.div_ceil(8) as usize;
            let raw = buf
                .get(pos..pos.saturating_add(width))
                .ok_or(DecodeError::Truncated("RLE run"))?;
            let mut le = [0u8; 4];
            le[..width].copy_from_slice(raw);
            pos += width;
            let v = u32::from_le_bytes(le);
            let take = count.min(n - out.len());
            out.extend(std::iter::repeat_n(v, take));
        } else {
            let width = bit_width as usize;
            if count > (buf.len() - pos) / width {
                return Err(DecodeError::Truncated("bit-packed run"));
            }
            let values = count * 8;
            let byte_len = count * width;
            let packed = &buf[pos..pos + byte_len];
            pos += byte_len;
            unpack_lsb(packed, bit_width, values, n - out.len(), &mut out);
        }
    }
    Ok(out)
}

fn unpack_lsb(packed: &[u8], bit_width: u8, values: usize, needed: usize, out: &mut Vec<u32>) {
    let width = u32::from(bit_width);
    let mask = if width == 32 { u64::from(u32::MAX) } else { (1u64 << width) - 1 };
    let mut acc = 0u64;
    let mut bits = 0u32;
    let mut bytes = packed.iter();
    for _ in 0..values.min(needed) {
        while bits < width {
            // packed holds exactly values * width bits
            let b = bytes.next().copied().unwrap_or(0);
            acc |= u64::from(b) << bits;
            bits += 8;
        }
        out.push((acc & mask) as u32);
        acc >>= width;
        bits -= width;
    }
}

/// Decodes a v1 level section: `u32` LE byte length then hybrid data.
/// Returns the levels and the bytes consumed.
pub fn decode_prefixed_levels(
    buf: &[u8],
    max_level: i16,
    n: usize,
) -> Result<(Vec<i16>, usize), DecodeError> {
    if max_level == 0 {
        return Ok((vec![0; n], 0));
    }
    let raw = buf.get(..4).ok_or(DecodeError::Truncated("level length"))?;
    let mut le = [0u8; 4];
    le.copy_from_slice(raw);
    let len = u32::from_le_bytes(le) as usize;
    let section = buf
        .get(4..4usize.saturating_add(len))
        .ok_or(DecodeError::Truncated("level section"))?;
    let levels = decode_levels(section, max_level, n)?;
    Ok((levels, 4 + len))
}

/// Decodes a hybrid level section without length prefix (data page v2).
pub fn decode_levels(buf: &[u8], max_level: i16, n: usize) -> Result<Vec<i16>, DecodeError> {
    if max_level == 0 {
        return Ok(vec![0; n]);
    }
    let raw = decode_hybrid(buf, bit_width(max_level), n)?;
    raw.into_iter()
        .map(|v| match i16::try_from(v) {
            Ok(level) if level <= max_level => Ok(level),
            _ => Err(DecodeError::Invalid(format!(
                "level {v} exceeds maximum {max_level}"
            ))),
        })
        .collect()
}
