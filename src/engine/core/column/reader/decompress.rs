use crate::engine::core::metadata::Codec;
use crate::engine::errors::DecodeError;

pub trait PageCodec: Sync {
    fn name(&self) -> &'static str;
    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, DecodeError>;
}

pub struct Uncompressed;

impl PageCodec for Uncompressed {
    fn name(&self) -> &'static str {
        "UNCOMPRESSED"
    }
    fn decompress(&self, input: &[u8], _uncompressed_len: usize) -> Result<Vec<u8>, DecodeError> {
        Ok(input.to_vec())
    }
}

pub struct ZstdCodec;

impl PageCodec for ZstdCodec {
    fn name(&self) -> &'static str {
        "ZSTD"
    }
    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, DecodeError> {
        zstd::bulk::decompress(input, uncompressed_len)
            .map_err(|e| DecodeError::Decompress(format!("zstd: {e}")))
    }
}

/// `LZ4_RAW`: a bare LZ4 block without size prefix.
pub struct Lz4RawCodec;

impl PageCodec for Lz4RawCodec {
    fn name(&self) -> &'static str {
        "LZ4_RAW"
    }
    fn decompress(&self, input: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, DecodeError> {
        lz4_flex::block::decompress(input, uncompressed_len)
            .map_err(|e| DecodeError::Decompress(format!("lz4: {e}")))
    }
}

pub fn codec_for(codec: Codec) -> Result<&'static dyn PageCodec, DecodeError> {
    match codec {
        Codec::Uncompressed => Ok(&Uncompressed),
        Codec::Zstd => Ok(&ZstdCodec),
        Codec::Lz4Raw => Ok(&Lz4RawCodec),
        other => Err(DecodeError::UnsupportedCodec(format!("{other:?}"))),
    }
}

/// Decompresses a page body and checks the output against the size the
/// header declared.
pub fn decompress_page(
    codec: Codec,
    input: &[u8],
    uncompressed_len: usize,
) -> Result<Vec<u8>, DecodeError> {
    let codec = codec_for(codec)?;
    let out = codec.decompress(input, uncompressed_len)?;
    if out.len() != uncompressed_len {
        return Err(DecodeError::Decompress(format!(
            "{} produced {} bytes, header declared {}",
            codec.name(),
            out.len(),
            uncompressed_len
        )));
    }
    Ok(out)
}
