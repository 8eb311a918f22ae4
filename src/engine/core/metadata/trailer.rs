use tracing::debug;

use crate::engine::core::io::SeekableSource;
use crate::engine::core::metadata::file_metadata::FileMetaData;
use crate::engine::core::thrift::CompactReader;
use crate::engine::errors::{ReaderError, Result};

pub const MAGIC: [u8; 4] = *b"PAR1";

/// `u32` metadata length followed by the magic marker.
pub const TRAILER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub metadata_len: u32,
    pub magic: [u8; 4],
}

impl Trailer {
    pub fn read_from(bytes: &[u8; TRAILER_LEN]) -> Self {
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[..4]);
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[4..]);
        Self {
            metadata_len: u32::from_le_bytes(len),
            magic,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.magic != MAGIC {
            return Err(ReaderError::CorruptFooter(format!(
                "invalid magic {:?}",
                self.magic
            )));
        }
        Ok(())
    }
}

/// Locates and decodes the metadata block that precedes the trailer.
///
/// Every failure is reported as `CorruptFooter`; none of them is retried.
pub fn read_trailer<S: SeekableSource + ?Sized>(
    source: &S,
    max_footer_len: Option<u32>,
) -> Result<FileMetaData> {
    let file_len = source
        .len()
        .map_err(|e| ReaderError::CorruptFooter(format!("source length unavailable: {e}")))?;
    if file_len < (MAGIC.len() + TRAILER_LEN) as u64 {
        return Err(ReaderError::CorruptFooter(format!(
            "file too small for trailer: {file_len} bytes"
        )));
    }

    let mut tail = [0u8; TRAILER_LEN];
    source
        .read_exact_at(file_len - TRAILER_LEN as u64, &mut tail)
        .map_err(|e| ReaderError::CorruptFooter(format!("trailer read failed: {e}")))?;
    let trailer = Trailer::read_from(&tail);
    trailer.validate()?;

    let metadata_len = u64::from(trailer.metadata_len);
    if metadata_len + TRAILER_LEN as u64 > file_len {
        return Err(ReaderError::CorruptFooter(format!(
            "metadata length {metadata_len} exceeds file length {file_len}"
        )));
    }
    if let Some(limit) = max_footer_len {
        if trailer.metadata_len > limit {
            return Err(ReaderError::CorruptFooter(format!(
                "metadata length {metadata_len} exceeds limit {limit}"
            )));
        }
    }

    let start = file_len - TRAILER_LEN as u64 - metadata_len;
    let block = source
        .read_range(start, trailer.metadata_len as usize)
        .map_err(|e| ReaderError::CorruptFooter(format!("metadata read failed: {e}")))?;

    let mut reader = CompactReader::new(&block);
    let metadata = reader
        .read_struct::<FileMetaData>()
        .map_err(|e| ReaderError::CorruptFooter(format!("metadata decode failed: {e}")))?;
    if metadata.num_rows < 0 {
        return Err(ReaderError::CorruptFooter(format!(
            "negative row count {}",
            metadata.num_rows
        )));
    }

    debug!(
        target: "pq_reader::open",
        file_len,
        metadata_len,
        num_rows = metadata.num_rows,
        row_groups = metadata.row_groups.len(),
        "Decoded file metadata"
    );
    Ok(metadata)
}
