use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::engine::core::column::reader::page::{
    DecodedPage, LeafLayout, decode_data_page_v1, decode_data_page_v2, decode_dictionary_page,
    read_page_header, verify_crc,
};
use crate::engine::core::column::table::ColumnTable;
use crate::engine::core::column::value::Value;
use crate::engine::core::io::SeekableSource;
use crate::engine::core::metadata::{Codec, FileMetaData, PageType};
use crate::engine::core::schema::{PATH_DELIMITER, SchemaPathIndex};
use crate::engine::errors::{DecodeError, ReaderError, Result};

/// Byte range of one leaf's chunk inside one row group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLocation {
    pub row_group: usize,
    pub start: u64,
    pub len: usize,
    pub codec: Codec,
    pub num_values: i64,
    pub uncompressed_len: i64,
}

#[derive(Debug)]
struct ChunkCursor {
    data: Bytes,
    pos: usize,
    codec: Codec,
    values_left: i64,
    uncompressed_left: i64,
    dictionary: Option<Vec<Value>>,
}

impl ChunkCursor {
    fn exhausted(&self) -> bool {
        self.pos >= self.data.len() || self.values_left <= 0
    }
}

/// Cursor over one leaf column across all row groups.
///
/// State persists between `read_rows` calls: rows decoded from a page but
/// not yet returned stay in `pending`.
pub struct ColumnBuffer {
    source: Arc<dyn SeekableSource>,
    path: String,
    layout: LeafLayout,
    chunks: Vec<ChunkLocation>,
    next_chunk: usize,
    cursor: Option<ChunkCursor>,
    pending: ColumnTable,
    verify_page_crc: bool,
    rows_returned: usize,
}

impl std::fmt::Debug for ColumnBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnBuffer")
            .field("path", &self.path)
            .field("chunks", &self.chunks)
            .field("next_chunk", &self.next_chunk)
            .field("pending_rows", &self.pending.num_rows)
            .field("rows_returned", &self.rows_returned)
            .finish()
    }
}

impl ColumnBuffer {
    pub fn new(
        source: Arc<dyn SeekableSource>,
        metadata: &FileMetaData,
        schema: &SchemaPathIndex,
        path: &str,
        verify_page_crc: bool,
    ) -> Result<Self> {
        let position = schema
            .index_of(path)
            .filter(|p| schema.is_leaf(*p))
            .ok_or_else(|| ReaderError::CorruptSchema(format!("'{path}' is not a leaf column")))?;
        let element = schema.element(position);
        let node = schema.node(position);
        let physical_type = element
            .physical_type
            .ok_or_else(|| ReaderError::CorruptSchema(format!("leaf '{path}' has no type")))?;
        let layout = LeafLayout {
            physical_type,
            type_length: element.type_length,
            max_def_level: node.max_def_level,
            max_rep_level: node.max_rep_level,
        };

        let file_len = source.len()?;
        let ordinal = schema.leaf_ordinal(path);
        let mut chunks = Vec::with_capacity(metadata.row_groups.len());
        for (rg_index, rg) in metadata.row_groups.iter().enumerate() {
            let chunk = rg
                .columns
                .iter()
                .find(|c| {
                    c.meta_data
                        .as_ref()
                        .is_some_and(|m| m.path_in_schema.join(&PATH_DELIMITER.to_string()) == path)
                })
                .or_else(|| ordinal.and_then(|o| rg.columns.get(o)))
                .ok_or_else(|| {
                    ReaderError::CorruptFooter(format!(
                        "row group {rg_index} has no chunk for '{path}'"
                    ))
                })?;
            if let Some(external) = &chunk.file_path {
                return Err(ReaderError::column_read(
                    path,
                    format!("chunk stored in external file '{external}' is not supported"),
                ));
            }
            let meta = chunk.meta_data.as_ref().ok_or_else(|| {
                ReaderError::CorruptFooter(format!(
                    "row group {rg_index} chunk for '{path}' has no metadata"
                ))
            })?;
            if meta.physical_type != physical_type {
                return Err(ReaderError::CorruptFooter(format!(
                    "chunk type {:?} for '{path}' disagrees with schema type {:?}",
                    meta.physical_type, physical_type
                )));
            }
            let start = u64::try_from(meta.chunk_start()).ok();
            let len = usize::try_from(meta.total_compressed_size).ok();
            let (start, len) = match (start, len) {
                (Some(s), Some(l)) if s.saturating_add(l as u64) <= file_len => (s, l),
                _ => {
                    return Err(ReaderError::CorruptFooter(format!(
                        "chunk for '{path}' in row group {rg_index} lies outside the file"
                    )));
                }
            };
            chunks.push(ChunkLocation {
                row_group: rg_index,
                start,
                len,
                codec: meta.codec,
                num_values: meta.num_values,
                uncompressed_len: meta.total_uncompressed_size,
            });
        }

        Ok(Self {
            source,
            path: path.to_string(),
            layout,
            chunks,
            next_chunk: 0,
            cursor: None,
            pending: ColumnTable::new(
                path,
                physical_type,
                layout.max_def_level,
                layout.max_rep_level,
            ),
            verify_page_crc,
            rows_returned: 0,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn chunks(&self) -> &[ChunkLocation] {
        &self.chunks
    }

    pub fn rows_returned(&self) -> usize {
        self.rows_returned
    }

    /// Decodes up to `count` rows, continuing where the previous call
    /// stopped. Fewer rows are returned only when the column is exhausted.
    pub fn read_rows(&mut self, count: usize) -> Result<ColumnTable> {
        while self.pending.num_rows < count {
            match self.next_page().map_err(|e| self.fail(e))? {
                Some(page) => {
                    let table = self.page_table(page)?;
                    self.pending.merge(table)?;
                }
                None => break,
            }
        }
        let out = self.pending.take_rows(count);
        self.rows_returned += out.num_rows;
        trace!(
            target: "pq_reader::fetch",
            path = %self.path,
            rows = out.num_rows,
            slots = out.len(),
            "Column rows decoded"
        );
        Ok(out)
    }

    fn fail(&self, e: DecodeError) -> ReaderError {
        ReaderError::column_read(&self.path, e.to_string())
    }

    fn page_table(&self, page: DecodedPage) -> Result<ColumnTable> {
        if page.rep_levels.first().is_some_and(|r| *r != 0) {
            return Err(ReaderError::column_read(
                &self.path,
                "data page starts in the middle of a row",
            ));
        }
        let num_rows = page.rep_levels.iter().filter(|r| **r == 0).count();
        let table = ColumnTable {
            path: self.path.clone(),
            physical_type: self.layout.physical_type,
            max_def_level: self.layout.max_def_level,
            max_rep_level: self.layout.max_rep_level,
            values: page.values,
            def_levels: page.def_levels,
            rep_levels: page.rep_levels,
            num_rows,
        };
        table.validate()?;
        Ok(table)
    }

    fn open_next_chunk(&mut self) -> std::result::Result<bool, DecodeError> {
        let Some(chunk) = self.chunks.get(self.next_chunk) else {
            return Ok(false);
        };
        let data = self
            .source
            .read_range(chunk.start, chunk.len)
            .map_err(|e| DecodeError::Invalid(format!("chunk read failed: {e}")))?;
        debug!(
            target: "pq_reader::fetch",
            path = %self.path,
            row_group = chunk.row_group,
            offset = chunk.start,
            len = chunk.len,
            "Opened column chunk"
        );
        self.cursor = Some(ChunkCursor {
            data: Bytes::from(data),
            pos: 0,
            codec: chunk.codec,
            values_left: chunk.num_values,
            uncompressed_left: chunk.uncompressed_len,
            dictionary: None,
        });
        self.next_chunk += 1;
        Ok(true)
    }

    fn next_page(&mut self) -> std::result::Result<Option<DecodedPage>, DecodeError> {
        loop {
            if self.cursor.as_ref().is_none_or(ChunkCursor::exhausted) {
                self.cursor = None;
                if !self.open_next_chunk()? {
                    return Ok(None);
                }
                continue;
            }
            let layout = self.layout;
            let verify = self.verify_page_crc;
            let Some(cursor) = self.cursor.as_mut() else {
                continue;
            };

            let (header, header_len) = read_page_header(&cursor.data[cursor.pos..])?;
            let body_len = usize::try_from(header.compressed_page_size).map_err(|_| {
                DecodeError::Invalid(format!(
                    "negative compressed_page_size {}",
                    header.compressed_page_size
                ))
            })?;
            let body_start = cursor.pos + header_len;
            if body_start + body_len > cursor.data.len() {
                return Err(DecodeError::Truncated("page body"));
            }
            let body = cursor.data.slice(body_start..body_start + body_len);
            cursor.pos = body_start + body_len;
            if verify {
                if let Some(crc) = header.crc {
                    verify_crc(crc, &body)?;
                }
            }
            // Sizes and counts below are checked against the chunk totals
            // before any decoder allocates for them.
            let page_size = i64::from(header.uncompressed_page_size);
            if page_size > cursor.uncompressed_left {
                return Err(DecodeError::Invalid(format!(
                    "page declares {page_size} uncompressed bytes, {} left in chunk",
                    cursor.uncompressed_left.max(0)
                )));
            }
            cursor.uncompressed_left -= page_size;

            match header.page_type {
                PageType::DictionaryPage => {
                    cursor.dictionary =
                        Some(decode_dictionary_page(&header, &body, cursor.codec, &layout)?);
                }
                PageType::DataPage => {
                    let data = header.data_page_header.as_ref().ok_or_else(|| {
                        DecodeError::Invalid("data page without data page header".into())
                    })?;
                    check_page_values(data.num_values, cursor.values_left)?;
                    let page = decode_data_page_v1(
                        &header,
                        data,
                        &body,
                        cursor.codec,
                        &layout,
                        cursor.dictionary.as_deref(),
                    )?;
                    cursor.values_left -= i64::from(data.num_values);
                    return Ok(Some(page));
                }
                PageType::DataPageV2 => {
                    let data = header.data_page_header_v2.as_ref().ok_or_else(|| {
                        DecodeError::Invalid("v2 data page without v2 header".into())
                    })?;
                    check_page_values(data.num_values, cursor.values_left)?;
                    let page = decode_data_page_v2(
                        &header,
                        data,
                        &body,
                        cursor.codec,
                        &layout,
                        cursor.dictionary.as_deref(),
                    )?;
                    cursor.values_left -= i64::from(data.num_values);
                    return Ok(Some(page));
                }
                PageType::IndexPage | PageType::Unknown(_) => {}
            }
        }
    }
}

fn check_page_values(num_values: i32, values_left: i64) -> std::result::Result<(), DecodeError> {
    if i64::from(num_values) > values_left {
        return Err(DecodeError::Invalid(format!(
            "page declares {num_values} values, {values_left} left in chunk"
        )));
    }
    Ok(())
}
