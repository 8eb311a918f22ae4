use bytes::Bytes;
use std::path::{Path, PathBuf};

use super::compact_writer::CompactWriter;
use super::schema_element_factory::SchemaElementFactory;
use crate::engine::core::column::Value;
use crate::engine::core::metadata::{Codec, MAGIC, PhysicalType, Repetition, SchemaElement};
use crate::engine::core::schema::SchemaPathIndex;
use crate::engine::core::thrift::CompactType;

/// One level slot: repetition level, definition level, and the value when
/// the slot is defined at the leaf's maximum level.
pub type Slot = (i16, i16, Option<Value>);

pub fn text(s: &str) -> Value {
    Value::ByteArray(Bytes::copy_from_slice(s.as_bytes()))
}

/// Level slots of one leaf across the whole file.
#[derive(Clone, Debug, Default)]
pub struct ColumnData {
    slots: Vec<Slot>,
}

impl ColumnData {
    pub fn required(values: Vec<Value>) -> Self {
        Self {
            slots: values.into_iter().map(|v| (0, 0, Some(v))).collect(),
        }
    }

    pub fn optional(values: Vec<Option<Value>>) -> Self {
        Self {
            slots: values
                .into_iter()
                .map(|v| match v {
                    Some(v) => (0, 1, Some(v)),
                    None => (0, 0, None),
                })
                .collect(),
        }
    }

    pub fn from_slots(slots: Vec<Slot>) -> Self {
        Self { slots }
    }

    pub fn row_count(&self) -> usize {
        self.slots.iter().filter(|s| s.0 == 0).count()
    }

    fn row_starts(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.0 == 0)
            .map(|(i, _)| i)
            .collect()
    }

    fn rows(&self, start: usize, end: usize) -> &[Slot] {
        let starts = self.row_starts();
        let from = starts.get(start).copied().unwrap_or(self.slots.len());
        let to = starts.get(end).copied().unwrap_or(self.slots.len());
        &self.slots[from..to]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageVersion {
    V1,
    V2,
}

struct LeafPlan {
    path: Vec<String>,
    physical_type: PhysicalType,
    max_def_level: i16,
    max_rep_level: i16,
}

struct ChunkPlan {
    path: Vec<String>,
    physical_type: PhysicalType,
    encodings: Vec<i32>,
    num_values: i64,
    dictionary_offset: Option<i64>,
    data_offset: i64,
    compressed_size: i64,
    uncompressed_size: i64,
}

struct RowGroupPlan {
    chunks: Vec<ChunkPlan>,
    num_rows: i64,
    total_byte_size: i64,
}

/// Builds complete files in memory. Columns pair with schema leaves in
/// schema order.
pub struct ParquetFileFactory {
    root: String,
    elements: Vec<SchemaElement>,
    columns: Vec<ColumnData>,
    row_group_rows: Option<usize>,
    page_rows: Option<usize>,
    codec: Codec,
    dictionary: bool,
    page_version: PageVersion,
    crc: bool,
    corrupt_crc: bool,
    corrupt_page: Option<(String, usize)>,
    declared_page_values: Option<i32>,
    declared_page_size: Option<i32>,
    declared_rows: Option<i64>,
    created_by: Option<String>,
    key_values: Vec<(String, String)>,
}

impl Default for ParquetFileFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParquetFileFactory {
    pub fn new() -> Self {
        Self {
            root: "schema".to_string(),
            elements: Vec::new(),
            columns: Vec::new(),
            row_group_rows: None,
            page_rows: None,
            codec: Codec::Uncompressed,
            dictionary: false,
            page_version: PageVersion::V1,
            crc: false,
            corrupt_crc: false,
            corrupt_page: None,
            declared_page_values: None,
            declared_page_size: None,
            declared_rows: None,
            created_by: Some("pq_reader test factory".to_string()),
            key_values: Vec::new(),
        }
    }

    pub fn with_root(mut self, name: &str) -> Self {
        self.root = name.to_string();
        self
    }

    /// Adds a schema element that carries no column data of its own.
    pub fn with_element(mut self, element: SchemaElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn with_column(mut self, element: SchemaElement, data: ColumnData) -> Self {
        self.elements.push(element);
        self.columns.push(data);
        self
    }

    /// Adds the data for a leaf already added with `with_element`.
    pub fn with_column_data(mut self, data: ColumnData) -> Self {
        self.columns.push(data);
        self
    }

    pub fn with_required_column(self, name: &str, ty: PhysicalType, values: Vec<Value>) -> Self {
        self.with_column(
            SchemaElementFactory::leaf(name, ty).create(),
            ColumnData::required(values),
        )
    }

    pub fn with_optional_column(
        self,
        name: &str,
        ty: PhysicalType,
        values: Vec<Option<Value>>,
    ) -> Self {
        self.with_column(
            SchemaElementFactory::leaf(name, ty).optional().create(),
            ColumnData::optional(values),
        )
    }

    pub fn with_string_column(self, name: &str, values: &[&str]) -> Self {
        self.with_column(
            SchemaElementFactory::string(name).create(),
            ColumnData::required(values.iter().map(|s| text(s)).collect()),
        )
    }

    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.row_group_rows = Some(rows.max(1));
        self
    }

    pub fn with_page_size(mut self, rows: usize) -> Self {
        self.page_rows = Some(rows.max(1));
        self
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_dictionary(mut self) -> Self {
        self.dictionary = true;
        self
    }

    pub fn with_data_page_v2(mut self) -> Self {
        self.page_version = PageVersion::V2;
        self
    }

    pub fn with_crc(mut self) -> Self {
        self.crc = true;
        self
    }

    /// Stores page checksums that do not match the page bytes.
    pub fn with_corrupt_crc(mut self) -> Self {
        self.crc = true;
        self.corrupt_crc = true;
        self
    }

    /// Stores a wrong checksum for data page `page` (counted from 0 within
    /// each chunk) of leaf `path` only.
    pub fn with_corrupt_page(mut self, path: &str, page: usize) -> Self {
        self.crc = true;
        self.corrupt_page = Some((path.to_string(), page));
        self
    }

    /// Overrides `num_values` in every data page header.
    pub fn with_declared_page_values(mut self, num_values: i32) -> Self {
        self.declared_page_values = Some(num_values);
        self
    }

    /// Overrides `uncompressed_page_size` in every data page header.
    pub fn with_declared_page_size(mut self, size: i32) -> Self {
        self.declared_page_size = Some(size);
        self
    }

    /// Overrides the row count written to the footer.
    pub fn with_declared_rows(mut self, rows: i64) -> Self {
        self.declared_rows = Some(rows);
        self
    }

    pub fn with_created_by(mut self, created_by: &str) -> Self {
        self.created_by = Some(created_by.to_string());
        self
    }

    pub fn with_key_value(mut self, key: &str, value: &str) -> Self {
        self.key_values.push((key.to_string(), value.to_string()));
        self
    }

    pub fn schema_elements(&self) -> Vec<SchemaElement> {
        let mut root = SchemaElementFactory::group(&self.root, top_level_count(&self.elements)).create();
        root.repetition = None;
        let mut full = Vec::with_capacity(self.elements.len() + 1);
        full.push(root);
        full.extend(self.elements.iter().cloned());
        full
    }

    pub fn create(&self) -> Vec<u8> {
        let full = self.schema_elements();
        let index = SchemaPathIndex::build(&full).expect("factory schema must be valid");
        let leaves: Vec<LeafPlan> = index
            .leaf_positions()
            .iter()
            .map(|&p| LeafPlan {
                path: index
                    .path_of(p)
                    .unwrap_or_default()
                    .split('.')
                    .map(str::to_string)
                    .collect(),
                physical_type: index.element(p).physical_type.expect("leaf type"),
                max_def_level: index.node(p).max_def_level,
                max_rep_level: index.node(p).max_rep_level,
            })
            .collect();
        assert_eq!(
            leaves.len(),
            self.columns.len(),
            "one ColumnData per schema leaf"
        );

        let num_rows = self.columns.first().map(ColumnData::row_count).unwrap_or(0);
        let group_rows = self.row_group_rows.unwrap_or(num_rows.max(1));

        let mut out = MAGIC.to_vec();
        let mut row_groups = Vec::new();
        let mut start_row = 0;
        while start_row < num_rows {
            let end_row = (start_row + group_rows).min(num_rows);
            let mut chunks = Vec::with_capacity(leaves.len());
            for (leaf, column) in leaves.iter().zip(&self.columns) {
                chunks.push(self.write_chunk(&mut out, leaf, column.rows(start_row, end_row)));
            }
            row_groups.push(RowGroupPlan {
                total_byte_size: chunks.iter().map(|c| c.uncompressed_size).sum(),
                num_rows: (end_row - start_row) as i64,
                chunks,
            });
            start_row = end_row;
        }

        let metadata = self.encode_metadata(&full, &row_groups, num_rows as i64);
        out.extend_from_slice(&metadata);
        out.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
        out.extend_from_slice(&MAGIC);
        out
    }

    pub fn create_bytes(&self) -> Bytes {
        Bytes::from(self.create())
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.create()).expect("write parquet file");
        path
    }

    fn write_chunk(&self, out: &mut Vec<u8>, leaf: &LeafPlan, slots: &[Slot]) -> ChunkPlan {
        let chunk_start = out.len();
        let mut uncompressed_size = 0usize;

        let dictionary = self.dictionary.then(|| {
            let mut dict: Vec<Value> = Vec::new();
            for value in slots.iter().filter_map(|s| s.2.as_ref()) {
                if !dict.contains(value) {
                    dict.push(value.clone());
                }
            }
            dict
        });

        let mut dictionary_offset = None;
        if let Some(dict) = &dictionary {
            dictionary_offset = Some(out.len() as i64);
            let raw = encode_plain(dict.iter(), leaf.physical_type);
            let body = self.compress(&raw);
            let mut w = CompactWriter::new();
            w.struct_begin();
            w.field_i32(1, 2);
            w.field_i32(2, raw.len() as i32);
            w.field_i32(3, body.len() as i32);
            self.write_crc(&mut w, &body, self.corrupt_crc);
            w.field_struct_begin(7);
            w.field_i32(1, dict.len() as i32);
            w.field_i32(2, 0);
            w.struct_end();
            w.struct_end();
            uncompressed_size += w.as_bytes().len() + raw.len();
            out.extend_from_slice(w.as_bytes());
            out.extend_from_slice(&body);
        }

        let data_offset = out.len() as i64;
        let page_rows = self.page_rows.unwrap_or(usize::MAX);
        let page_data = ColumnData::from_slots(slots.to_vec());
        let rows = page_data.row_count();
        let mut row = 0;
        let mut page = 0;
        while row < rows {
            let end = row.saturating_add(page_rows).min(rows);
            uncompressed_size += self.write_data_page(
                out,
                leaf,
                page,
                page_data.rows(row, end),
                dictionary.as_deref(),
            );
            row = end;
            page += 1;
        }

        let encodings = if self.dictionary {
            vec![0, 3, if self.page_version == PageVersion::V1 { 2 } else { 8 }]
        } else {
            vec![0, 3]
        };
        ChunkPlan {
            path: leaf.path.clone(),
            physical_type: leaf.physical_type,
            encodings,
            num_values: slots.len() as i64,
            dictionary_offset,
            data_offset,
            compressed_size: (out.len() - chunk_start) as i64,
            uncompressed_size: uncompressed_size as i64,
        }
    }

    /// Appends one data page and returns its uncompressed size.
    fn write_data_page(
        &self,
        out: &mut Vec<u8>,
        leaf: &LeafPlan,
        page: usize,
        slots: &[Slot],
        dictionary: Option<&[Value]>,
    ) -> usize {
        let corrupt = self.corrupt_crc
            || self
                .corrupt_page
                .as_ref()
                .is_some_and(|(path, p)| *path == leaf.path.join(".") && *p == page);
        let num_values = self.declared_page_values.unwrap_or(slots.len() as i32);
        let reps: Vec<u32> = slots.iter().map(|s| s.0 as u32).collect();
        let defs: Vec<u32> = slots.iter().map(|s| s.1 as u32).collect();
        let values: Vec<&Value> = slots.iter().filter_map(|s| s.2.as_ref()).collect();

        let (encoding, value_bytes) = match dictionary {
            Some(dict) => {
                let indices: Vec<u32> = values
                    .iter()
                    .map(|v| dict.iter().position(|d| d == *v).expect("value in dictionary") as u32)
                    .collect();
                let width = bit_width(dict.len().saturating_sub(1) as u32);
                let mut bytes = vec![width];
                bytes.extend(encode_rle(&indices, width));
                let encoding = if self.page_version == PageVersion::V1 { 2 } else { 8 };
                (encoding, bytes)
            }
            None => (0, encode_plain(values.iter().copied(), leaf.physical_type)),
        };

        let rep_bytes = level_bytes(&reps, leaf.max_rep_level);
        let def_bytes = level_bytes(&defs, leaf.max_def_level);
        let mut w = CompactWriter::new();
        let (body, uncompressed) = match self.page_version {
            PageVersion::V1 => {
                let mut raw = Vec::new();
                for levels in [&rep_bytes, &def_bytes] {
                    if !levels.is_empty() {
                        raw.extend_from_slice(&(levels.len() as u32).to_le_bytes());
                        raw.extend_from_slice(levels);
                    }
                }
                raw.extend_from_slice(&value_bytes);
                let body = self.compress(&raw);
                w.struct_begin();
                w.field_i32(1, 0);
                w.field_i32(2, self.declared_page_size.unwrap_or(raw.len() as i32));
                w.field_i32(3, body.len() as i32);
                self.write_crc(&mut w, &body, corrupt);
                w.field_struct_begin(5);
                w.field_i32(1, num_values);
                w.field_i32(2, encoding);
                w.field_i32(3, 3);
                w.field_i32(4, 3);
                w.struct_end();
                w.struct_end();
                (body, raw.len())
            }
            PageVersion::V2 => {
                let compressed_values = self.compress(&value_bytes);
                let mut body = rep_bytes.clone();
                body.extend_from_slice(&def_bytes);
                body.extend_from_slice(&compressed_values);
                let uncompressed = rep_bytes.len() + def_bytes.len() + value_bytes.len();
                w.struct_begin();
                w.field_i32(1, 3);
                w.field_i32(2, self.declared_page_size.unwrap_or(uncompressed as i32));
                w.field_i32(3, body.len() as i32);
                self.write_crc(&mut w, &body, corrupt);
                w.field_struct_begin(8);
                w.field_i32(1, num_values);
                w.field_i32(2, (slots.len() - values.len()) as i32);
                w.field_i32(3, reps.iter().filter(|r| **r == 0).count() as i32);
                w.field_i32(4, encoding);
                w.field_i32(5, def_bytes.len() as i32);
                w.field_i32(6, rep_bytes.len() as i32);
                w.field_bool(7, self.codec != Codec::Uncompressed);
                w.struct_end();
                w.struct_end();
                (body, uncompressed)
            }
        };
        out.extend_from_slice(w.as_bytes());
        out.extend_from_slice(&body);
        w.as_bytes().len() + uncompressed
    }

    fn write_crc(&self, w: &mut CompactWriter, body: &[u8], corrupt: bool) {
        if self.crc {
            let mut crc = crc32fast::hash(body);
            if corrupt {
                crc ^= 0xdead_beef;
            }
            w.field_i32(4, crc as i32);
        }
    }

    fn compress(&self, raw: &[u8]) -> Vec<u8> {
        match self.codec {
            Codec::Uncompressed => raw.to_vec(),
            Codec::Zstd => zstd::bulk::compress(raw, 3).expect("zstd compress"),
            Codec::Lz4Raw => lz4_flex::block::compress(raw),
            other => panic!("factory cannot write {other:?} pages"),
        }
    }

    fn encode_metadata(
        &self,
        schema: &[SchemaElement],
        row_groups: &[RowGroupPlan],
        num_rows: i64,
    ) -> Vec<u8> {
        let mut w = CompactWriter::new();
        w.struct_begin();
        w.field_i32(1, 1);
        w.field_list_begin(2, CompactType::Struct, schema.len());
        for element in schema {
            write_schema_element(&mut w, element);
        }
        w.field_i64(3, self.declared_rows.unwrap_or(num_rows));
        w.field_list_begin(4, CompactType::Struct, row_groups.len());
        for rg in row_groups {
            w.struct_begin();
            w.field_list_begin(1, CompactType::Struct, rg.chunks.len());
            for chunk in &rg.chunks {
                w.struct_begin();
                w.field_i64(2, chunk.dictionary_offset.unwrap_or(chunk.data_offset));
                w.field_struct_begin(3);
                w.field_i32(1, physical_type_id(chunk.physical_type));
                w.field_i32_list(2, &chunk.encodings);
                w.field_string_list(3, &chunk.path);
                w.field_i32(4, codec_id(self.codec));
                w.field_i64(5, chunk.num_values);
                w.field_i64(6, chunk.uncompressed_size);
                w.field_i64(7, chunk.compressed_size);
                w.field_i64(9, chunk.data_offset);
                if let Some(offset) = chunk.dictionary_offset {
                    w.field_i64(11, offset);
                }
                w.struct_end();
                w.struct_end();
            }
            w.field_i64(2, rg.total_byte_size);
            w.field_i64(3, rg.num_rows);
            w.struct_end();
        }
        if !self.key_values.is_empty() {
            w.field_list_begin(5, CompactType::Struct, self.key_values.len());
            for (key, value) in &self.key_values {
                w.struct_begin();
                w.field_string(1, key);
                w.field_string(2, value);
                w.struct_end();
            }
        }
        if let Some(created_by) = &self.created_by {
            w.field_string(6, created_by);
        }
        w.struct_end();
        w.into_bytes()
    }
}

pub fn write_schema_element(w: &mut CompactWriter, e: &SchemaElement) {
    w.struct_begin();
    if let Some(t) = e.physical_type {
        w.field_i32(1, physical_type_id(t));
    }
    if let Some(len) = e.type_length {
        w.field_i32(2, len);
    }
    if let Some(rep) = e.repetition {
        w.field_i32(3, repetition_id(rep));
    }
    w.field_string(4, &e.name);
    if let Some(n) = e.num_children {
        w.field_i32(5, n);
    }
    if let Some(c) = e.converted_type {
        w.field_i32(6, c);
    }
    if let Some(s) = e.scale {
        w.field_i32(7, s);
    }
    if let Some(p) = e.precision {
        w.field_i32(8, p);
    }
    if let Some(id) = e.field_id {
        w.field_i32(9, id);
    }
    if let Some(member) = e.logical_type {
        w.field_struct_begin(10);
        w.field_struct_begin(member);
        w.struct_end();
        w.struct_end();
    }
    w.struct_end();
}

fn top_level_count(elements: &[SchemaElement]) -> i32 {
    let mut count = 0;
    let mut open: Vec<i32> = Vec::new();
    for element in elements {
        match open.last_mut() {
            None => count += 1,
            Some(remaining) => *remaining -= 1,
        }
        while open.last() == Some(&0) {
            open.pop();
        }
        if element.child_count() > 0 {
            open.push(element.child_count());
        }
    }
    count
}

pub fn physical_type_id(t: PhysicalType) -> i32 {
    match t {
        PhysicalType::Boolean => 0,
        PhysicalType::Int32 => 1,
        PhysicalType::Int64 => 2,
        PhysicalType::Int96 => 3,
        PhysicalType::Float => 4,
        PhysicalType::Double => 5,
        PhysicalType::ByteArray => 6,
        PhysicalType::FixedLenByteArray => 7,
    }
}

fn repetition_id(r: Repetition) -> i32 {
    match r {
        Repetition::Required => 0,
        Repetition::Optional => 1,
        Repetition::Repeated => 2,
    }
}

fn codec_id(c: Codec) -> i32 {
    match c {
        Codec::Uncompressed => 0,
        Codec::Zstd => 6,
        Codec::Lz4Raw => 7,
        other => panic!("factory cannot write {other:?}"),
    }
}

fn bit_width(max: u32) -> u8 {
    (32 - max.leading_zeros()) as u8
}

fn level_bytes(levels: &[u32], max_level: i16) -> Vec<u8> {
    if max_level == 0 {
        return Vec::new();
    }
    encode_rle(levels, bit_width(max_level as u32))
}

/// Hybrid encoding using RLE runs only.
pub fn encode_rle(values: &[u32], bit_width: u8) -> Vec<u8> {
    let mut w = CompactWriter::new();
    let width = bit_width.div_ceil(8) as usize;
    let mut i = 0;
    while i < values.len() {
        let v = values[i];
        let mut j = i;
        while j < values.len() && values[j] == v {
            j += 1;
        }
        w.write_varint(((j - i) as u64) << 1);
        for b in 0..width {
            w.write_byte((v >> (8 * b)) as u8);
        }
        i = j;
    }
    w.into_bytes()
}

pub fn encode_plain<'v>(values: impl Iterator<Item = &'v Value>, ty: PhysicalType) -> Vec<u8> {
    let mut out = Vec::new();
    if ty == PhysicalType::Boolean {
        let bits: Vec<bool> = values
            .map(|v| match v {
                Value::Boolean(b) => *b,
                other => panic!("expected boolean, got {other:?}"),
            })
            .collect();
        out.resize(bits.len().div_ceil(8), 0);
        for (i, bit) in bits.iter().enumerate() {
            if *bit {
                out[i / 8] |= 1 << (i % 8);
            }
        }
        return out;
    }
    for value in values {
        match (value, ty) {
            (Value::Int32(v), PhysicalType::Int32) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::Int64(v), PhysicalType::Int64) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::Int96(words), PhysicalType::Int96) => {
                for word in words {
                    out.extend_from_slice(&word.to_le_bytes());
                }
            }
            (Value::Float(v), PhysicalType::Float) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::Double(v), PhysicalType::Double) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::ByteArray(b), PhysicalType::ByteArray) => {
                out.extend_from_slice(&(b.len() as u32).to_le_bytes());
                out.extend_from_slice(b);
            }
            (Value::ByteArray(b), PhysicalType::FixedLenByteArray) => out.extend_from_slice(b),
            (other, ty) => panic!("value {other:?} does not match {ty:?}"),
        }
    }
    out
}
