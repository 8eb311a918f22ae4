use std::collections::HashMap;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::engine::core::column::ColumnBuffer;
use crate::engine::core::io::SeekableSource;
use crate::engine::core::metadata::{FileMetaData, read_trailer};
use crate::engine::core::read::materializer::RowMaterializer;
use crate::engine::core::read::record::{Record, RecordBinding};
use crate::engine::core::read::scheduler::{ColumnReadScheduler, TableMap};
use crate::engine::core::schema::SchemaPathIndex;
use crate::engine::errors::{ReaderError, Result};
use crate::shared::config::ReaderSettings;

/// Knobs fixed for the lifetime of one reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    pub worker_count: usize,
    pub verify_page_crc: bool,
    /// Upper bound on the footer length declared by the trailer.
    pub max_footer_len: Option<u32>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            worker_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            verify_page_crc: true,
            max_footer_len: None,
        }
    }
}

impl ReaderOptions {
    pub fn from_settings(settings: &ReaderSettings) -> Self {
        Self {
            worker_count: settings.worker_count,
            verify_page_crc: settings.verify_page_crc,
            max_footer_len: settings.max_footer_len,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }
}

/// Reads a columnar file in row chunks into caller-defined records.
///
/// All leaves advance together: every `read` fetches the same number of rows
/// from each column so that later calls stay row-aligned.
pub struct ParquetReader {
    source: Arc<dyn SeekableSource>,
    metadata: FileMetaData,
    schema: SchemaPathIndex,
    column_buffers: HashMap<String, ColumnBuffer>,
    pool: ThreadPool,
    worker_count: usize,
    row_count: usize,
    rows_consumed: usize,
    /// Set by the first failed fetch: leaf path and reason.
    poisoned: Option<(String, String)>,
}

impl std::fmt::Debug for ParquetReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetReader")
            .field("row_count", &self.row_count)
            .field("rows_consumed", &self.rows_consumed)
            .field("leaves", &self.column_buffers.len())
            .field("worker_count", &self.worker_count)
            .field("poisoned", &self.poisoned.is_some())
            .finish()
    }
}

impl ParquetReader {
    pub fn open<S: SeekableSource + 'static>(source: S, worker_count: usize) -> Result<Self> {
        Self::open_with(source, ReaderOptions::default().with_worker_count(worker_count))
    }

    pub fn open_with<S: SeekableSource + 'static>(source: S, options: ReaderOptions) -> Result<Self> {
        if options.worker_count == 0 {
            return Err(ReaderError::InvalidConfig(
                "worker_count must be at least 1".into(),
            ));
        }
        let source: Arc<dyn SeekableSource> = Arc::new(source);
        let metadata = read_trailer(&*source, options.max_footer_len)?;
        let schema = SchemaPathIndex::build(&metadata.schema)?;
        let row_count = metadata.num_rows();

        let mut column_buffers = HashMap::with_capacity(schema.leaf_count());
        for path in schema.leaf_paths() {
            let buffer = ColumnBuffer::new(
                Arc::clone(&source),
                &metadata,
                &schema,
                path,
                options.verify_page_crc,
            )?;
            column_buffers.insert(path.to_string(), buffer);
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(options.worker_count)
            .thread_name(|i| format!("pq-reader-{i}"))
            .build()
            .map_err(|e| ReaderError::InvalidConfig(format!("worker pool: {e}")))?;

        info!(
            target: "pq_reader::open",
            rows = row_count,
            leaves = column_buffers.len(),
            row_groups = metadata.row_groups.len(),
            workers = options.worker_count,
            created_by = metadata.created_by.as_deref().unwrap_or(""),
            "Opened reader"
        );

        Ok(Self {
            source,
            metadata,
            schema,
            column_buffers,
            pool,
            worker_count: options.worker_count,
            row_count,
            rows_consumed: 0,
            poisoned: None,
        })
    }

    /// Total rows declared by the footer.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn remaining_rows(&self) -> usize {
        self.row_count - self.rows_consumed
    }

    pub fn metadata(&self) -> &FileMetaData {
        &self.metadata
    }

    pub fn schema(&self) -> &SchemaPathIndex {
        &self.schema
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn leaf_paths(&self) -> Vec<&str> {
        self.schema.leaf_paths()
    }

    /// True once a column fetch has failed; every later `read` fails too.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Replaces `dest` with the next `min(max_rows, remaining)` rows.
    ///
    /// Rows count as consumed once every column has produced them, even if
    /// converting them into `T` then fails. A failed column fetch leaves the
    /// columns at different positions, so the reader is unusable afterwards:
    /// every later call returns that fetch's `ColumnRead` error.
    pub fn read<T: Record>(&mut self, dest: &mut Vec<T>, max_rows: usize) -> Result<()> {
        dest.clear();
        if let Some((path, reason)) = &self.poisoned {
            return Err(ReaderError::column_read(
                path,
                format!("reader unusable after failed fetch: {reason}"),
            ));
        }
        let rows = max_rows.min(self.remaining_rows());
        if rows == 0 {
            debug!(target: "pq_reader::fetch", max_rows, "Nothing to read");
            return Ok(());
        }
        let records = self.read_chunk::<T>(rows).inspect_err(|e| e.log_error())?;
        *dest = records;
        Ok(())
    }

    pub fn read_all<T: Record>(&mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        self.read(&mut out, self.remaining_rows())?;
        Ok(out)
    }

    /// Releases the worker pool and the source handle.
    pub fn close(self) {
        debug!(
            target: "pq_reader::open",
            rows_consumed = self.rows_consumed,
            source_refs = Arc::strong_count(&self.source),
            "Closing reader"
        );
    }

    fn read_chunk<T: Record>(&mut self, rows: usize) -> Result<Vec<T>> {
        let binding = RecordBinding::resolve::<T>(&self.schema)?;

        let tables = match self.fetch(rows) {
            Ok(tables) => tables,
            Err(e) => {
                self.poison(&e);
                return Err(e);
            }
        };
        self.rows_consumed += rows;

        RowMaterializer::new(&self.pool, self.worker_count).materialize(
            &self.schema,
            &tables,
            &binding,
            rows,
        )
    }

    fn fetch(&mut self, rows: usize) -> Result<TableMap> {
        let scheduler = ColumnReadScheduler::new(&self.pool, self.worker_count);
        let tables = scheduler.fetch_all(&mut self.column_buffers, rows)?;
        for table in tables.values() {
            if table.num_rows != rows {
                return Err(ReaderError::column_read(
                    &table.path,
                    format!("produced {} rows, {rows} expected", table.num_rows),
                ));
            }
        }
        Ok(tables)
    }

    fn poison(&mut self, err: &ReaderError) {
        let (path, reason) = match err {
            ReaderError::ColumnRead { path, reason } => (path.clone(), reason.clone()),
            other => (String::new(), other.to_string()),
        };
        warn!(
            target: "pq_reader::fetch",
            path = %path,
            reason = %reason,
            "Reader poisoned by failed fetch"
        );
        self.poisoned = Some((path, reason));
    }
}
