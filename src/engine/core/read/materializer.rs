use std::ops::Range;

use rayon::ThreadPool;
use rayon::prelude::*;
use tracing::debug;

use crate::engine::core::read::assembler::RowAssembler;
use crate::engine::core::read::record::{Record, RecordBinding};
use crate::engine::core::read::scheduler::TableMap;
use crate::engine::core::schema::SchemaPathIndex;
use crate::engine::errors::Result;

/// Splits `[0, row_count)` into `parts` contiguous ranges of
/// `ceil(row_count / parts)` rows. Trailing ranges past the end clamp to
/// `row_count..row_count`.
pub fn partition(row_count: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let size = row_count.div_ceil(parts);
    (0..parts)
        .map(|i| {
            let start = (i * size).min(row_count);
            let end = (start + size).min(row_count);
            start..end
        })
        .collect()
}

/// Turns fetched column tables into records, one partition per worker.
pub struct RowMaterializer<'p> {
    pool: &'p ThreadPool,
    workers: usize,
}

impl<'p> RowMaterializer<'p> {
    pub fn new(pool: &'p ThreadPool, workers: usize) -> Self {
        Self {
            pool,
            workers: workers.max(1),
        }
    }

    pub fn materialize<T: Record>(
        &self,
        schema: &SchemaPathIndex,
        tables: &TableMap,
        binding: &RecordBinding,
        row_count: usize,
    ) -> Result<Vec<T>> {
        let assembler = RowAssembler::new(schema, tables, binding, row_count)?;
        let ranges = partition(row_count, self.workers);
        let partitions = ranges.len();

        let segments = self.pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| {
                    let mut segment = Vec::with_capacity(range.len());
                    assembler.assemble(range, &mut segment)?;
                    Ok(segment)
                })
                .collect::<Result<Vec<Vec<T>>>>()
        })?;

        let mut rows = Vec::with_capacity(row_count);
        for segment in segments {
            rows.extend(segment);
        }
        debug!(
            target: "pq_reader::materialize",
            rows = rows.len(),
            partitions,
            "Rows materialized"
        );
        Ok(rows)
    }
}
