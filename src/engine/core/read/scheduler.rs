use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam::channel;
use parking_lot::Mutex;
use rayon::ThreadPool;
use tracing::{debug, info, warn};

use crate::engine::core::column::{ColumnBuffer, ColumnTable};
use crate::engine::errors::{ReaderError, Result};

/// Leaf path to the column table fetched for it.
pub type TableMap = HashMap<String, ColumnTable>;

/// Fans the per-leaf column reads of one `read` call out over the reader's
/// worker pool.
pub struct ColumnReadScheduler<'p> {
    pool: &'p ThreadPool,
    workers: usize,
}

impl<'p> ColumnReadScheduler<'p> {
    pub fn new(pool: &'p ThreadPool, workers: usize) -> Self {
        Self {
            pool,
            workers: workers.max(1),
        }
    }

    /// Reads `target_rows` rows from every buffer and returns one table per
    /// leaf path. The first failure wins; partial results are dropped.
    pub fn fetch_all(
        &self,
        buffers: &mut HashMap<String, ColumnBuffer>,
        target_rows: usize,
    ) -> Result<TableMap> {
        let leaf_count = buffers.len();
        let (tx, rx) = channel::unbounded::<&mut ColumnBuffer>();
        for buffer in buffers.values_mut() {
            tx.send(buffer)
                .map_err(|_| ReaderError::column_read("", "fetch queue closed while seeding"))?;
        }
        // Closing the sender lets workers exit once the queue drains.
        drop(tx);

        let tables = Mutex::new(TableMap::with_capacity(leaf_count));
        let completed = AtomicUsize::new(0);
        let aborted = AtomicBool::new(false);
        let first_error: Mutex<Option<ReaderError>> = Mutex::new(None);

        debug!(
            target: "pq_reader::fetch",
            leaves = leaf_count,
            workers = self.workers,
            target_rows,
            "Dispatching column reads"
        );

        self.pool.scope(|scope| {
            for worker in 0..self.workers {
                let rx = rx.clone();
                let tables = &tables;
                let completed = &completed;
                let aborted = &aborted;
                let first_error = &first_error;
                scope.spawn(move |_| {
                    while let Ok(buffer) = rx.recv() {
                        if aborted.load(Ordering::Acquire) {
                            continue;
                        }
                        match buffer.read_rows(target_rows) {
                            Ok(table) => match insert_table(tables, table) {
                                Ok(()) => {
                                    completed.fetch_add(1, Ordering::AcqRel);
                                }
                                Err(e) => record_failure(first_error, aborted, e),
                            },
                            Err(e) => {
                                warn!(
                                    target: "pq_reader::fetch",
                                    worker,
                                    path = %buffer.path(),
                                    error = %e,
                                    "Column read failed"
                                );
                                record_failure(first_error, aborted, e);
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = first_error.into_inner() {
            return Err(err);
        }
        let done = completed.into_inner();
        if done != leaf_count {
            return Err(ReaderError::column_read(
                "",
                format!("{done} of {leaf_count} column reads completed"),
            ));
        }

        let tables = tables.into_inner();
        info!(
            target: "pq_reader::fetch",
            leaves = tables.len(),
            target_rows,
            "Column reads complete"
        );
        Ok(tables)
    }
}

// Each leaf is queued once; the merge arm keeps a duplicate key from
// silently replacing data that was already fetched.
fn insert_table(tables: &Mutex<TableMap>, table: ColumnTable) -> Result<()> {
    let mut map = tables.lock();
    match map.entry(table.path.clone()) {
        Entry::Occupied(mut existing) => existing.get_mut().merge(table),
        Entry::Vacant(slot) => {
            slot.insert(table);
            Ok(())
        }
    }
}

fn record_failure(first_error: &Mutex<Option<ReaderError>>, aborted: &AtomicBool, err: ReaderError) {
    aborted.store(true, Ordering::Release);
    let mut slot = first_error.lock();
    if slot.is_none() {
        *slot = Some(err);
    }
}
