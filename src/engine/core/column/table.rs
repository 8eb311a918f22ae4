use crate::engine::core::column::value::Value;
use crate::engine::core::metadata::PhysicalType;
use crate::engine::errors::{ReaderError, Result};

/// Column-major data for one leaf path.
///
/// `def_levels` and `rep_levels` have one entry per level slot; `values`
/// holds only the slots whose definition level reaches `max_def_level`, and
/// `num_rows` counts the slots that start a row (repetition level 0).
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnTable {
    pub path: String,
    pub physical_type: PhysicalType,
    pub max_def_level: i16,
    pub max_rep_level: i16,
    pub values: Vec<Value>,
    pub def_levels: Vec<i16>,
    pub rep_levels: Vec<i16>,
    pub num_rows: usize,
}

impl ColumnTable {
    pub fn new(
        path: impl Into<String>,
        physical_type: PhysicalType,
        max_def_level: i16,
        max_rep_level: i16,
    ) -> Self {
        Self {
            path: path.into(),
            physical_type,
            max_def_level,
            max_rep_level,
            values: Vec::new(),
            def_levels: Vec::new(),
            rep_levels: Vec::new(),
            num_rows: 0,
        }
    }

    /// Number of level slots.
    pub fn len(&self) -> usize {
        self.def_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.def_levels.is_empty()
    }

    /// Appends `other` after `self`, preserving encounter order.
    pub fn merge(&mut self, other: ColumnTable) -> Result<()> {
        if other.path != self.path {
            return Err(ReaderError::column_read(
                &self.path,
                format!("cannot merge table for '{}'", other.path),
            ));
        }
        self.values.extend(other.values);
        self.def_levels.extend(other.def_levels);
        self.rep_levels.extend(other.rep_levels);
        self.num_rows += other.num_rows;
        Ok(())
    }

    /// Splits off and returns the first `rows` rows; `self` keeps the rest.
    pub fn take_rows(&mut self, rows: usize) -> ColumnTable {
        if rows >= self.num_rows {
            let empty = ColumnTable::new(
                self.path.clone(),
                self.physical_type,
                self.max_def_level,
                self.max_rep_level,
            );
            return std::mem::replace(self, empty);
        }

        let split = self
            .rep_levels
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == 0)
            .nth(rows)
            .map(|(i, _)| i)
            .unwrap_or(self.rep_levels.len());
        let value_count = self.def_levels[..split]
            .iter()
            .filter(|d| **d == self.max_def_level)
            .count();

        let head = ColumnTable {
            path: self.path.clone(),
            physical_type: self.physical_type,
            max_def_level: self.max_def_level,
            max_rep_level: self.max_rep_level,
            values: self.values.drain(..value_count).collect(),
            def_levels: self.def_levels.drain(..split).collect(),
            rep_levels: self.rep_levels.drain(..split).collect(),
            num_rows: rows,
        };
        self.num_rows -= rows;
        head
    }

    /// Slot index at which each row starts.
    pub fn row_starts(&self) -> Vec<usize> {
        self.rep_levels
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == 0)
            .map(|(i, _)| i)
            .collect()
    }

    /// Checks the level/value consistency contract.
    pub fn validate(&self) -> Result<()> {
        if self.def_levels.len() != self.rep_levels.len() {
            return Err(ReaderError::column_read(
                &self.path,
                format!(
                    "level length mismatch: def={} rep={}",
                    self.def_levels.len(),
                    self.rep_levels.len()
                ),
            ));
        }
        let defined = self
            .def_levels
            .iter()
            .filter(|d| **d == self.max_def_level)
            .count();
        if defined != self.values.len() {
            return Err(ReaderError::column_read(
                &self.path,
                format!(
                    "value count mismatch: {} defined slots, {} values",
                    defined,
                    self.values.len()
                ),
            ));
        }
        let rows = self.rep_levels.iter().filter(|r| **r == 0).count();
        if rows != self.num_rows {
            return Err(ReaderError::column_read(
                &self.path,
                format!("row count mismatch: {} row starts, {} rows", rows, self.num_rows),
            ));
        }
        Ok(())
    }
}
