use std::collections::HashMap;
use std::ops::Range;

use crate::engine::core::column::{ColumnTable, Value};
use crate::engine::core::metadata::Repetition;
use crate::engine::core::read::record::{Record, RecordBinding};
use crate::engine::core::read::row::{Field, Row};
use crate::engine::core::read::scheduler::TableMap;
use crate::engine::core::schema::SchemaPathIndex;
use crate::engine::errors::{ReaderError, Result};

/// Row boundaries of one leaf table, with one trailing sentinel entry so any
/// row range `[b, e)` maps straight to slot and value offsets.
struct LeafIndex<'t> {
    table: &'t ColumnTable,
    row_starts: Vec<usize>,
    value_offsets: Vec<usize>,
}

impl<'t> LeafIndex<'t> {
    fn build(table: &'t ColumnTable) -> Self {
        let mut row_starts = Vec::with_capacity(table.num_rows + 1);
        let mut value_offsets = Vec::with_capacity(table.num_rows + 1);
        let mut values = 0usize;
        for (slot, (&rep, &def)) in table.rep_levels.iter().zip(&table.def_levels).enumerate() {
            if rep == 0 {
                row_starts.push(slot);
                value_offsets.push(values);
            }
            if def == table.max_def_level {
                values += 1;
            }
        }
        row_starts.push(table.len());
        value_offsets.push(values);
        Self {
            table,
            row_starts,
            value_offsets,
        }
    }
}

/// Reassembles typed rows from column-major leaf tables using their
/// definition and repetition levels.
///
/// Built once per read; `assemble` may then run concurrently for disjoint
/// row ranges since every range seeks its own cursors.
pub struct RowAssembler<'t> {
    schema: &'t SchemaPathIndex,
    binding: &'t RecordBinding,
    leaves: HashMap<usize, LeafIndex<'t>>,
}

impl<'t> RowAssembler<'t> {
    pub fn new(
        schema: &'t SchemaPathIndex,
        tables: &'t TableMap,
        binding: &'t RecordBinding,
        row_count: usize,
    ) -> Result<Self> {
        let mut leaves = HashMap::new();
        for &column in &binding.columns {
            for leaf in schema.leaves_under(column) {
                let path = schema.path_of(leaf).unwrap_or_default();
                let table = tables.get(path).ok_or_else(|| {
                    ReaderError::Materialize(format!("no column table for leaf '{path}'"))
                })?;
                if table.num_rows < row_count {
                    return Err(ReaderError::Materialize(format!(
                        "leaf '{path}' holds {} rows, {row_count} requested",
                        table.num_rows
                    )));
                }
                leaves.insert(leaf, LeafIndex::build(table));
            }
        }
        Ok(Self {
            schema,
            binding,
            leaves,
        })
    }

    /// Appends rows `range` to `out` in row order.
    pub fn assemble<T: Record>(&self, range: Range<usize>, out: &mut Vec<T>) -> Result<()> {
        if range.is_empty() {
            return Ok(());
        }
        let mut readers = self
            .binding
            .columns
            .iter()
            .map(|&p| Ok((self.schema.element(p).name.clone(), self.build(p, &range)?)))
            .collect::<Result<Vec<_>>>()?;

        for _ in range.clone() {
            let mut fields = Vec::with_capacity(readers.len());
            for (name, reader) in readers.iter_mut() {
                fields.push((name.clone(), reader.read_field()?));
            }
            out.push(T::from_row(Row::new(fields))?);
        }

        for (name, reader) in &readers {
            if !reader.exhausted() {
                return Err(ReaderError::Materialize(format!(
                    "level data for '{name}' does not end at row {}",
                    range.end
                )));
            }
        }
        Ok(())
    }

    fn build(&self, position: usize, range: &Range<usize>) -> Result<FieldReader<'t>> {
        let node = self.schema.node(position);
        let inner = Box::new(self.build_base(position, range)?);
        Ok(match self.schema.element(position).repetition() {
            Repetition::Required => *inner,
            Repetition::Optional => FieldReader::Optional {
                def_level: node.max_def_level - 1,
                inner,
            },
            Repetition::Repeated => FieldReader::Repeated {
                def_level: node.max_def_level - 1,
                rep_level: node.max_rep_level - 1,
                inner,
            },
        })
    }

    fn build_base(&self, position: usize, range: &Range<usize>) -> Result<FieldReader<'t>> {
        let element = self.schema.element(position);
        if self.schema.is_leaf(position) {
            let index = self.leaves.get(&position).ok_or_else(|| {
                ReaderError::Materialize(format!("leaf '{}' was not indexed", element.name))
            })?;
            return Ok(FieldReader::Leaf(LeafCursor {
                table: index.table,
                slot: index.row_starts[range.start],
                end: index.row_starts[range.end],
                value: index.value_offsets[range.start],
                is_string: element.is_string(),
            }));
        }

        let children = self.schema.children(position);
        if let Some(list) = self.list_reader(position, children, range)? {
            return Ok(list);
        }
        let names = children
            .iter()
            .map(|&c| self.schema.element(c).name.clone())
            .collect();
        let children = children
            .iter()
            .map(|&c| self.build(c, range))
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldReader::Group { names, children })
    }

    /// LIST-annotated groups collapse into a plain list of their elements:
    /// `group (LIST) { repeated group list { element } }`, or the two-level
    /// form where the repeated child is itself the element.
    fn list_reader(
        &self,
        position: usize,
        children: &[usize],
        range: &Range<usize>,
    ) -> Result<Option<FieldReader<'t>>> {
        let [repeated] = children else {
            return Ok(None);
        };
        let repeated = *repeated;
        if !self.schema.element(position).is_list()
            || self.schema.element(repeated).repetition() != Repetition::Repeated
        {
            return Ok(None);
        }
        let node = self.schema.node(repeated);
        let grandchildren = self.schema.children(repeated);
        let inner = match grandchildren {
            [element] if !self.schema.is_leaf(repeated) => self.build(*element, range)?,
            _ => self.build_base(repeated, range)?,
        };
        Ok(Some(FieldReader::Repeated {
            def_level: node.max_def_level - 1,
            rep_level: node.max_rep_level - 1,
            inner: Box::new(inner),
        }))
    }
}

struct LeafCursor<'t> {
    table: &'t ColumnTable,
    slot: usize,
    end: usize,
    value: usize,
    is_string: bool,
}

impl LeafCursor<'_> {
    fn has_next(&self) -> bool {
        self.slot < self.end
    }

    fn check(&self) -> Result<()> {
        if !self.has_next() {
            return Err(ReaderError::Materialize(format!(
                "level data for '{}' ended early",
                self.table.path
            )));
        }
        Ok(())
    }

    fn def(&self) -> Result<i16> {
        self.check()?;
        Ok(self.table.def_levels[self.slot])
    }

    fn rep(&self) -> Result<i16> {
        self.check()?;
        Ok(self.table.rep_levels[self.slot])
    }

    fn advance(&mut self) -> Result<()> {
        if self.def()? == self.table.max_def_level {
            self.value += 1;
        }
        self.slot += 1;
        Ok(())
    }

    fn read(&mut self) -> Result<Field> {
        let def = self.def()?;
        if def != self.table.max_def_level {
            return Err(ReaderError::Materialize(format!(
                "'{}' has definition level {def} where a value is required",
                self.table.path
            )));
        }
        let value = self.table.values.get(self.value).ok_or_else(|| {
            ReaderError::Materialize(format!("'{}' ran out of values", self.table.path))
        })?;
        let field = match value {
            Value::Boolean(v) => Field::Bool(*v),
            Value::Int32(v) => Field::Int(*v),
            Value::Int64(v) => Field::Long(*v),
            Value::Int96(v) => Field::Int96(*v),
            Value::Float(v) => Field::Float(*v),
            Value::Double(v) => Field::Double(*v),
            Value::ByteArray(b) if self.is_string => Field::Str(
                std::str::from_utf8(b)
                    .map_err(|e| {
                        ReaderError::Materialize(format!(
                            "'{}' holds invalid UTF-8: {e}",
                            self.table.path
                        ))
                    })?
                    .to_string(),
            ),
            Value::ByteArray(b) => Field::Bytes(b.clone()),
        };
        self.value += 1;
        self.slot += 1;
        Ok(field)
    }
}

enum FieldReader<'t> {
    Leaf(LeafCursor<'t>),
    Optional {
        def_level: i16,
        inner: Box<FieldReader<'t>>,
    },
    Repeated {
        def_level: i16,
        rep_level: i16,
        inner: Box<FieldReader<'t>>,
    },
    Group {
        names: Vec<String>,
        children: Vec<FieldReader<'t>>,
    },
}

impl FieldReader<'_> {
    // Every leaf below a node shares its levels up to the node's depth, so
    // the first leaf speaks for the whole group.
    fn first_leaf(&self) -> &LeafCursor<'_> {
        let mut reader = self;
        loop {
            match reader {
                FieldReader::Leaf(cursor) => return cursor,
                FieldReader::Optional { inner, .. } | FieldReader::Repeated { inner, .. } => {
                    reader = &**inner
                }
                FieldReader::Group { children, .. } => reader = &children[0],
            }
        }
    }

    fn current_def(&self) -> Result<i16> {
        self.first_leaf().def()
    }

    fn current_rep(&self) -> Result<i16> {
        self.first_leaf().rep()
    }

    fn has_next(&self) -> bool {
        self.first_leaf().has_next()
    }

    fn exhausted(&self) -> bool {
        match self {
            FieldReader::Leaf(cursor) => !cursor.has_next(),
            FieldReader::Optional { inner, .. } | FieldReader::Repeated { inner, .. } => {
                inner.exhausted()
            }
            FieldReader::Group { children, .. } => children.iter().all(|c| c.exhausted()),
        }
    }

    /// Skips one level slot in every leaf below this node.
    fn advance(&mut self) -> Result<()> {
        match self {
            FieldReader::Leaf(cursor) => cursor.advance(),
            FieldReader::Optional { inner, .. } | FieldReader::Repeated { inner, .. } => {
                inner.advance()
            }
            FieldReader::Group { children, .. } => {
                children.iter_mut().try_for_each(|c| c.advance())
            }
        }
    }

    fn read_field(&mut self) -> Result<Field> {
        match self {
            FieldReader::Leaf(cursor) => cursor.read(),
            FieldReader::Optional { def_level, inner } => {
                if inner.current_def()? > *def_level {
                    inner.read_field()
                } else {
                    inner.advance()?;
                    Ok(Field::Null)
                }
            }
            FieldReader::Repeated {
                def_level,
                rep_level,
                inner,
            } => {
                let mut items = Vec::new();
                loop {
                    if inner.current_def()? > *def_level {
                        items.push(inner.read_field()?);
                    } else {
                        inner.advance()?;
                        break;
                    }
                    if !inner.has_next() || inner.current_rep()? <= *rep_level {
                        break;
                    }
                }
                Ok(Field::List(items))
            }
            FieldReader::Group { names, children } => {
                let mut fields = Vec::with_capacity(children.len());
                for (name, child) in names.iter().zip(children.iter_mut()) {
                    fields.push((name.clone(), child.read_field()?));
                }
                Ok(Field::Group(Row::new(fields)))
            }
        }
    }
}
