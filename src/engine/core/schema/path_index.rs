use std::collections::HashMap;

use crate::engine::core::metadata::{Repetition, SchemaElement};
use crate::engine::errors::{ReaderError, Result};

pub const PATH_DELIMITER: char = '.';

/// Tree position of one schema element, derived from the flat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaNode {
    /// Dotted path from the root; the root itself has the empty path.
    pub path: String,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub max_def_level: i16,
    pub max_rep_level: i16,
}

/// Read-only view mapping schema positions to paths and back.
///
/// Invariant: every leaf (`num_children == 0`) has exactly one path and leaf
/// paths are unique.
#[derive(Debug, Clone)]
pub struct SchemaPathIndex {
    elements: Vec<SchemaElement>,
    nodes: Vec<SchemaNode>,
    index_by_path: HashMap<String, usize>,
    leaves: Vec<usize>,
}

struct Frame {
    position: usize,
    remaining: usize,
}

impl SchemaPathIndex {
    /// Rebuilds the tree from the pre-order list: each internal node pushes a
    /// frame counting down its declared children.
    pub fn build(elements: &[SchemaElement]) -> Result<Self> {
        let root = elements
            .first()
            .ok_or_else(|| ReaderError::CorruptSchema("schema has no elements".into()))?;
        let root_children = declared_children(root, 0, elements.len())?;
        if root_children == 0 {
            return Err(ReaderError::CorruptSchema(format!(
                "root '{}' has no children",
                root.name
            )));
        }

        let mut nodes = Vec::with_capacity(elements.len());
        nodes.push(SchemaNode {
            path: String::new(),
            parent: None,
            children: Vec::with_capacity(root_children),
            max_def_level: 0,
            max_rep_level: 0,
        });
        let mut index_by_path = HashMap::with_capacity(elements.len());
        index_by_path.insert(String::new(), 0);
        let mut leaves = Vec::new();
        let mut stack = vec![Frame {
            position: 0,
            remaining: root_children,
        }];

        for (i, element) in elements.iter().enumerate().skip(1) {
            while stack.last().is_some_and(|f| f.remaining == 0) {
                stack.pop();
            }
            let frame = stack.last_mut().ok_or_else(|| {
                ReaderError::CorruptSchema(format!(
                    "element {i} ('{}') lies outside the root's declared children",
                    element.name
                ))
            })?;
            frame.remaining -= 1;
            let parent = frame.position;

            let parent_node = &nodes[parent];
            let path = if parent_node.path.is_empty() {
                element.name.clone()
            } else {
                format!("{}{}{}", parent_node.path, PATH_DELIMITER, element.name)
            };
            let (def_step, rep_step) = match element.repetition() {
                Repetition::Required => (0, 0),
                Repetition::Optional => (1, 0),
                Repetition::Repeated => (1, 1),
            };
            let max_def_level = parent_node.max_def_level + def_step;
            let max_rep_level = parent_node.max_rep_level + rep_step;

            let children = declared_children(element, i, elements.len())?;
            if children == 0 {
                if element.physical_type.is_none() {
                    return Err(ReaderError::CorruptSchema(format!(
                        "leaf '{path}' has no physical type"
                    )));
                }
                leaves.push(i);
            } else {
                stack.push(Frame {
                    position: i,
                    remaining: children,
                });
            }

            if index_by_path.insert(path.clone(), i).is_some() {
                return Err(ReaderError::CorruptSchema(format!("duplicate path '{path}'")));
            }
            nodes[parent].children.push(i);
            nodes.push(SchemaNode {
                path,
                parent: Some(parent),
                children: Vec::with_capacity(children),
                max_def_level,
                max_rep_level,
            });
        }

        if stack.iter().any(|f| f.remaining > 0) {
            return Err(ReaderError::CorruptSchema(
                "declared child counts exceed the number of elements".into(),
            ));
        }

        Ok(Self {
            elements: elements.to_vec(),
            nodes,
            index_by_path,
            leaves,
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn root_name(&self) -> &str {
        &self.elements[0].name
    }

    /// Leaf paths in schema order.
    pub fn leaf_paths(&self) -> Vec<&str> {
        self.leaves
            .iter()
            .map(|&i| self.nodes[i].path.as_str())
            .collect()
    }

    pub fn leaf_positions(&self) -> &[usize] {
        &self.leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.index_by_path.get(path).copied()
    }

    /// Ordinal of a leaf among all leaves, as used by row-group column lists.
    pub fn leaf_ordinal(&self, path: &str) -> Option<usize> {
        let pos = self.index_of(path)?;
        self.leaves.iter().position(|&l| l == pos)
    }

    pub fn path_of(&self, position: usize) -> Option<&str> {
        self.nodes.get(position).map(|n| n.path.as_str())
    }

    pub fn element(&self, position: usize) -> &SchemaElement {
        &self.elements[position]
    }

    pub fn node(&self, position: usize) -> &SchemaNode {
        &self.nodes[position]
    }

    pub fn children(&self, position: usize) -> &[usize] {
        &self.nodes[position].children
    }

    pub fn is_leaf(&self, position: usize) -> bool {
        self.nodes[position].children.is_empty() && position != 0
    }

    /// Leaf positions at or below `position`, in schema order.
    pub fn leaves_under(&self, position: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut pending = vec![position];
        while let Some(p) = pending.pop() {
            if self.is_leaf(p) {
                out.push(p);
            } else {
                pending.extend(self.nodes[p].children.iter().rev());
            }
        }
        out
    }
}

fn declared_children(element: &SchemaElement, position: usize, total: usize) -> Result<usize> {
    let n = element.child_count();
    let n = usize::try_from(n).map_err(|_| {
        ReaderError::CorruptSchema(format!(
            "element {position} ('{}') has negative child count {n}",
            element.name
        ))
    })?;
    if n > total - position - 1 {
        return Err(ReaderError::CorruptSchema(format!(
            "element {position} ('{}') declares {n} children but only {} elements follow",
            element.name,
            total - position - 1
        )));
    }
    Ok(n)
}
