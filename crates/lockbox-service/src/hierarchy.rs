//! Parent-pointer tree walks shared by folders and groups.
//!
//! A [`Hierarchy`] is an adjacency index built once from a flat row set.
//! Every walk is iterative and tracks visited ids, so corrupted data with a
//! cycle surfaces as an internal error instead of a hang.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use lockbox_core::error::AppError;
use lockbox_core::result::AppResult;
use lockbox_entity::TreeRow;

/// Nesting deeper than this is treated as corrupted data.
pub const MAX_DEPTH: usize = 256;

/// Adjacency index over rows that point at their parent.
#[derive(Debug, Clone)]
pub struct Hierarchy<T: TreeRow> {
    rows: HashMap<String, T>,
    /// Child ids per parent id, ordered by label.
    children: HashMap<String, Vec<String>>,
}

impl<T: TreeRow> Hierarchy<T> {
    /// Index a flat row set.
    pub fn new(rows: Vec<T>) -> Self {
        let mut sorted = rows;
        sorted.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.id().cmp(b.id())));

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for row in &sorted {
            if let Some(parent) = row.parent_id() {
                children
                    .entry(parent.to_string())
                    .or_default()
                    .push(row.id().to_string());
            }
        }

        let rows = sorted
            .into_iter()
            .map(|row| (row.id().to_string(), row))
            .collect();
        Self { rows, children }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the index holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.rows.contains_key(id)
    }

    /// Row by id.
    pub fn get(&self, id: &str) -> Option<&T> {
        self.rows.get(id)
    }

    /// Every row, ordered by label.
    pub fn rows(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self.rows.values().collect();
        rows.sort_by(|a, b| a.label().cmp(b.label()).then_with(|| a.id().cmp(b.id())));
        rows
    }

    /// The immediate parent of `id`.
    pub fn parent(&self, id: &str) -> Option<&T> {
        self.rows
            .get(id)
            .and_then(|row| row.parent_id())
            .and_then(|parent| self.rows.get(parent))
    }

    /// Ancestors of `id`, nearest first and ending at the root. With
    /// `include_self` the row itself comes first.
    ///
    /// A parent id that does not resolve ends the walk as if the root had
    /// been reached.
    pub fn parents(&self, id: &str, include_self: bool) -> AppResult<Vec<T>> {
        let start = self
            .rows
            .get(id)
            .ok_or_else(|| AppError::not_found(format!("'{id}' not found")))?;

        let mut chain = Vec::new();
        if include_self {
            chain.push(start.clone());
        }

        let mut seen = HashSet::from([start.id()]);
        let mut current = start;
        while let Some(parent_id) = current.parent_id() {
            if !seen.insert(parent_id) {
                return Err(AppError::internal(format!(
                    "Cycle detected in hierarchy at '{parent_id}'"
                )));
            }
            let Some(parent) = self.rows.get(parent_id) else {
                warn!(id = %current.id(), parent_id, "Dangling parent reference, stopping walk");
                break;
            };
            chain.push(parent.clone());
            current = parent;
        }

        Ok(chain)
    }

    /// Every descendant of `id`, breadth first. Rows without a parent (the
    /// root) are never returned.
    pub fn children(&self, id: &str) -> Vec<T> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);

        while let Some(current) = queue.pop_front() {
            let Some(ids) = self.children.get(&current) else {
                continue;
            };
            for child_id in ids {
                if !seen.insert(child_id.clone()) {
                    continue;
                }
                if let Some(child) = self.rows.get(child_id)
                    && child.parent_id().is_some()
                {
                    out.push(child.clone());
                    queue.push_back(child_id.clone());
                }
            }
        }

        out
    }

    /// Whether `id` is `ancestor` or lies beneath it.
    pub fn is_within(&self, id: &str, ancestor: &str) -> AppResult<bool> {
        Ok(self
            .parents(id, true)?
            .iter()
            .any(|row| row.id() == ancestor))
    }

    /// Rebuild the rows named in `visible` as nested nodes ordered by label.
    ///
    /// A visible row whose parent is not visible becomes a top-level node.
    pub fn nest<N>(
        &self,
        visible: &HashSet<String>,
        build: &dyn Fn(&T, Vec<N>) -> N,
    ) -> AppResult<Vec<N>> {
        let mut roots = Vec::new();
        for row in self.rows() {
            if !visible.contains(row.id()) {
                continue;
            }
            let parent_visible = row.parent_id().is_some_and(|p| visible.contains(p));
            if !parent_visible {
                roots.push(self.nest_node(row, visible, build, 0)?);
            }
        }
        Ok(roots)
    }

    fn nest_node<N>(
        &self,
        row: &T,
        visible: &HashSet<String>,
        build: &dyn Fn(&T, Vec<N>) -> N,
        depth: usize,
    ) -> AppResult<N> {
        if depth > MAX_DEPTH {
            return Err(AppError::internal(format!(
                "Hierarchy deeper than {MAX_DEPTH} levels at '{}'",
                row.id()
            )));
        }

        let mut nested = Vec::new();
        for child_id in self.children.get(row.id()).into_iter().flatten() {
            if !visible.contains(child_id) {
                continue;
            }
            if let Some(child) = self.rows.get(child_id) {
                nested.push(self.nest_node(child, visible, build, depth + 1)?);
            }
        }
        Ok(build(row, nested))
    }
}
