//! Dense index-keyed tree backed by a `Vec`.
//!
//! Keys are decimal indices. `add` with [`KeyCursor::End`] appends, so
//! producers can grow the array without knowing its size. Pods are never
//! removed; indices stay stable for the tree's lifetime.

use std::sync::{Arc, RwLock};

use grove_schema::{Layout, Tab};
use grove_types::{KeyCursor, OpCode, OpError, OpResult};

use crate::event::{EventFilter, EventStream};
use crate::grid::{GridViewRequest, GridViewResult};
use crate::op::{grid_over, PodCell, PodHandle, Tree, TreeCore, TreeOp};

pub struct ArrayTree {
    core: Arc<TreeCore>,
    pods: RwLock<Vec<Arc<PodCell>>>,
}

fn parse_index(key: &str) -> OpResult<usize> {
    key.parse::<usize>().map_err(|_| {
        OpError::with_message(OpCode::KeyFormat, format!("key {key:?} is not an index"))
    })
}

impl ArrayTree {
    pub fn new(layout: Arc<Layout>) -> Self {
        ArrayTree {
            core: TreeCore::new(layout),
            pods: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.pods.read().expect("tree lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<(String, Arc<PodCell>)> {
        self.pods
            .read()
            .expect("tree lock poisoned")
            .iter()
            .enumerate()
            .map(|(i, cell)| (i.to_string(), cell.clone()))
            .collect()
    }
}

impl Tree for ArrayTree {
    fn layout(&self) -> &Arc<Layout> {
        &self.core.layout
    }

    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>) {
        let mut op = ArrayOp { tree: self };
        f(Ok(&mut op));
    }
}

struct ArrayOp<'t> {
    tree: &'t ArrayTree,
}

impl TreeOp for ArrayOp<'_> {
    fn get(&mut self, key: &str) -> OpResult<PodHandle> {
        let index = parse_index(key)?;
        let cell = self
            .tree
            .pods
            .read()
            .expect("tree lock poisoned")
            .get(index)
            .cloned();
        match cell {
            Some(cell) => Ok(PodHandle::new(key.to_string(), true, cell, self.tree.core.clone())),
            None => Err(OpCode::NotFoundKey.into()),
        }
    }

    fn add(&mut self, key: &KeyCursor) -> OpResult<PodHandle> {
        let mut pods = self.tree.pods.write().expect("tree lock poisoned");
        let index = match key {
            KeyCursor::Begin => 0,
            KeyCursor::End => pods.len(),
            KeyCursor::Key(k) => {
                let i = parse_index(k)?;
                if i > pods.len() {
                    return Err(OpError::with_message(
                        OpCode::KeyFormat,
                        format!("index {i} is past the append point {}", pods.len()),
                    ));
                }
                i
            }
        };
        let existed = index < pods.len();
        if !existed {
            pods.push(PodCell::new());
        }
        let cell = pods[index].clone();
        drop(pods);
        Ok(PodHandle::new(index.to_string(), existed, cell, self.tree.core.clone()))
    }

    fn remove(&mut self, _key: &str, _tab: Option<&Tab>) -> OpResult<OpCode> {
        Err(OpCode::UnsupportedRemovePod.into())
    }

    fn grid_view(&mut self, req: &GridViewRequest) -> OpResult<GridViewResult> {
        let rows = self.tree.snapshot();
        let start = match &req.start {
            KeyCursor::Begin => 0,
            KeyCursor::End => rows.len(),
            KeyCursor::Key(k) => parse_index(k)?.min(rows.len()),
        };
        grid_over(&self.tree.core, &rows, start, req)
    }

    fn subscribe(&mut self, filter: EventFilter) -> OpResult<EventStream> {
        Ok(self.tree.core.hub.subscribe(filter, 64))
    }
}
