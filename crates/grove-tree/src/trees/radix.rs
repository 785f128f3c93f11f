//! Byte-radix tree for long shared-prefix key spaces.
//!
//! Each node fans out per key byte. Traversal in byte order yields keys in
//! lexicographic order, so grid views paginate exactly like [`OrderedTree`]
//! without materializing a sorted map.
//!
//! [`OrderedTree`]: crate::trees::OrderedTree

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use grove_schema::{Layout, Tab};
use grove_types::{KeyCursor, OpCode, OpResult};

use crate::event::{EventFilter, EventStream, SeedEvent, SeedEventKind};
use crate::grid::{GridViewRequest, GridViewResult};
use crate::op::{grid_over, require_key, PodCell, PodHandle, Tree, TreeCore, TreeOp};

#[derive(Default)]
struct RadixNode {
    children: BTreeMap<u8, RadixNode>,
    pod: Option<Arc<PodCell>>,
}

impl RadixNode {
    fn find(&self, key: &[u8]) -> Option<&Arc<PodCell>> {
        match key.split_first() {
            None => self.pod.as_ref(),
            Some((b, rest)) => self.children.get(b)?.find(rest),
        }
    }

    fn insert(&mut self, key: &[u8]) -> (Arc<PodCell>, bool) {
        match key.split_first() {
            None => match &self.pod {
                Some(cell) => (cell.clone(), true),
                None => {
                    let cell = PodCell::new();
                    self.pod = Some(cell.clone());
                    (cell, false)
                }
            },
            Some((b, rest)) => self.children.entry(*b).or_default().insert(rest),
        }
    }

    /// Removes the pod at `key`. Returns (removed, subtree now empty).
    fn remove(&mut self, key: &[u8]) -> (bool, bool) {
        match key.split_first() {
            None => {
                let removed = self.pod.take().is_some();
                (removed, self.children.is_empty())
            }
            Some((b, rest)) => {
                let Some(child) = self.children.get_mut(b) else {
                    return (false, false);
                };
                let (removed, prune) = child.remove(rest);
                if prune {
                    self.children.remove(b);
                }
                (removed, self.pod.is_none() && self.children.is_empty())
            }
        }
    }

    fn collect(&self, path: &mut Vec<u8>, out: &mut Vec<(String, Arc<PodCell>)>) {
        if let Some(cell) = &self.pod {
            out.push((String::from_utf8_lossy(path).into_owned(), cell.clone()));
        }
        for (b, child) in &self.children {
            path.push(*b);
            child.collect(path, out);
            path.pop();
        }
    }

    fn count(&self) -> usize {
        usize::from(self.pod.is_some()) + self.children.values().map(RadixNode::count).sum::<usize>()
    }
}

pub struct RadixTree {
    core: Arc<TreeCore>,
    root: RwLock<RadixNode>,
}

impl RadixTree {
    pub fn new(layout: Arc<Layout>) -> Self {
        RadixTree {
            core: TreeCore::new(layout),
            root: RwLock::new(RadixNode::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.root.read().expect("tree lock poisoned").count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<(String, Arc<PodCell>)> {
        let mut out = Vec::new();
        self.root
            .read()
            .expect("tree lock poisoned")
            .collect(&mut Vec::new(), &mut out);
        out
    }
}

impl Tree for RadixTree {
    fn layout(&self) -> &Arc<Layout> {
        &self.core.layout
    }

    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>) {
        let mut op = RadixOp { tree: self };
        f(Ok(&mut op));
    }
}

struct RadixOp<'t> {
    tree: &'t RadixTree,
}

impl TreeOp for RadixOp<'_> {
    fn get(&mut self, key: &str) -> OpResult<PodHandle> {
        let cell = self
            .tree
            .root
            .read()
            .expect("tree lock poisoned")
            .find(key.as_bytes())
            .cloned();
        match cell {
            Some(cell) => Ok(PodHandle::new(key.to_string(), true, cell, self.tree.core.clone())),
            None => Err(OpCode::NotFoundKey.into()),
        }
    }

    fn add(&mut self, key: &KeyCursor) -> OpResult<PodHandle> {
        let key = require_key(key)?;
        self.tree.core.layout.key().validate(key)?;
        let (cell, existed) = self
            .tree
            .root
            .write()
            .expect("tree lock poisoned")
            .insert(key.as_bytes());
        Ok(PodHandle::new(key.to_string(), existed, cell, self.tree.core.clone()))
    }

    fn remove(&mut self, key: &str, tab: Option<&Tab>) -> OpResult<OpCode> {
        if tab.is_some() {
            return Err(OpCode::UnsupportedRemoveSeed.into());
        }
        let (removed, _) = self
            .tree
            .root
            .write()
            .expect("tree lock poisoned")
            .remove(key.as_bytes());
        if !removed {
            return Err(OpCode::NotFoundKey.into());
        }
        self.tree.core.hub.publish(&SeedEvent {
            key: key.to_string(),
            tab: None,
            kind: SeedEventKind::PodRemoved,
        });
        Ok(OpCode::RemovedPod)
    }

    fn grid_view(&mut self, req: &GridViewRequest) -> OpResult<GridViewResult> {
        let rows = self.tree.snapshot();
        let start = match &req.start {
            KeyCursor::Begin => 0,
            KeyCursor::End => rows.len(),
            KeyCursor::Key(k) => rows.partition_point(|(key, _)| key.as_str() < k.as_str()),
        };
        grid_over(&self.tree.core, &rows, start, req)
    }

    fn subscribe(&mut self, filter: EventFilter) -> OpResult<EventStream> {
        Ok(self.tree.core.hub.subscribe(filter, 64))
    }
}
