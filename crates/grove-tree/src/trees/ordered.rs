//! Key-ordered tree over a `BTreeMap`, the workhorse container.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use grove_schema::Layout;
use grove_types::{KeyCursor, OpCode, OpResult};

use crate::event::{EventFilter, EventStream, SeedEvent, SeedEventKind};
use crate::grid::{GridViewRequest, GridViewResult};
use crate::op::{
    grid_over, require_key, CommandFn, PodCell, PodHandle, SaplingFactory, Tree, TreeCore, TreeOp,
};

pub struct OrderedTree {
    core: Arc<TreeCore>,
    pods: RwLock<BTreeMap<String, Arc<PodCell>>>,
}

impl OrderedTree {
    pub fn new(layout: Arc<Layout>) -> Self {
        OrderedTree {
            core: TreeCore::new(layout),
            pods: RwLock::new(BTreeMap::new()),
        }
    }

    /// Construct with a seed-command hook and/or a sapling factory.
    pub fn with_hooks(
        layout: Arc<Layout>,
        command: Option<CommandFn>,
        sapling_factory: Option<SaplingFactory>,
    ) -> Self {
        OrderedTree {
            core: TreeCore::with_hooks(layout, command, sapling_factory),
            pods: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.pods.read().expect("tree lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Key-ordered snapshot of the container, cheap Arc clones per pod.
    fn snapshot(&self) -> Vec<(String, Arc<PodCell>)> {
        self.pods
            .read()
            .expect("tree lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl Tree for OrderedTree {
    fn layout(&self) -> &Arc<Layout> {
        &self.core.layout
    }

    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>) {
        let mut op = OrderedOp { tree: self };
        f(Ok(&mut op));
    }
}

struct OrderedOp<'t> {
    tree: &'t OrderedTree,
}

impl TreeOp for OrderedOp<'_> {
    fn get(&mut self, key: &str) -> OpResult<PodHandle> {
        let cell = self
            .tree
            .pods
            .read()
            .expect("tree lock poisoned")
            .get(key)
            .cloned();
        match cell {
            Some(cell) => Ok(PodHandle::new(key.to_string(), true, cell, self.tree.core.clone())),
            None => Err(OpCode::NotFoundKey.into()),
        }
    }

    fn add(&mut self, key: &KeyCursor) -> OpResult<PodHandle> {
        let key = require_key(key)?;
        self.tree.core.layout.key().validate(key)?;
        let mut pods = self.tree.pods.write().expect("tree lock poisoned");
        let existed = pods.contains_key(key);
        let cell = pods
            .entry(key.to_string())
            .or_insert_with(PodCell::new)
            .clone();
        drop(pods);
        Ok(PodHandle::new(key.to_string(), existed, cell, self.tree.core.clone()))
    }

    fn remove(&mut self, key: &str, tab: Option<&grove_schema::Tab>) -> OpResult<OpCode> {
        if tab.is_some() {
            return Err(OpCode::UnsupportedRemoveSeed.into());
        }
        let removed = self
            .tree
            .pods
            .write()
            .expect("tree lock poisoned")
            .remove(key)
            .is_some();
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
