//! Hash-keyed tree for lookup-heavy containers.
//!
//! Grid views sort a key snapshot first so pagination stays stable; point
//! lookups avoid the ordering cost entirely.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use grove_schema::{Layout, Tab};
use grove_types::{KeyCursor, OpCode, OpResult};

use crate::event::{EventFilter, EventStream, SeedEvent, SeedEventKind};
use crate::grid::{GridViewRequest, GridViewResult};
use crate::op::{
    grid_over, require_key, CommandFn, PodCell, PodHandle, SaplingFactory, Tree, TreeCore, TreeOp,
};

pub struct HashTree {
    core: Arc<TreeCore>,
    pods: RwLock<HashMap<String, Arc<PodCell>>>,
}

impl HashTree {
    pub fn new(layout: Arc<Layout>) -> Self {
        HashTree {
            core: TreeCore::new(layout),
            pods: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_hooks(
        layout: Arc<Layout>,
        command: Option<CommandFn>,
        sapling_factory: Option<SaplingFactory>,
    ) -> Self {
        HashTree {
            core: TreeCore::with_hooks(layout, command, sapling_factory),
            pods: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.pods.read().expect("tree lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sorted_snapshot(&self) -> Vec<(String, Arc<PodCell>)> {
        let mut rows: Vec<_> = self
            .pods
            .read()
            .expect("tree lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }
}

impl Tree for HashTree {
    fn layout(&self) -> &Arc<Layout> {
        &self.core.layout
    }

    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>) {
        let mut op = HashOp { tree: self };
        f(Ok(&mut op));
    }
}

struct HashOp<'t> {
    tree: &'t HashTree,
}

impl TreeOp for HashOp<'_> {
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

    fn remove(&mut self, key: &str, tab: Option<&Tab>) -> OpResult<OpCode> {
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
        let rows = self.tree.sorted_snapshot();
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::run_op;
    use grove_field::FieldDef;
    use grove_schema::{KeyDef, TabFlags};
    use grove_types::Name;

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn tree() -> HashTree {
        let tab = Tab::build(
            name("Base"),
            vec![FieldDef::chars(name("Nm"), 16)],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();
        HashTree::new(Layout::single(KeyDef::chars(name("Id")), tab).unwrap())
    }

    #[test]
    fn grid_is_key_sorted_despite_hash_storage() {
        let t = tree();
        for k in ["zz", "aa", "mm"] {
            run_op(&t, |op| op.add(&KeyCursor::Key(k.into()))).unwrap();
        }
        let res = run_op(&t, |op| op.grid_view(&GridViewRequest::from_begin(0))).unwrap();
        let keys: Vec<_> = res.grid.lines().map(|l| l.split('\t').next().unwrap()).collect();
        assert_eq!(keys, vec!["aa", "mm", "zz"]);
    }

    #[test]
    fn lookup_and_remove() {
        let t = tree();
        run_op(&t, |op| op.add(&KeyCursor::Key("aa".into()))).unwrap();
        assert!(run_op(&t, |op| op.get("aa")).is_ok());
        assert_eq!(run_op(&t, |op| op.remove("aa", None)).unwrap(), OpCode::RemovedPod);
        assert!(t.is_empty());
    }
}
