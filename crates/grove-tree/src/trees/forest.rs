//! The named management tree that forms a forest root.
//!
//! Each entry is a named seed carrying a title and description, with the
//! mounted tree hung off the entry's sapling slot. Sessions navigate the
//! whole store by walking saplings down from one of these roots.

use std::sync::Arc;

use grove_field::{FieldDef, OverflowPolicy};
use grove_schema::{KeyDef, Layout, Tab, TabFlags};
use grove_types::{KeyCursor, Name, OpCode, OpError, OpResult};

use crate::op::{run_op, PodHandle, Tree, TreeOp, TreeRef};
use crate::trees::OrderedTree;

/// Layout shared by every forest root: entry name key, one tab with title
/// and description text plus a sapling slot.
pub fn forest_layout() -> Arc<Layout> {
    let name = |s: &str| Name::new(s).expect("static name is valid");
    let tab = Tab::build(
        name("Entry"),
        vec![
            FieldDef::chars(name("Title"), 64),
            FieldDef::chars(name("Description"), 128),
        ],
        TabFlags {
            writable: true,
            has_sapling: true,
            ..TabFlags::default()
        },
        None,
    )
    .expect("static forest tab is valid");
    Layout::single(KeyDef::chars(name("Name")), tab).expect("static forest layout is valid")
}

pub struct ForestTree {
    inner: OrderedTree,
}

impl Default for ForestTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ForestTree {
    pub fn new() -> Self {
        ForestTree {
            inner: OrderedTree::new(forest_layout()),
        }
    }

    /// Mount `tree` under a new named entry. Duplicate names are rejected;
    /// remounting requires an `uproot` first.
    pub fn plant(&self, entry: &str, title: &str, tree: TreeRef) -> OpResult<PodHandle> {
        run_op(&self.inner, |op| {
            let pod = op.add(&KeyCursor::Key(entry.to_string()))?;
            if pod.existed() {
                return Err(OpError::with_message(
                    OpCode::KeyExists,
                    format!("forest entry {entry:?} already planted"),
                ));
            }
            let tab = self.inner.layout().first_tab();
            let title_field = tab.field("Title").ok_or(OpCode::NotFoundField)?;
            pod.write(&tab, |rec| title_field.parse(rec, title, OverflowPolicy::Ignore))?;
            pod.cell().set_sapling(tab.index(), tree);
            Ok(pod)
        })
    }

    /// The tree mounted under `entry`.
    pub fn find(&self, entry: &str) -> OpResult<TreeRef> {
        run_op(&self.inner, |op| {
            let pod = op.get(entry)?;
            pod.sapling(&self.inner.layout().first_tab())
        })
    }

    /// Unmount and drop the entry.
    pub fn uproot(&self, entry: &str) -> OpResult<OpCode> {
        run_op(&self.inner, |op| op.remove(entry, None))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Tree for ForestTree {
    fn layout(&self) -> &Arc<Layout> {
        self.inner.layout()
    }

    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>) {
        self.inner.with_op(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridViewRequest;
    use grove_schema::Record;

    fn symb_tree() -> TreeRef {
        let name = |s: &str| Name::new(s).unwrap();
        let tab = Tab::build(
            name("Base"),
            vec![FieldDef::int_signed(name("Qty"), 4)],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();
        Arc::new(OrderedTree::new(
            Layout::single(KeyDef::chars(name("SymbId")), tab).unwrap(),
        ))
    }

    #[test]
    fn plant_find_uproot() {
        let forest = ForestTree::new();
        forest.plant("Symbs", "symbol master", symb_tree()).unwrap();
        assert_eq!(forest.len(), 1);

        let mounted = forest.find("Symbs").unwrap();
        assert_eq!(mounted.layout().key().name.as_str(), "SymbId");

        let dup = forest.plant("Symbs", "again", symb_tree()).unwrap_err();
        assert_eq!(dup.code, OpCode::KeyExists);

        assert_eq!(forest.uproot("Symbs").unwrap(), OpCode::RemovedPod);
        assert_eq!(
            forest.find("Symbs").map(|_| ()).unwrap_err().code,
            OpCode::NotFoundKey
        );
    }

    #[test]
    fn entries_render_in_grid() {
        let forest = ForestTree::new();
        forest.plant("Symbs", "symbol master", symb_tree()).unwrap();
        forest.plant("Acct", "accounts", symb_tree()).unwrap();
        let res = run_op(&forest, |op| op.grid_view(&GridViewRequest::from_begin(0))).unwrap();
        assert_eq!(
            res.grid,
            "Acct\taccounts\t\nSymbs\tsymbol master\t"
        );
    }

    #[test]
    fn entry_title_readable_through_pod() {
        let forest = ForestTree::new();
        let pod = forest.plant("Symbs", "symbol master", symb_tree()).unwrap();
        let tab = forest.layout().first_tab();
        let title = pod
            .read(&tab, |rec: &Record| tab.field("Title").unwrap().render(rec, None))
            .unwrap();
        assert_eq!(title, "symbol master");
    }
}
