//! Edit sessions and the submit check.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use grove_tree::{load_grid, save_grid, OrderedTree, Tree, TreeRef};
use grove_types::{OpCode, OpError, OpResult};

/// One live edit session handed back to the caller.
///
/// `tree` is the detached copy; edits go through its normal op protocol and
/// never touch the original. `snapshot` is the grid the copy was built from
/// and the value the original must still render at submit time.
#[derive(Clone)]
pub struct EditHandle {
    pub tree: TreeRef,
    pub snapshot: String,
    pub submit_id: u64,
}

impl fmt::Debug for EditHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditHandle")
            .field("snapshot", &self.snapshot)
            .field("submit_id", &self.submit_id)
            .finish_non_exhaustive()
    }
}

struct EditSession {
    clone: TreeRef,
    snapshot: String,
    submit_id: u64,
    /// The tree this copy was cut from. Session keys are addresses, and an
    /// address can be reused after the tree is dropped; the weak ref tells a
    /// live original apart from a reused slot.
    origin: Weak<dyn Tree>,
}

impl EditSession {
    fn belongs_to(&self, tree: &TreeRef) -> bool {
        self.origin
            .upgrade()
            .is_some_and(|origin| Arc::ptr_eq(&origin, tree))
    }
}

/// Keyed by (tree identity, tab index) so each tab of each tree has at most
/// one detached copy alive at a time.
type SessionKey = (usize, usize);

fn identity(tree: &TreeRef) -> usize {
    Arc::as_ptr(tree) as *const () as usize
}

/// Owns every pending edit session.
///
/// Typically one per process, shared by whatever surfaces expose the edit
/// workflow. Submit ids are center-global, so an id never repeats across
/// sessions and a stale resubmission can always be told apart.
pub struct EditCenter {
    state: Mutex<CenterState>,
}

struct CenterState {
    sessions: HashMap<SessionKey, EditSession>,
    next_id: u64,
}

impl CenterState {
    /// The cached session under `key`, provided it still belongs to `tree`.
    /// A leftover from a dead tree whose address got reused is purged.
    fn live_session(&mut self, key: SessionKey, tree: &TreeRef) -> Option<&EditSession> {
        let stale = matches!(self.sessions.get(&key), Some(s) if !s.belongs_to(tree));
        if stale {
            self.sessions.remove(&key);
        }
        self.sessions.get(&key)
    }
}

impl Default for EditCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl EditCenter {
    pub fn new() -> Self {
        EditCenter {
            state: Mutex::new(CenterState {
                sessions: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Fetch-or-create the detached copy of `tab_index` under `tree`.
    ///
    /// The first call renders the tab's full grid, replays it into a fresh
    /// ordered tree sharing the original's layout, and caches the session.
    /// Later calls return the same copy and the snapshot it was built from,
    /// until [`EditCenter::release`] or a successful submit.
    pub fn edit(&self, tree: &TreeRef, tab_index: usize) -> OpResult<EditHandle> {
        let tab = tree
            .layout()
            .tab_at(tab_index)
            .ok_or(OpCode::NotFoundTab)?;
        if !tab.flags().writable {
            return Err(OpError::with_message(
                OpCode::UnsupportedApply,
                format!("tab {:?} is read-only", tab.name().as_str()),
            ));
        }

        let key = (identity(tree), tab_index);
        {
            let mut state = self.state.lock().expect("edit center lock poisoned");
            if let Some(session) = state.live_session(key, tree) {
                return Ok(EditHandle {
                    tree: session.clone.clone(),
                    snapshot: session.snapshot.clone(),
                    submit_id: session.submit_id,
                });
            }
        }

        // Build outside the center lock; tree ops take their own locks.
        let snapshot = save_grid(tree.as_ref(), tab_index)?;
        let clone: TreeRef = Arc::new(OrderedTree::new(tree.layout().clone()));
        load_grid(clone.as_ref(), tab_index, &snapshot)?;

        let mut state = self.state.lock().expect("edit center lock poisoned");
        // A racing edit of the same tab may have landed first; keep it.
        if let Some(session) = state.live_session(key, tree) {
            return Ok(EditHandle {
                tree: session.clone.clone(),
                snapshot: session.snapshot.clone(),
                submit_id: session.submit_id,
            });
        }
        let submit_id = state.next_id;
        state.next_id += 1;
        let handle = EditHandle {
            tree: clone.clone(),
            snapshot: snapshot.clone(),
            submit_id,
        };
        state.sessions.insert(
            key,
            EditSession {
                clone,
                snapshot,
                submit_id,
                origin: Arc::downgrade(tree),
            },
        );
        Ok(handle)
    }

    /// Re-snapshot the original and rebuild the detached copy, discarding
    /// pending edits. Returns a fresh handle under a new submit id.
    pub fn refresh(&self, tree: &TreeRef, tab_index: usize) -> OpResult<EditHandle> {
        self.release(tree, tab_index);
        self.edit(tree, tab_index)
    }

    /// Drop the cached session, if any. Pending edits on the copy are lost.
    pub fn release(&self, tree: &TreeRef, tab_index: usize) -> bool {
        self.state
            .lock()
            .expect("edit center lock poisoned")
            .sessions
            .remove(&(identity(tree), tab_index))
            .is_some_and(|session| session.belongs_to(tree))
    }

    /// Commit the edited copy back into `tree`.
    ///
    /// `submit_id` must be the one on the caller's handle and
    /// `expected_grid` the snapshot that handle carried. The original's
    /// current grid is re-rendered and byte-compared against it; any
    /// mismatch, or an unknown or superseded submit id, rejects with a
    /// stale-apply outcome and leaves the original untouched. On match
    /// every row of the copy replays through the original's add+write path
    /// and the session is retired, so a resubmission is stale by id.
    pub fn apply_submit(
        &self,
        tree: &TreeRef,
        tab_index: usize,
        submit_id: u64,
        expected_grid: &str,
    ) -> OpResult<()> {
        let key = (identity(tree), tab_index);
        let clone = {
            let mut state = self.state.lock().expect("edit center lock poisoned");
            let session = state.live_session(key, tree).ok_or_else(|| {
                OpError::with_message(OpCode::StaleApply, "no edit session for this tab")
            })?;
            if session.submit_id != submit_id {
                return Err(OpError::with_message(
                    OpCode::StaleApply,
                    format!(
                        "submit id {submit_id} superseded by {}",
                        session.submit_id
                    ),
                ));
            }
            session.clone.clone()
        };

        let live = save_grid(tree.as_ref(), tab_index)?;
        if live != expected_grid {
            return Err(OpError::with_message(
                OpCode::StaleApply,
                "table changed since the edit snapshot",
            ));
        }

        let edited = save_grid(clone.as_ref(), tab_index)?;
        let rows = load_grid(tree.as_ref(), tab_index, &edited)?;
        tracing::debug!(tab_index, rows, submit_id, "edit applied");

        self.state
            .lock()
            .expect("edit center lock poisoned")
            .sessions
            .remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_field::{FieldDef, OverflowPolicy};
    use grove_schema::{KeyDef, Layout, Tab, TabFlags};
    use grove_tree::run_op;
    use grove_types::{KeyCursor, Name};

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn symb_tree() -> TreeRef {
        let tab = Tab::build(
            name("Base"),
            vec![
                FieldDef::int_signed(name("Qty"), 4),
                FieldDef::decimal(name("Px"), 2),
            ],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();
        let tree: TreeRef = Arc::new(OrderedTree::new(
            Layout::single(KeyDef::chars(name("SymbId")), tab).unwrap(),
        ));
        load_grid(tree.as_ref(), 0, "2317\t100\t98.5\n2330\t200\t580.25").unwrap();
        tree
    }

    fn set_qty(tree: &TreeRef, key: &str, qty: &str) {
        run_op(tree.as_ref(), |op| {
            let pod = op.add(&KeyCursor::Key(key.to_string()))?;
            let tab = tree.layout().first_tab();
            pod.write(&tab, |rec| {
                tab.field("Qty")
                    .unwrap()
                    .parse(rec, qty, OverflowPolicy::Strict)
            })
        })
        .unwrap();
    }

    #[test]
    fn edits_stay_detached_until_submit() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let handle = center.edit(&tree, 0).unwrap();
        assert_eq!(handle.snapshot, "2317\t100\t98.50\n2330\t200\t580.25");

        set_qty(&handle.tree, "2317", "999");
        assert_eq!(
            save_grid(tree.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t200\t580.25"
        );

        center
            .apply_submit(&tree, 0, handle.submit_id, &handle.snapshot)
            .unwrap();
        assert_eq!(
            save_grid(tree.as_ref(), 0).unwrap(),
            "2317\t999\t98.50\n2330\t200\t580.25"
        );
    }

    #[test]
    fn repeated_edit_reuses_the_same_copy() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let first = center.edit(&tree, 0).unwrap();
        set_qty(&first.tree, "2330", "7");

        let second = center.edit(&tree, 0).unwrap();
        assert_eq!(second.submit_id, first.submit_id);
        assert!(Arc::ptr_eq(&first.tree, &second.tree));
        assert_eq!(
            save_grid(second.tree.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t7\t580.25"
        );
    }

    #[test]
    fn concurrent_change_rejects_the_whole_submission() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let handle = center.edit(&tree, 0).unwrap();
        set_qty(&handle.tree, "2317", "999");

        // Unrelated direct write between snapshot and submit.
        set_qty(&tree, "2330", "201");

        let err = center
            .apply_submit(&tree, 0, handle.submit_id, &handle.snapshot)
            .unwrap_err();
        assert_eq!(err.code, OpCode::StaleApply);
        assert_eq!(
            save_grid(tree.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t201\t580.25"
        );
    }

    #[test]
    fn resubmission_is_stale_by_id() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let handle = center.edit(&tree, 0).unwrap();
        center
            .apply_submit(&tree, 0, handle.submit_id, &handle.snapshot)
            .unwrap();

        let err = center
            .apply_submit(&tree, 0, handle.submit_id, &handle.snapshot)
            .unwrap_err();
        assert_eq!(err.code, OpCode::StaleApply);
    }

    #[test]
    fn refresh_discards_pending_edits() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let first = center.edit(&tree, 0).unwrap();
        set_qty(&first.tree, "2317", "999");

        let fresh = center.refresh(&tree, 0).unwrap();
        assert_ne!(fresh.submit_id, first.submit_id);
        assert!(!Arc::ptr_eq(&first.tree, &fresh.tree));
        assert_eq!(
            save_grid(fresh.tree.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t200\t580.25"
        );
    }

    #[test]
    fn new_rows_in_the_copy_land_on_submit() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let handle = center.edit(&tree, 0).unwrap();
        run_op(handle.tree.as_ref(), |op| {
            let pod = op.add(&KeyCursor::Key("2454".into()))?;
            let tab = handle.tree.layout().first_tab();
            pod.write(&tab, |rec| {
                tab.field("Qty")
                    .unwrap()
                    .parse(rec, "50", OverflowPolicy::Strict)
            })
        })
        .unwrap();

        center
            .apply_submit(&tree, 0, handle.submit_id, &handle.snapshot)
            .unwrap();
        assert_eq!(
            save_grid(tree.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t200\t580.25\n2454\t50\t"
        );
    }

    #[test]
    fn handle_debug_skips_the_tree() {
        let tree = symb_tree();
        let center = EditCenter::new();
        let handle = center.edit(&tree, 0).unwrap();
        let text = format!("{handle:?}");
        assert!(text.starts_with("EditHandle"), "{text}");
        assert!(text.contains("submit_id: 1"), "{text}");
    }

    #[test]
    fn dead_tree_session_is_not_resurrected_by_address_reuse() {
        let center = EditCenter::new();
        let (dead_identity, dead_submit) = {
            let tree = symb_tree();
            let handle = center.edit(&tree, 0).unwrap();
            set_qty(&handle.tree, "2317", "999");
            (identity(&tree), handle.submit_id)
        };
        // The allocator readily hands the freed slot back; hunt for a new
        // tree landing on the dead one's address.
        for _ in 0..64 {
            let tree = symb_tree();
            if identity(&tree) != dead_identity {
                continue;
            }
            let handle = center.edit(&tree, 0).unwrap();
            assert_ne!(handle.submit_id, dead_submit);
            assert_eq!(handle.snapshot, "2317\t100\t98.50\n2330\t200\t580.25");
            return;
        }
    }

    #[test]
    fn read_only_tab_cannot_open_an_edit() {
        let tab = Tab::build(
            name("Base"),
            vec![FieldDef::int_signed(name("Qty"), 4)],
            TabFlags::default(),
            None,
        )
        .unwrap();
        let tree: TreeRef = Arc::new(OrderedTree::new(
            Layout::single(KeyDef::chars(name("SymbId")), tab).unwrap(),
        ));
        let center = EditCenter::new();
        let err = center.edit(&tree, 0).unwrap_err();
        assert_eq!(err.code, OpCode::UnsupportedApply);
    }
}
