//! The tree operation protocol: `Tree`, `TreeOp`, and `PodHandle`.
//!
//! Operations never run against a bare tree reference. [`Tree::with_op`]
//! hands a [`TreeOp`] to a callback; the op is valid only inside that
//! callback. Pods found through the op come back as refcounted
//! [`PodHandle`]s which stay valid after the op returns, so sessions can
//! keep a seed pinned across commands without holding any tree lock.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use grove_schema::{Layout, Record, Tab};
use grove_types::{KeyCursor, OpCode, OpError, OpResult};

use crate::event::{ChangeHub, EventFilter, EventStream, SeedEvent, SeedEventKind};
use crate::grid::{push_cell, window_rows, GridViewRequest, GridViewResult};
use crate::trees::OrderedTree;

/// Shared handle to any tree in the forest.
pub type TreeRef = Arc<dyn Tree>;

/// Seed command hook: `(key, tab, command line) -> reply text`.
pub type CommandFn = Arc<dyn Fn(&str, &Tab, &str) -> OpResult<String> + Send + Sync>;

/// Builds the child tree hung off one tab of one pod.
pub type SaplingFactory = Arc<dyn Fn(&Tab) -> OpResult<TreeRef> + Send + Sync>;

/// A hierarchical container of pods.
pub trait Tree: Send + Sync {
    fn layout(&self) -> &Arc<Layout>;

    /// Run `f` with this tree's op handle. The handle is valid only inside
    /// `f`; trees may run `f` inline or on a serial worker, but each call
    /// completes exactly once.
    fn with_op<'a>(&'a self, f: Box<dyn FnOnce(OpResult<&mut dyn TreeOp>) + Send + 'a>);
}

/// The operation surface handed out by [`Tree::with_op`].
pub trait TreeOp {
    /// Fetch an existing pod.
    fn get(&mut self, key: &str) -> OpResult<PodHandle>;

    /// Create-or-fetch: an existing key is not an error, the handle reports
    /// `existed()`. Append-capable trees accept [`KeyCursor::End`].
    fn add(&mut self, key: &KeyCursor) -> OpResult<PodHandle>;

    /// Remove the whole pod (`tab` = `None`) or one seed, when the tree
    /// supports per-seed removal. Returns the removal kind performed.
    fn remove(&mut self, key: &str, tab: Option<&Tab>) -> OpResult<OpCode>;

    fn grid_view(&mut self, req: &GridViewRequest) -> OpResult<GridViewResult>;

    fn subscribe(&mut self, filter: EventFilter) -> OpResult<EventStream>;
}

/// Run a synchronous closure through [`Tree::with_op`] and return its result.
///
/// For trees with a serial worker this blocks until the job runs.
pub fn run_op<T, F>(tree: &dyn Tree, f: F) -> OpResult<T>
where
    T: Send,
    F: FnOnce(&mut dyn TreeOp) -> OpResult<T> + Send,
{
    let mut out: Option<OpResult<T>> = None;
    tree.with_op(Box::new(|op| {
        out = Some(match op {
            Ok(op) => f(op),
            Err(err) => Err(err),
        });
    }));
    out.unwrap_or_else(|| {
        Err(OpError::with_message(
            OpCode::UnsupportedTreeOp,
            "tree op did not complete",
        ))
    })
}

/// State shared between a tree, its ops, and the handles it gives out.
pub(crate) struct TreeCore {
    pub(crate) layout: Arc<Layout>,
    pub(crate) hub: ChangeHub,
    pub(crate) command: Option<CommandFn>,
    pub(crate) sapling_factory: Option<SaplingFactory>,
}

impl TreeCore {
    pub(crate) fn new(layout: Arc<Layout>) -> Arc<Self> {
        Arc::new(TreeCore {
            layout,
            hub: ChangeHub::new(),
            command: None,
            sapling_factory: None,
        })
    }

    pub(crate) fn with_hooks(
        layout: Arc<Layout>,
        command: Option<CommandFn>,
        sapling_factory: Option<SaplingFactory>,
    ) -> Arc<Self> {
        Arc::new(TreeCore {
            layout,
            hub: ChangeHub::new(),
            command,
            sapling_factory,
        })
    }
}

/// One pod: a seed record per tab plus any saplings hung off its tabs.
///
/// Records are created lazily so pods built under an earlier layout revision
/// stay valid when a dynamic layout grows.
pub struct PodCell {
    seeds: RwLock<Vec<Record>>,
    saplings: RwLock<HashMap<usize, TreeRef>>,
}

impl PodCell {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(PodCell {
            seeds: RwLock::new(Vec::new()),
            saplings: RwLock::new(HashMap::new()),
        })
    }

    /// Read the record under `tab`; a never-written seed reads as all null.
    pub(crate) fn read_record<R>(&self, tab: &Tab, f: impl FnOnce(&Record) -> R) -> R {
        let seeds = self.seeds.read().expect("pod lock poisoned");
        match seeds.get(tab.index()) {
            Some(rec) => f(rec),
            None => {
                drop(seeds);
                f(&tab.new_record())
            }
        }
    }

    fn write_record<R>(
        &self,
        layout: &Layout,
        tab: &Tab,
        f: impl FnOnce(&mut Record) -> OpResult<R>,
    ) -> OpResult<R> {
        let mut seeds = self.seeds.write().expect("pod lock poisoned");
        while seeds.len() <= tab.index() {
            let missing = layout
                .tab_at(seeds.len())
                .ok_or_else(|| OpError::from(OpCode::NotFoundTab))?;
            seeds.push(missing.new_record());
        }
        f(&mut seeds[tab.index()])
    }

    pub(crate) fn set_sapling(&self, tab_index: usize, tree: TreeRef) {
        self.saplings
            .write()
            .expect("pod lock poisoned")
            .insert(tab_index, tree);
    }

    fn sapling(&self, tab_index: usize) -> Option<TreeRef> {
        self.saplings
            .read()
            .expect("pod lock poisoned")
            .get(&tab_index)
            .cloned()
    }
}

/// Refcounted reference to one pod of one tree.
#[derive(Clone)]
pub struct PodHandle {
    key: String,
    existed: bool,
    cell: Arc<PodCell>,
    core: Arc<TreeCore>,
}

impl fmt::Debug for PodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PodHandle")
            .field("key", &self.key)
            .field("existed", &self.existed)
            .finish_non_exhaustive()
    }
}

impl PodHandle {
    pub(crate) fn new(key: String, existed: bool, cell: Arc<PodCell>, core: Arc<TreeCore>) -> Self {
        PodHandle {
            key,
            existed,
            cell,
            core,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `false` only when this handle came from the `add` that created the pod.
    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.core.layout
    }

    pub(crate) fn cell(&self) -> &Arc<PodCell> {
        &self.cell
    }

    fn check_tab(&self, tab: &Tab) -> OpResult<()> {
        match self.core.layout.tab_at(tab.index()) {
            Some(own) if own.name() == tab.name() => Ok(()),
            _ => Err(OpError::with_message(
                OpCode::NotFoundTab,
                format!("tab {:?} is not in this tree's layout", tab.name().as_str()),
            )),
        }
    }

    /// Read the seed under `tab`.
    pub fn read<R>(&self, tab: &Tab, f: impl FnOnce(&Record) -> R) -> OpResult<R> {
        self.check_tab(tab)?;
        Ok(self.cell.read_record(tab, f))
    }

    /// Mutate the seed under `tab`. A successful write publishes an
    /// `Updated` event to the tree's subscribers.
    pub fn write<R>(&self, tab: &Tab, f: impl FnOnce(&mut Record) -> OpResult<R>) -> OpResult<R> {
        self.check_tab(tab)?;
        if !tab.flags().writable {
            return Err(OpError::with_message(
                OpCode::UnsupportedWrite,
                format!("tab {:?} is read-only", tab.name().as_str()),
            ));
        }
        let out = self.cell.write_record(&self.core.layout, tab, f)?;
        self.core.hub.publish(&SeedEvent {
            key: self.key.clone(),
            tab: Some(tab.name().clone()),
            kind: SeedEventKind::Updated,
        });
        Ok(out)
    }

    /// Run a seed command. The reply text is command-defined.
    pub fn command(&self, tab: &Tab, cmdln: &str) -> OpResult<String> {
        self.check_tab(tab)?;
        if !tab.flags().supports_command {
            return Err(OpCode::UnsupportedCommand.into());
        }
        match &self.core.command {
            Some(hook) => hook(&self.key, tab, cmdln),
            None => Err(OpCode::UnsupportedCommand.into()),
        }
    }

    /// The child tree hung off `tab`, if one has been made.
    pub fn sapling(&self, tab: &Tab) -> OpResult<TreeRef> {
        self.check_tab(tab)?;
        if !tab.flags().has_sapling {
            return Err(OpCode::NotFoundSapling.into());
        }
        self.cell
            .sapling(tab.index())
            .ok_or_else(|| OpCode::NotFoundSapling.into())
    }

    /// Fetch-or-create the child tree hung off `tab`.
    pub fn make_sapling(&self, tab: &Tab) -> OpResult<TreeRef> {
        self.check_tab(tab)?;
        if !tab.flags().has_sapling {
            return Err(OpCode::NotFoundSapling.into());
        }
        let mut saplings = self.cell.saplings.write().expect("pod lock poisoned");
        if let Some(tree) = saplings.get(&tab.index()) {
            return Ok(tree.clone());
        }
        let tree = match &self.core.sapling_factory {
            Some(factory) => factory(tab)?,
            None => {
                let layout = tab
                    .sapling_layout()
                    .ok_or(OpCode::NotFoundSapling)?
                    .clone();
                Arc::new(OrderedTree::new(layout)) as TreeRef
            }
        };
        saplings.insert(tab.index(), tree.clone());
        Ok(tree)
    }
}

/// Render one grid window over a key-sorted pod snapshot.
///
/// Rows render every field of the requested tab in schema order, key cell
/// first, so grids are byte-stable for apply comparison and persistence.
pub(crate) fn grid_over(
    core: &TreeCore,
    rows: &[(String, Arc<PodCell>)],
    start: usize,
    req: &GridViewRequest,
) -> OpResult<GridViewResult> {
    let tab = core
        .layout
        .tab_at(req.tab_index)
        .ok_or(OpCode::NotFoundTab)?;
    Ok(window_rows(start, rows.len(), req, |i, buf| {
        let (key, cell) = &rows[i];
        buf.push_str(key);
        cell.read_record(&tab, |rec| {
            for field in tab.fields() {
                push_cell(buf, &field.render(rec, None));
            }
        });
        key.clone()
    }))
}

/// Sentinel-rejecting key extraction for trees without append semantics.
pub(crate) fn require_key(cursor: &KeyCursor) -> OpResult<&str> {
    cursor.as_key().ok_or_else(|| {
        OpError::with_message(OpCode::KeyFormat, "sentinel key not accepted here")
    })
}
