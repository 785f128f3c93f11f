//! Command execution against a forest.

use std::sync::Arc;

use grove_acl::{acl_layout, AclConfig, AclPath};
use grove_field::OverflowPolicy;
use grove_schema::{Layout, Tab};
use grove_tree::{
    load_grid, run_op, ForestTree, GridViewRequest, GridViewResult, OrderedTree, TreeRef,
};
use grove_types::{AccessRight, KeyCursor, OpCode, OpError, OpResult};

use crate::fairy::Fairy;
use crate::outcome::{Outcome, Payload};
use crate::ticket::{self, Ticket};

const DEFAULT_GRID_ROWS: u16 = 25;

/// Leave room for header, footer, and prompt when the caller gave no count.
fn adjust_rows(rows: u16) -> u16 {
    if rows > 5 {
        rows - 3
    } else {
        rows
    }
}

struct GridCursor {
    path: String,
    tab: Option<String>,
    rows: u16,
    last_key: Option<String>,
}

struct SeedTarget {
    tree: TreeRef,
    key: String,
    tab: Option<String>,
    offset: usize,
}

/// One caller's session: forest root, visitors sub-forest, ACL, current
/// path, and the cursor of the last grid view.
pub struct Visitor {
    forest: TreeRef,
    visitors: TreeRef,
    fairy: Fairy,
    last_grid: Option<GridCursor>,
}

impl Visitor {
    /// Build a session over `forest`. The visitors sub-forest gets an `Acl`
    /// tree loaded from the session's access list for introspection.
    pub fn new(forest: TreeRef, config: AclConfig) -> OpResult<Self> {
        let visitors = ForestTree::new();
        let acl_tree = Arc::new(OrderedTree::new(acl_layout()));
        load_grid(acl_tree.as_ref(), 0, &config.to_grid())?;
        visitors.plant("Acl", "session access list", acl_tree)?;
        Ok(Visitor {
            forest,
            visitors: Arc::new(visitors),
            fairy: Fairy::new(config),
            last_grid: None,
        })
    }

    pub fn curr(&self) -> &str {
        self.fairy.curr()
    }

    pub fn fairy(&self) -> &Fairy {
        &self.fairy
    }

    /// Classify and execute one command line. Never panics, never errors
    /// out of band: every failure folds into the outcome's code.
    pub fn execute(&mut self, cmdln: &str) -> Outcome {
        match self.run(cmdln) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::debug!(command = cmdln, code = ?err.code, "command failed");
                err.into()
            }
        }
    }

    fn run(&mut self, cmdln: &str) -> OpResult<Outcome> {
        match ticket::parse(cmdln)? {
            Ticket::Navigate { path } => self.navigate(&path),
            Ticket::SeedCommand { path, command } => self.seed_command(&path, &command),
            Ticket::Read { path } => self.read(&path),
            Ticket::Write { path, assignments } => self.write(&path, &assignments),
            Ticket::Remove { path } => self.remove(&path),
            Ticket::GridView {
                path,
                rows,
                start,
                tab,
            } => self.grid_view(&path, rows, start, tab),
            Ticket::GridContinue => self.grid_continue(),
            Ticket::PrintLayout { path } => self.print_layout(&path),
        }
    }

    // -- path walking ---------------------------------------------------

    fn root_for(&self, path: &AclPath) -> TreeRef {
        if path.is_visitors() {
            self.visitors.clone()
        } else {
            self.forest.clone()
        }
    }

    /// Walk every segment; the whole path must name a tree.
    fn resolve_tree(&self, path: &AclPath) -> OpResult<TreeRef> {
        let mut tree = self.root_for(path);
        for (off, seg) in path.segments() {
            let (key, tab) = split_caret(seg);
            tree = descend(&tree, key, tab).map_err(|e| e.at(off))?;
        }
        Ok(tree)
    }

    /// Walk all but the last segment; the last names a seed in the
    /// returned tree.
    fn resolve_seed(&self, path: &AclPath) -> OpResult<SeedTarget> {
        let segs: Vec<(usize, &str)> = path.segments().collect();
        let Some((&(offset, last), init)) = segs.split_last() else {
            return Err(OpError::with_message(
                OpCode::NotFoundSeed,
                format!("{} names a tree root, not a seed", path.as_str()),
            ));
        };
        let mut tree = self.root_for(path);
        for &(off, seg) in init {
            let (key, tab) = split_caret(seg);
            tree = descend(&tree, key, tab).map_err(|e| e.at(off))?;
        }
        let (key, tab) = split_caret(last);
        Ok(SeedTarget {
            tree,
            key: key.to_string(),
            tab: tab.map(str::to_string),
            offset,
        })
    }

    fn ensure_exists(&self, path: &AclPath) -> OpResult<()> {
        if self.resolve_tree(path).is_ok() {
            return Ok(());
        }
        let target = self.resolve_seed(path)?;
        run_op(target.tree.as_ref(), |op| op.get(&target.key))
            .map(|_| ())
            .map_err(|e| e.at(target.offset))
    }

    // -- tickets ----------------------------------------------------------

    fn navigate(&mut self, raw: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::NONE)?;
        self.ensure_exists(&path)?;
        let canonical = path.into_string();
        self.fairy.set_curr(canonical.clone());
        Ok(Outcome::ok(Payload::Text(canonical)))
    }

    fn read(&self, raw: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::READ)?;
        let target = self.resolve_seed(&path)?;
        let text = run_op(target.tree.as_ref(), |op| {
            let pod = op.get(&target.key)?;
            let tab = select_tab(pod.layout(), target.tab.as_deref())?;
            pod.read(&tab, |rec| {
                let mut out = String::new();
                for field in tab.fields() {
                    if field.flags().hidden {
                        continue;
                    }
                    out.push_str(field.name().as_str());
                    out.push('=');
                    out.push_str(&field.render(rec, None));
                    out.push('\n');
                }
                out
            })
        })
        .map_err(|e| e.at(target.offset))?;
        Ok(Outcome::ok(Payload::Text(text)))
    }

    fn write(&self, raw: &str, assignments: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::WRITE)?;
        let target = self.resolve_seed(&path)?;
        let report = run_op(target.tree.as_ref(), |op| {
            let pod = op.add(&KeyCursor::Key(target.key.clone()))?;
            let tab = select_tab(pod.layout(), target.tab.as_deref())?;
            pod.write(&tab, |rec| {
                // Per-field failures go into the report; good fields still
                // land, matching interactive expectations.
                let mut report = String::new();
                for (name, value) in split_assignments(assignments) {
                    match tab.field(name) {
                        None => {
                            report.push_str(name);
                            report.push_str("\terr=");
                            report.push_str(OpCode::NotFoundField.message());
                            report.push('\n');
                        }
                        Some(field) => {
                            if let Err(err) = field.parse(rec, value, OverflowPolicy::Strict) {
                                report.push_str(name);
                                report.push('=');
                                report.push_str(value);
                                report.push_str("\terr=");
                                report.push_str(err.text());
                                report.push('\n');
                            }
                        }
                    }
                }
                Ok(report)
            })
        })
        .map_err(|e| e.at(target.offset))?;
        Ok(Outcome::ok(Payload::Text(report)))
    }

    fn remove(&self, raw: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::WRITE)?;
        let target = self.resolve_seed(&path)?;
        let code = run_op(target.tree.as_ref(), |op| {
            let tab = match target.tab.as_deref() {
                Some(name) => Some(select_tab(target.tree.layout(), Some(name))?),
                None => None,
            };
            op.remove(&target.key, tab.as_deref())
        })
        .map_err(|e| e.at(target.offset))?;
        Ok(Outcome::done(code, Payload::None))
    }

    fn seed_command(&self, raw: &str, command: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::EXEC)?;
        let target = self.resolve_seed(&path)?;
        let reply = run_op(target.tree.as_ref(), |op| {
            let pod = op.get(&target.key)?;
            let tab = select_tab(pod.layout(), target.tab.as_deref())?;
            pod.command(&tab, command)
        })
        .map_err(|e| e.at(target.offset))?;
        Ok(Outcome::ok(Payload::Text(reply)))
    }

    fn grid_view(
        &mut self,
        raw: &str,
        rows: Option<u16>,
        start: KeyCursor,
        tab: Option<String>,
    ) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::READ)?;
        let rows = rows.unwrap_or_else(|| adjust_rows(DEFAULT_GRID_ROWS));
        let res = self.run_grid(&path, rows, &start, 0, tab.as_deref())?;
        self.last_grid = Some(GridCursor {
            path: path.into_string(),
            tab,
            rows,
            last_key: res.last_key.clone(),
        });
        Ok(Outcome::ok(Payload::Grid(res)))
    }

    fn grid_continue(&mut self) -> OpResult<Outcome> {
        let Some(prev) = self.last_grid.take() else {
            // No grid yet this session: start one at the current path.
            return self.grid_view(".", None, KeyCursor::Begin, None);
        };
        let path = self.fairy.resolve(&prev.path, AccessRight::READ)?;
        let (start, offset) = match &prev.last_key {
            Some(key) => (KeyCursor::Key(key.clone()), 1),
            None => (KeyCursor::Begin, 0),
        };
        let res = self.run_grid(&path, prev.rows, &start, offset, prev.tab.as_deref())?;
        self.last_grid = Some(GridCursor {
            path: prev.path,
            tab: prev.tab,
            rows: prev.rows,
            last_key: res.last_key.clone().or(prev.last_key),
        });
        Ok(Outcome::ok(Payload::Grid(res)))
    }

    fn run_grid(
        &self,
        path: &AclPath,
        rows: u16,
        start: &KeyCursor,
        offset: isize,
        tab: Option<&str>,
    ) -> OpResult<GridViewResult> {
        let tree = self.resolve_tree(path)?;
        let tab_index = match tab {
            None => 0,
            Some(name) => select_tab(tree.layout(), Some(name))?.index(),
        };
        run_op(tree.as_ref(), |op| {
            op.grid_view(&GridViewRequest {
                start: start.clone(),
                offset,
                max_rows: rows as usize,
                max_bytes: 0,
                tab_index,
            })
        })
    }

    fn print_layout(&self, raw: &str) -> OpResult<Outcome> {
        let path = self.fairy.resolve(raw, AccessRight::READ)?;
        let tree = self.resolve_tree(&path)?;
        Ok(Outcome::ok(Payload::Layout(tree.layout().descriptor())))
    }
}

fn split_caret(seg: &str) -> (&str, Option<&str>) {
    match seg.split_once('^') {
        Some((key, tab)) => (key, Some(tab)),
        None => (seg, None),
    }
}

fn select_tab(layout: &Arc<Layout>, name: Option<&str>) -> OpResult<Arc<Tab>> {
    match name {
        None => Ok(layout.first_tab()),
        Some(n) => layout
            .tab(n)
            .ok_or_else(|| OpError::with_message(OpCode::NotFoundTab, format!("no tab {n:?}"))),
    }
}

fn descend(tree: &TreeRef, key: &str, tab: Option<&str>) -> OpResult<TreeRef> {
    run_op(tree.as_ref(), |op| {
        let pod = op.get(key)?;
        let tab = select_tab(pod.layout(), tab)?;
        // Fetch-or-create: saplings materialize lazily on first traversal,
        // matching lazy record creation.
        pod.make_sapling(&tab)
    })
}

/// Split `name=value` pairs on `,`, honoring quoted values.
fn split_assignments(text: &str) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            out.push((rest.trim(), ""));
            break;
        };
        let name = rest[..eq].trim();
        let after = &rest[eq + 1..];
        let (value, next) = match after.chars().next() {
            Some(q @ ('\'' | '"')) => {
                let body = &after[1..];
                match body.find(q) {
                    Some(close) => {
                        let tail = &body[close + 1..];
                        (&body[..close], tail.strip_prefix(',').unwrap_or(tail))
                    }
                    None => (body, ""),
                }
            }
            _ => match after.find(',') {
                Some(comma) => (&after[..comma], &after[comma + 1..]),
                None => (after, ""),
            },
        };
        out.push((name, value));
        rest = next;
    }
    out
}
