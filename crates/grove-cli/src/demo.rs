//! The demo forest the console runs against.
//!
//! `/Symbs` is an ordered symbol master with a `Deal` sapling per symbol,
//! `/Jobs` an append-only array tree. Both are seeded with a few rows so
//! every console command has something to touch.

use std::sync::Arc;

use grove_field::{FieldDef, OverflowPolicy};
use grove_schema::{KeyDef, Layout, Tab, TabFlags};
use grove_tree::{load_grid, run_op, ArrayTree, CommandFn, ForestTree, OrderedTree, TreeRef};
use grove_types::{KeyCursor, Name, OpCode, OpResult};

fn name(s: &str) -> Name {
    Name::new(s).expect("static name is valid")
}

fn symbs_tree() -> OpResult<TreeRef> {
    let deal_layout = Layout::single(
        KeyDef::chars(name("DealTime")),
        Tab::build(
            name("Deal"),
            vec![
                FieldDef::int_signed(name("DealQty"), 4),
                FieldDef::decimal(name("DealPx"), 2),
            ],
            TabFlags::WRITABLE,
            None,
        )?,
    )?;
    let base = Tab::build(
        name("Base"),
        vec![
            FieldDef::int_signed(name("Qty"), 4),
            FieldDef::decimal(name("Px"), 2),
        ],
        TabFlags {
            writable: true,
            has_sapling: true,
            supports_command: true,
            needs_apply: false,
        },
        Some(deal_layout),
    )?;
    let layout = Layout::single(KeyDef::chars(name("SymbId")), base)?;

    let command: CommandFn = Arc::new(|key, _tab, cmdln| Ok(format!("{key}: {cmdln} done")));
    let tree: TreeRef = Arc::new(OrderedTree::with_hooks(layout, Some(command), None));
    load_grid(tree.as_ref(), 0, "2317\t100\t98.50\n2330\t200\t580.25")?;
    Ok(tree)
}

fn jobs_tree() -> OpResult<TreeRef> {
    let tab = Tab::build(
        name("Job"),
        vec![
            FieldDef::chars(name("Title"), 32),
            FieldDef::int_unsigned(name("Retries"), 2),
        ],
        TabFlags::WRITABLE,
        None,
    )?;
    let tree: TreeRef = Arc::new(ArrayTree::new(Layout::single(
        KeyDef::unsigned(name("JobId")),
        tab,
    )?));
    let tab = tree.layout().first_tab();
    for title in ["warmup", "sync quotes"] {
        run_op(tree.as_ref(), |op| {
            let pod = op.add(&KeyCursor::End)?;
            pod.write(&tab, |rec| {
                tab.field("Title")
                    .ok_or(OpCode::NotFoundField)?
                    .parse(rec, title, OverflowPolicy::Strict)
            })
        })?;
    }
    Ok(tree)
}

/// Build the whole demo forest.
pub fn forest() -> OpResult<TreeRef> {
    let forest = ForestTree::new();
    forest.plant("Symbs", "symbol master", symbs_tree()?)?;
    forest.plant("Jobs", "background jobs", jobs_tree()?)?;
    Ok(Arc::new(forest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use grove_tree::save_grid;

    #[test]
    fn demo_forest_has_seeded_trees() {
        let root = forest().unwrap();
        let symbs = run_op(root.as_ref(), |op| {
            let pod = op.get("Symbs")?;
            pod.sapling(&root.layout().first_tab())
        })
        .unwrap();
        assert_eq!(
            save_grid(symbs.as_ref(), 0).unwrap(),
            "2317\t100\t98.50\n2330\t200\t580.25"
        );

        let jobs = run_op(root.as_ref(), |op| {
            let pod = op.get("Jobs")?;
            pod.sapling(&root.layout().first_tab())
        })
        .unwrap();
        assert_eq!(save_grid(jobs.as_ref(), 0).unwrap(), "0\twarmup\t\n1\tsync quotes\t");
    }
}
