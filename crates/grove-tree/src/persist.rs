//! Grid-format persistence.
//!
//! A tree's contents for one tab serialize to the same wire format grid
//! views use, so the external sync subsystem can store, diff, and replay
//! tree state with no second format.

use grove_field::OverflowPolicy;
use grove_types::{KeyCursor, OpCode, OpResult, CELL_SEP, ROW_SEP};

use crate::grid::GridViewRequest;
use crate::op::{run_op, Tree};

/// Serialize every pod's seed under `tab_index` as one grid.
pub fn save_grid(tree: &dyn Tree, tab_index: usize) -> OpResult<String> {
    run_op(tree, |op| {
        let req = GridViewRequest {
            tab_index,
            ..Default::default()
        };
        Ok(op.grid_view(&req)?.grid)
    })
}

/// Replay a saved grid into `tree` through its normal add+write path.
/// Returns the number of rows loaded. Empty rows are skipped; read-only
/// fields keep their initialized value.
pub fn load_grid(tree: &dyn Tree, tab_index: usize, text: &str) -> OpResult<usize> {
    let tab = tree.layout().tab_at(tab_index).ok_or(OpCode::NotFoundTab)?;
    run_op(tree, |op| {
        let mut rows = 0usize;
        for line in text.split(ROW_SEP) {
            if line.is_empty() {
                continue;
            }
            let mut cells = line.split(CELL_SEP);
            let key = cells.next().unwrap_or_default();
            let pod = op.add(&KeyCursor::Key(key.to_string()))?;
            pod.write(&tab, |rec| {
                for (field, cell) in tab.fields().iter().zip(cells) {
                    if field.flags().read_only {
                        continue;
                    }
                    field.parse(rec, cell, OverflowPolicy::Ignore)?;
                }
                Ok(())
            })?;
            rows += 1;
        }
        Ok(rows)
    })
}
