//! Serial asynchronous execution adapter.
//!
//! Wraps any tree with a dedicated worker thread. Jobs submitted through
//! [`SerialTree::queue`] or [`SerialTree::run`] execute on the worker in
//! submission order, exactly once each; `with_op` still runs inline for
//! callers that want synchronous access. The worker exits when the adapter
//! is dropped and its queue drains.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use grove_schema::Layout;
use grove_types::{OpCode, OpError, OpResult};

use crate::op::{run_op, Tree, TreeOp, TreeRef};

type Job = Box<dyn FnOnce(&dyn Tree) + Send + 'static>;

pub struct SerialTree {
    inner: TreeRef,
    jobs: mpsc::UnboundedSender<Job>,
}

impl SerialTree {
    pub fn new(inner: TreeRef) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let worker_tree = inner.clone();
        std::thread::Builder::new()
            .name("grove-serial".into())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job(worker_tree.as_ref());
                }
            })
            .expect("serial worker thread spawn failed");
        SerialTree { inner, jobs }
    }

    pub fn inner(&self) -> &TreeRef {
        &self.inner
    }

    /// Fire-and-forget: queue `f` for the worker. A failed job is logged,
    /// not reported back.
    pub fn queue<F>(&self, f: F) -> OpResult<()>
    where
        F: FnOnce(&mut dyn TreeOp) -> OpResult<()> + Send + 'static,
    {
        let job: Job = Box::new(move |tree| {
            if let Err(err) = run_op(tree, f) {
                tracing::warn!(error = %err, "queued tree op failed");
            }
        });
        self.jobs
            .send(job)
            .map_err(|_| worker_gone())
    }

    /// Queue `f` and await its result.
    pub async fn run<T, F>(&self, f: F) -> OpResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn TreeOp) -> OpResult<T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |tree| {
            let _ = tx.send(run_op(tree, f));
        });
        self.jobs.send(job).map_err(|_| worker_gone())?;
        rx.await.map_err(|_| worker_gone())?
    }
}

fn worker_gone() -> OpError {
    OpError::with_message(OpCode::UnsupportedTreeOp, "serial worker stopped")
}

impl Tree for SerialTree {
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
    use crate::trees::OrderedTree;
    use grove_field::{FieldDef, OverflowPolicy};
    use grove_schema::{KeyDef, Tab, TabFlags};
    use grove_types::{KeyCursor, Name};

    fn name(s: &str) -> Name {
        Name::new(s).unwrap()
    }

    fn serial_tree() -> SerialTree {
        let tab = Tab::build(
            name("Base"),
            vec![FieldDef::int_signed(name("Qty"), 4)],
            TabFlags::WRITABLE,
            None,
        )
        .unwrap();
        let layout = Layout::single(KeyDef::chars(name("SymbId")), tab).unwrap();
        SerialTree::new(Arc::new(OrderedTree::new(layout)))
    }

    #[tokio::test]
    async fn queued_jobs_run_in_submission_order() {
        let tree = serial_tree();
        for (key, qty) in [("2330", "1"), ("2330", "2"), ("2330", "3")] {
            let key = key.to_string();
            let qty = qty.to_string();
            tree.queue(move |op| {
                let pod = op.add(&KeyCursor::Key(key))?;
                let tab = pod.layout().first_tab();
                pod.write(&tab, |rec| {
                    tab.field("Qty")
                        .unwrap()
                        .parse(rec, &qty, OverflowPolicy::Strict)
                })
            })
            .unwrap();
        }
        // run() queues behind the writes, so it observes the last one.
        let grid = tree
            .run(|op| Ok(op.grid_view(&GridViewRequest::from_begin(0))?.grid))
            .await
            .unwrap();
        assert_eq!(grid, "2330\t3");
    }

    #[tokio::test]
    async fn run_reports_op_errors() {
        let tree = serial_tree();
        let err = tree.run(|op| op.get("missing")).await.unwrap_err();
        assert_eq!(err.code, OpCode::NotFoundKey);
    }

    #[test]
    fn with_op_still_works_inline() {
        let tree = serial_tree();
        let err = run_op(&tree, |op| op.get("missing")).unwrap_err();
        assert_eq!(err.code, OpCode::NotFoundKey);
    }
}
