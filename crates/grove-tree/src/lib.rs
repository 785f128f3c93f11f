//! The Grove tree operation protocol.
//!
//! Every concrete collection in the forest — hash map, ordered map, array by
//! index, radix by byte, the named forest-management tree — implements one
//! uniform interface: [`Tree::with_op`] hands out a [`TreeOp`] that is valid
//! only inside the callback, and the op exposes `get`/`add`/`remove`/
//! `grid_view`. Found pods come back as refcounted [`PodHandle`]s that stay
//! valid after the op ends.
//!
//! Locking discipline: a tree's container lock is scoped strictly to
//! "read/mutate the container, clone out what's needed" and is released
//! before any caller-supplied code runs, so reentrant access to the same
//! tree never self-deadlocks.

pub mod event;
pub mod grid;
pub mod op;
pub mod persist;
pub mod serial;
pub mod trees;

pub use event::{ChangeHub, EventFilter, EventStream, SeedEvent, SeedEventKind};
pub use grid::{push_cell, GridViewRequest, GridViewResult};
pub use op::{run_op, CommandFn, PodHandle, SaplingFactory, Tree, TreeOp, TreeRef};
pub use persist::{load_grid, save_grid};
pub use serial::SerialTree;
pub use op::PodCell;
pub use trees::{forest_layout, ArrayTree, ForestTree, HashTree, OrderedTree, RadixTree};
