//! Concrete tree containers.
//!
//! All of them speak the same [`TreeOp`](crate::op::TreeOp) protocol; they
//! differ in how pods are keyed and stored.

mod array;
mod forest;
mod hash;
mod ordered;
mod radix;

pub use array::ArrayTree;
pub use forest::{forest_layout, ForestTree};
pub use hash::HashTree;
pub use ordered::OrderedTree;
pub use radix::RadixTree;
