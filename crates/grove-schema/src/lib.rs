//! Schema layer for the Grove seed forest.
//!
//! A [`Tab`] is an ordered, immutable group of fields plus capability flags
//! and an optional child-tree schema. A [`Layout`] is everything producible
//! at one tree node: one key definition plus one or more tabs. A [`Record`]
//! is the physical arena behind one (key, tab) pair.
//!
//! Layouts are shared by `Arc` across any number of trees with the same
//! shape. Dynamic layouts may grow new tabs at runtime but never lose one,
//! so records built under an earlier tab stay valid.

pub mod layout;
pub mod record;
pub mod tab;

pub use layout::{KeyDef, Layout, LayoutDescriptor, TabDescriptor};
pub use record::Record;
pub use tab::{SchemaError, Tab, TabFlags};
