//! Foundation types for the Grove seed forest.
//!
//! Grove is an embedded, introspectable hierarchical object store used as the
//! configuration/runtime-state backbone of a trading-system framework. Every
//! other Grove crate depends on `grove-types`.
//!
//! # Key Types
//!
//! - [`Name`] — validated identifier for fields, tabs, and tree entries
//! - [`OpCode`] — the closed outcome taxonomy shared by every tree boundary
//! - [`OpError`] — structured failure: code + path offset + human message
//! - [`AccessRight`] — per-path permission bitmask
//! - [`KeyCursor`] — key-or-sentinel cursor for listing and add-append

pub mod cursor;
pub mod grid;
pub mod name;
pub mod outcome;
pub mod rights;

pub use cursor::KeyCursor;
pub use grid::{contains_separator, CELL_SEP, ROW_SEP};
pub use name::{Name, NameError};
pub use outcome::{OpCode, OpError, OpResult};
pub use rights::AccessRight;
