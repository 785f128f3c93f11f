//! Typed field accessors for Grove records.
//!
//! A [`Field`] describes one logical column of a record: its semantic type,
//! where its bytes live ([`FieldStorage`]), its size and decimal scale, and
//! its capability flags. Fields are built at schema time from [`FieldDef`]s
//! and are immutable afterwards; all record access goes through them, never
//! through raw storage.
//!
//! Storage is abstracted by the [`RawRead`]/[`RawWrite`] traits so the same
//! accessor works whether the record is a schema-built arena, a detached
//! edit copy, or a caller-supplied virtual cell ([`CustomField`]).

pub mod decimal;
pub mod def;
pub mod field;
pub mod raw;

pub use decimal::{parse_scaled, render_scaled, scale_convert, DecScale, ScaleError};
pub use def::{CustomField, FieldDef, FieldFlags, FieldType, OverflowPolicy};
pub use field::{Field, FieldDescriptor, FieldNumber, FieldStorage};
pub use raw::{RawRead, RawWrite};
